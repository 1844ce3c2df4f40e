// SPDX-License-Identifier: MIT

//! `/api/versions*` (`spec.md` §6). The row is deleted synchronously;
//! the on-disk directory is pruned on a spawned task so the response
//! doesn't wait on a (potentially large) `remove_dir_all` (`spec.md`
//! §7 "best-effort ... logged, not surfaced").

use std::path::PathBuf;

use axum::extract::{Path, Query, State};
use axum::Json;
use bc_core::{JobId, ServerId, Version, VersionId};
use bc_wire::UiEvent;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    job_id: JobId,
}

pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Result<Json<Vec<Version>>, ApiError> {
    Ok(Json(bc_storage::versions::list_for_job(&state.pool, query.job_id).await?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<VersionId>) -> Result<Json<Version>, ApiError> {
    Ok(Json(bc_storage::versions::get(&state.pool, id).await?))
}

async fn delete_one(state: &AppState, version: Version) -> Result<(), ApiError> {
    bc_storage::versions::delete(&state.pool, version.id).await?;
    let path = PathBuf::from(version.local_path);
    tokio::spawn(async move { bc_layout::prune_version_dir(&path) });
    state.events.publish(UiEvent::VersionDeleted { job_id: version.job_id, version_id: version.id });
    Ok(())
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<VersionId>) -> Result<Json<Value>, ApiError> {
    let version = bc_storage::versions::get(&state.pool, id).await?;
    delete_one(&state, version).await?;
    Ok(Json(serde_json::json!({"deleted": true})))
}

pub async fn delete_by_job(State(state): State<AppState>, Path(job_id): Path<JobId>) -> Result<Json<Value>, ApiError> {
    let versions = bc_storage::versions::list_for_job(&state.pool, job_id).await?;
    let count = versions.len();
    for version in versions {
        delete_one(&state, version).await?;
    }
    Ok(Json(serde_json::json!({"deleted": count})))
}

pub async fn delete_by_server(
    State(state): State<AppState>,
    Path(server_id): Path<ServerId>,
) -> Result<Json<Value>, ApiError> {
    let mut count = 0;
    for job in bc_storage::jobs::list_for_server(&state.pool, server_id).await? {
        let versions = bc_storage::versions::list_for_job(&state.pool, job.id).await?;
        count += versions.len();
        for version in versions {
            delete_one(&state, version).await?;
        }
    }
    Ok(Json(serde_json::json!({"deleted": count})))
}
