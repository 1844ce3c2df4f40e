// SPDX-License-Identifier: MIT

//! `/api/jobs*` (`spec.md` §6).

use std::collections::HashSet;
use std::path::Path;

use axum::extract::{Path as AxumPath, Query, State};
use axum::Json;
use bc_core::{Job, JobId, JobUpdate, Log, NewJob};
use bc_wire::{ControllerOutbound, UiEvent};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;
use crate::validate;

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Job>>, ApiError> {
    Ok(Json(bc_storage::jobs::list(&state.pool).await?))
}

pub async fn get(State(state): State<AppState>, AxumPath(id): AxumPath<JobId>) -> Result<Json<Job>, ApiError> {
    Ok(Json(bc_storage::jobs::get(&state.pool, id).await?))
}

/// `backup_root/<slug(server.name)>/<slug(job.name)>` collision set,
/// derived from every other job's already-allocated local path
/// (`spec.md` §4.5).
async fn taken_relative_paths(state: &AppState, backup_root: &str, exclude: Option<JobId>) -> Result<HashSet<String>, ApiError> {
    let root = Path::new(backup_root);
    let mut taken = HashSet::new();
    for job in bc_storage::jobs::list(&state.pool).await? {
        if Some(job.id) == exclude {
            continue;
        }
        if let Ok(relative) = Path::new(&job.local_path).strip_prefix(root) {
            taken.insert(relative.to_string_lossy().replace('\\', "/"));
        }
    }
    Ok(taken)
}

/// Validates each remote path exists on the agent before the job row is
/// created (`spec.md` §6 "validates each remote path via the agent").
async fn validate_remote_paths(state: &AppState, server_id: bc_core::ServerId, paths: &[String]) -> Result<(), ApiError> {
    for path in paths {
        state
            .registry
            .request(server_id, ControllerOutbound::FsBrowse { path: path.clone() }, None)
            .await
            .map_err(|_| ApiError::Precondition(format!("remote path not reachable on agent: {path}")))?;
    }
    Ok(())
}

pub async fn create(State(state): State<AppState>, Json(new_job): Json<NewJob>) -> Result<Json<Job>, ApiError> {
    validate::non_empty_remote_paths(&new_job.remote_paths)?;
    let backup_root = state.backup_root().await?;
    let server = bc_storage::servers::get(&state.pool, new_job.server_id).await?;

    validate_remote_paths(&state, server.id, &new_job.remote_paths).await?;

    let taken = taken_relative_paths(&state, &backup_root, None).await?;
    let local_path = bc_layout::allocate_job_path(Path::new(&backup_root), &server.name, &new_job.name, |candidate| {
        taken.contains(candidate)
    })?;

    let enabled = new_job.enabled;
    let cron = new_job.cron.clone();
    let job = bc_storage::jobs::create(&state.pool, new_job, &local_path.to_string_lossy()).await?;

    if enabled {
        if let Some(cron) = cron {
            state.scheduler.lock().await.schedule(job.id, &cron).await?;
        }
    }

    state.events.publish(UiEvent::JobCreated { job_id: job.id });
    Ok(Json(job))
}

/// Re-validates remote paths and re-allocates the local path when the
/// job is renamed, moving the on-disk directory to match (`spec.md` §6
/// "Re-validates paths and re-allocates local path on name change").
pub async fn update(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<JobId>,
    Json(update): Json<JobUpdate>,
) -> Result<Json<Job>, ApiError> {
    let existing = bc_storage::jobs::get(&state.pool, id).await?;

    if let Some(paths) = &update.remote_paths {
        validate::non_empty_remote_paths(paths)?;
        validate_remote_paths(&state, existing.server_id, paths).await?;
    }

    let renaming = update.name.as_deref().is_some_and(|name| name != existing.name);
    let mut new_local_path = None;
    if renaming {
        let backup_root = state.backup_root().await?;
        let server = bc_storage::servers::get(&state.pool, existing.server_id).await?;
        let new_name = update.name.clone().unwrap_or_else(|| existing.name.clone());
        let taken = taken_relative_paths(&state, &backup_root, Some(id)).await?;
        let allocated =
            bc_layout::allocate_job_path(Path::new(&backup_root), &server.name, &new_name, |candidate| {
                taken.contains(candidate)
            })?;
        if Path::new(&existing.local_path).exists() {
            if let Some(parent) = allocated.parent() {
                std::fs::create_dir_all(parent).map_err(bc_layout::LayoutError::from)?;
            }
            std::fs::rename(&existing.local_path, &allocated).map_err(bc_layout::LayoutError::from)?;
        }
        new_local_path = Some(allocated);
    }

    let reschedule = update.cron.is_some() || update.enabled.is_some();
    let job = bc_storage::jobs::update(&state.pool, id, update).await?;
    let job = if let Some(new_local_path) = new_local_path {
        bc_storage::jobs::set_local_path(&state.pool, id, &new_local_path.to_string_lossy()).await?
    } else {
        job
    };

    if reschedule {
        state.scheduler.lock().await.unschedule(id).await?;
        if job.enabled {
            if let Some(cron) = &job.cron {
                state.scheduler.lock().await.schedule(id, cron).await?;
            }
        }
    }

    state.events.publish(UiEvent::JobUpdated { job_id: id });
    Ok(Json(job))
}

/// Cancels a running job, drops its cron subscription, and deletes the
/// row — Logs/Versions cascade at the database level.
pub async fn delete(State(state): State<AppState>, AxumPath(id): AxumPath<JobId>) -> Result<Json<Value>, ApiError> {
    if state.orchestrator.is_running(id) {
        let _ = state.orchestrator.cancel(id).await;
    }
    state.scheduler.lock().await.unschedule(id).await?;
    bc_storage::jobs::delete(&state.pool, id).await?;
    state.events.publish(UiEvent::JobDeleted { job_id: id });
    Ok(Json(serde_json::json!({"deleted": true})))
}

#[derive(Debug, Deserialize, Default)]
pub struct RunBody {
    #[serde(default)]
    pub full: bool,
}

/// 409 if the job is already running — distinct from the scheduler's
/// silent no-op on a cron tick racing a manual run (`spec.md` §6).
pub async fn run(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<JobId>,
    body: axum::body::Bytes,
) -> Result<Json<Value>, ApiError> {
    if state.orchestrator.is_running(id) {
        return Err(ApiError::Conflict("job is already running".to_string()));
    }
    let full = if body.is_empty() {
        false
    } else {
        serde_json::from_slice::<RunBody>(&body).map(|body| body.full).unwrap_or(false)
    };
    state.orchestrator.start(id, full).await?;
    Ok(Json(serde_json::json!({"started": true})))
}

pub async fn cancel(State(state): State<AppState>, AxumPath(id): AxumPath<JobId>) -> Result<Json<Value>, ApiError> {
    state.orchestrator.cancel(id).await?;
    Ok(Json(serde_json::json!({"cancelled": true})))
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    limit: Option<usize>,
}

const DEFAULT_LOG_LIMIT: usize = 50;

pub async fn logs(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<JobId>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<Vec<Log>>, ApiError> {
    let mut logs = bc_storage::logs::list_for_job(&state.pool, id).await?;
    logs.truncate(query.limit.unwrap_or(DEFAULT_LOG_LIMIT));
    Ok(Json(logs))
}
