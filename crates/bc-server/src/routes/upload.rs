// SPDX-License-Identifier: MIT

//! `POST /api/files/upload` (`spec.md` §6 "File upload protocol"):
//! single-body streaming upload, optional `content-encoding: zstd`,
//! landing in the job's active version directory — not
//! `BACKUPS_DIR/jobId/relativePath`, which `spec.md` §9 calls out as "a
//! bug to fix, not a contract to preserve" in the system this was
//! distilled from.

use std::path::PathBuf;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use bc_core::JobId;
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ApiError> {
    headers
        .get(name)
        .ok_or_else(|| ApiError::Precondition(format!("missing required header: {name}")))?
        .to_str()
        .map_err(|_| ApiError::Precondition(format!("header is not valid UTF-8: {name}")))
}

pub async fn upload(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Json<Value>, ApiError> {
    let job_id: JobId = header_str(&headers, "x-job-id")?
        .parse()
        .map_err(|_| ApiError::Precondition("x-job-id is not a valid id".to_string()))?;
    let relative_path = header_str(&headers, "x-relative-path")?.to_string();
    let total_size: u64 = header_str(&headers, "x-total-size")?
        .parse()
        .map_err(|_| ApiError::Precondition("x-total-size is not a valid integer".to_string()))?;
    let zstd_encoded = headers.get("content-encoding").and_then(|v| v.to_str().ok()) == Some("zstd");

    let job = bc_storage::jobs::get(&state.pool, job_id).await?;
    let version = bc_storage::versions::find_running_version(&state.pool, job_id)
        .await?
        .ok_or_else(|| ApiError::Precondition("job has no in-flight version to upload into".to_string()))?;

    let version_root = PathBuf::from(&version.local_path);
    let destination = bc_layout::resolve_within(&version_root, &relative_path)?;

    let decoded = if zstd_encoded {
        zstd::stream::decode_all(body.as_ref())
            .map_err(|error| ApiError::Precondition(format!("failed to decode zstd body: {error}")))?
    } else {
        body.to_vec()
    };

    if decoded.len() as u64 != total_size {
        return Err(ApiError::Precondition(format!(
            "uploaded size {} does not match x-total-size {total_size}",
            decoded.len()
        )));
    }

    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(bc_layout::LayoutError::from)?;
    }

    if let Err(error) = tokio::fs::write(&destination, &decoded).await {
        let _ = tokio::fs::remove_file(&destination).await;
        return Err(ApiError::Layout(bc_layout::LayoutError::from(error)));
    }

    tracing::info!(job_id = %job.id, relative_path, bytes = decoded.len(), "uploaded file");
    Ok(Json(serde_json::json!({"uploaded": true, "bytes": decoded.len()})))
}
