// SPDX-License-Identifier: MIT

//! CRUD for [`Version`] rows, plus the two orchestrator-facing queries
//! named in `spec.md` §4.1: `find_latest_completed_version` and
//! `update_version_on_completion`.

use bc_core::{format_version_timestamp, JobId, LogId, Version, VersionId, VersionStatus};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::StorageError;

#[tracing::instrument(skip(pool))]
pub async fn create(
    pool: &SqlitePool,
    job_id: JobId,
    log_id: LogId,
    local_path: &str,
) -> Result<Version, StorageError> {
    let id = VersionId::new();
    let now = Utc::now();
    let timestamp = format_version_timestamp(now);
    sqlx::query(
        "INSERT INTO versions (id, job_id, log_id, timestamp, local_path, status, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(job_id)
    .bind(log_id)
    .bind(&timestamp)
    .bind(local_path)
    .bind(VersionStatus::Running.to_string())
    .bind(now)
    .execute(pool)
    .await?;

    get(pool, id).await
}

#[tracing::instrument(skip(pool))]
pub async fn get(pool: &SqlitePool, id: VersionId) -> Result<Version, StorageError> {
    sqlx::query_as::<_, Version>("SELECT * FROM versions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(StorageError::NotFound("version"))
}

#[tracing::instrument(skip(pool))]
pub async fn list_for_job(pool: &SqlitePool, job_id: JobId) -> Result<Vec<Version>, StorageError> {
    Ok(sqlx::query_as::<_, Version>("SELECT * FROM versions WHERE job_id = ? ORDER BY timestamp DESC")
        .bind(job_id)
        .fetch_all(pool)
        .await?)
}

/// Newest `completed` version for a job, or `None` if it has never
/// completed a run (`spec.md` §4.1).
#[tracing::instrument(skip(pool))]
pub async fn find_latest_completed_version(
    pool: &SqlitePool,
    job_id: JobId,
) -> Result<Option<Version>, StorageError> {
    Ok(sqlx::query_as::<_, Version>(
        "SELECT * FROM versions WHERE job_id = ? AND status = ? ORDER BY timestamp DESC LIMIT 1",
    )
    .bind(job_id)
    .bind(VersionStatus::Completed.to_string())
    .fetch_optional(pool)
    .await?)
}

/// Seal a version as `completed`, recording final totals (`spec.md`
/// §4.1, §4.6 "running -> completed").
#[tracing::instrument(skip(pool))]
pub async fn update_version_on_completion(
    pool: &SqlitePool,
    id: VersionId,
    bytes_total: u64,
    files_transferred: u64,
) -> Result<Version, StorageError> {
    sqlx::query(
        "UPDATE versions
         SET status = ?, bytes_transferred = ?, bytes_total = ?, files_transferred = ?, completed_at = ?
         WHERE id = ?",
    )
    .bind(VersionStatus::Completed.to_string())
    .bind(i64::try_from(bytes_total).unwrap_or(i64::MAX))
    .bind(i64::try_from(bytes_total).unwrap_or(i64::MAX))
    .bind(i64::try_from(files_transferred).unwrap_or(i64::MAX))
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    get(pool, id).await
}

/// The in-flight `running` version for a job, if any — the upload
/// endpoint's write target (`spec.md` §6 "uploads land in the active
/// version directory").
#[tracing::instrument(skip(pool))]
pub async fn find_running_version(pool: &SqlitePool, job_id: JobId) -> Result<Option<Version>, StorageError> {
    Ok(sqlx::query_as::<_, Version>(
        "SELECT * FROM versions WHERE job_id = ? AND status = ? ORDER BY timestamp DESC LIMIT 1",
    )
    .bind(job_id)
    .bind(VersionStatus::Running.to_string())
    .fetch_optional(pool)
    .await?)
}

/// Seal a version as `failed` (`spec.md` §4.6 "running -> failed" /
/// "running -> cancelled").
#[tracing::instrument(skip(pool))]
pub async fn mark_failed(pool: &SqlitePool, id: VersionId) -> Result<Version, StorageError> {
    sqlx::query("UPDATE versions SET status = ?, completed_at = ? WHERE id = ?")
        .bind(VersionStatus::Failed.to_string())
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    get(pool, id).await
}

/// Record in-flight progress without sealing the version.
#[tracing::instrument(skip(pool))]
pub async fn update_progress(
    pool: &SqlitePool,
    id: VersionId,
    bytes_transferred: u64,
) -> Result<(), StorageError> {
    sqlx::query("UPDATE versions SET bytes_transferred = ? WHERE id = ?")
        .bind(i64::try_from(bytes_transferred).unwrap_or(i64::MAX))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[tracing::instrument(skip(pool))]
pub async fn delete(pool: &SqlitePool, id: VersionId) -> Result<(), StorageError> {
    let result = sqlx::query("DELETE FROM versions WHERE id = ?").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound("version"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "versions_tests.rs"]
mod tests;
