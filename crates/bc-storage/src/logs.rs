// SPDX-License-Identifier: MIT

//! CRUD for [`Log`] rows (per-run audit trail, `spec.md` §3).

use bc_core::{JobId, JobStatus, Log, LogId};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::StorageError;

#[tracing::instrument(skip(pool))]
pub async fn start(pool: &SqlitePool, job_id: JobId) -> Result<Log, StorageError> {
    let id = LogId::new();
    sqlx::query("INSERT INTO logs (id, job_id, started_at) VALUES (?, ?, ?)")
        .bind(id)
        .bind(job_id)
        .bind(Utc::now())
        .execute(pool)
        .await?;
    get(pool, id).await
}

#[tracing::instrument(skip(pool))]
pub async fn get(pool: &SqlitePool, id: LogId) -> Result<Log, StorageError> {
    sqlx::query_as::<_, Log>("SELECT * FROM logs WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(StorageError::NotFound("log"))
}

#[tracing::instrument(skip(pool))]
pub async fn list_for_job(pool: &SqlitePool, job_id: JobId) -> Result<Vec<Log>, StorageError> {
    Ok(sqlx::query_as::<_, Log>("SELECT * FROM logs WHERE job_id = ? ORDER BY started_at DESC")
        .bind(job_id)
        .fetch_all(pool)
        .await?)
}

/// Finalize a log at the terminal event, recording status, totals, and
/// optionally an error string (`spec.md` §4.6).
#[tracing::instrument(skip(pool, output, error))]
pub async fn finish(
    pool: &SqlitePool,
    id: LogId,
    status: JobStatus,
    bytes_transferred: u64,
    files_transferred: u64,
    output: &str,
    error: Option<&str>,
) -> Result<Log, StorageError> {
    sqlx::query(
        "UPDATE logs
         SET finished_at = ?, status = ?, bytes_transferred = ?, files_transferred = ?, output = ?, error = ?
         WHERE id = ?",
    )
    .bind(Utc::now())
    .bind(status.to_string())
    .bind(i64::try_from(bytes_transferred).unwrap_or(i64::MAX))
    .bind(i64::try_from(files_transferred).unwrap_or(i64::MAX))
    .bind(output)
    .bind(error)
    .bind(id)
    .execute(pool)
    .await?;
    get(pool, id).await
}

#[cfg(test)]
#[path = "logs_tests.rs"]
mod tests;
