// SPDX-License-Identifier: MIT

//! CRUD for [`Job`] rows.

use bc_core::{encode_remote_paths, Job, JobId, JobStatus, JobUpdate, NewJob, ServerId};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::StorageError;

#[tracing::instrument(skip(pool, new, local_path), fields(name = %new.name))]
pub async fn create(pool: &SqlitePool, new: NewJob, local_path: &str) -> Result<Job, StorageError> {
    let id = JobId::new();
    let now = Utc::now();
    let retention = new.retention_count.unwrap_or(bc_core::DEFAULT_RETENTION_COUNT);
    sqlx::query(
        "INSERT INTO jobs
            (id, server_id, name, remote_paths, local_path, cron, status, enabled, retention_count, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(new.server_id)
    .bind(&new.name)
    .bind(encode_remote_paths(&new.remote_paths))
    .bind(local_path)
    .bind(&new.cron)
    .bind(JobStatus::Idle.to_string())
    .bind(new.enabled)
    .bind(i64::from(retention))
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    get(pool, id).await
}

#[tracing::instrument(skip(pool))]
pub async fn get(pool: &SqlitePool, id: JobId) -> Result<Job, StorageError> {
    sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(StorageError::NotFound("job"))
}

#[tracing::instrument(skip(pool))]
pub async fn list(pool: &SqlitePool) -> Result<Vec<Job>, StorageError> {
    Ok(sqlx::query_as::<_, Job>("SELECT * FROM jobs ORDER BY name").fetch_all(pool).await?)
}

#[tracing::instrument(skip(pool))]
pub async fn list_for_server(pool: &SqlitePool, server_id: ServerId) -> Result<Vec<Job>, StorageError> {
    Ok(sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE server_id = ? ORDER BY name")
        .bind(server_id)
        .fetch_all(pool)
        .await?)
}

/// All enabled jobs carrying a cron expression — the set the scheduler
/// loads at startup (`spec.md` §4.7).
#[tracing::instrument(skip(pool))]
pub async fn list_scheduled(pool: &SqlitePool) -> Result<Vec<Job>, StorageError> {
    Ok(sqlx::query_as::<_, Job>(
        "SELECT * FROM jobs WHERE enabled = 1 AND cron IS NOT NULL ORDER BY name",
    )
    .fetch_all(pool)
    .await?)
}

#[tracing::instrument(skip(pool, update))]
pub async fn update(pool: &SqlitePool, id: JobId, update: JobUpdate) -> Result<Job, StorageError> {
    let existing = get(pool, id).await?;
    let name = update.name.unwrap_or(existing.name);
    let remote_paths = update.remote_paths.unwrap_or(existing.remote_paths);
    let cron = update.cron.unwrap_or(existing.cron);
    let enabled = update.enabled.unwrap_or(existing.enabled);
    let retention_count = update.retention_count.unwrap_or(existing.retention_count);

    sqlx::query(
        "UPDATE jobs SET name = ?, remote_paths = ?, cron = ?, enabled = ?, retention_count = ?, updated_at = ?
         WHERE id = ?",
    )
    .bind(&name)
    .bind(encode_remote_paths(&remote_paths))
    .bind(&cron)
    .bind(enabled)
    .bind(i64::from(retention_count))
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    get(pool, id).await
}

/// Rewrite a job's on-disk root, used when the job is renamed or the
/// backup root moves (`spec.md` §6 "re-allocates local path on name
/// change" / "rewrite all Job local paths").
#[tracing::instrument(skip(pool))]
pub async fn set_local_path(pool: &SqlitePool, id: JobId, local_path: &str) -> Result<Job, StorageError> {
    sqlx::query("UPDATE jobs SET local_path = ?, updated_at = ? WHERE id = ?")
        .bind(local_path)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    get(pool, id).await
}

#[tracing::instrument(skip(pool))]
pub async fn set_status(pool: &SqlitePool, id: JobId, status: JobStatus) -> Result<Job, StorageError> {
    let now = Utc::now();
    let mut query = sqlx::query("UPDATE jobs SET status = ?, updated_at = ? WHERE id = ?");
    query = query.bind(status.to_string()).bind(now).bind(id);
    query.execute(pool).await?;

    if matches!(status, JobStatus::Running) {
        sqlx::query("UPDATE jobs SET last_run_at = ? WHERE id = ?").bind(now).bind(id).execute(pool).await?;
    }

    get(pool, id).await
}

#[tracing::instrument(skip(pool))]
pub async fn delete(pool: &SqlitePool, id: JobId) -> Result<(), StorageError> {
    let result = sqlx::query("DELETE FROM jobs WHERE id = ?").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound("job"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
