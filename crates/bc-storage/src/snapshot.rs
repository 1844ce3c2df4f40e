// SPDX-License-Identifier: MIT

//! Daily file-level DB snapshot rotation (`SPEC_FULL.md` §4.1, supplement).
//!
//! Snapshots are plain `VACUUM INTO` copies named
//! `backup-server-YYYY-MM-DD.db`, kept seven deep. Rotation is checked
//! once at startup and once per day thereafter so a long-lived process
//! never skips a day.

use std::path::{Path, PathBuf};

use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::StorageError;

const KEEP: usize = 7;

fn snapshot_name(date: chrono::NaiveDate) -> String {
    format!("backup-server-{}.db", date.format("%Y-%m-%d"))
}

/// Run a `VACUUM INTO` snapshot of today's date into `snapshot_dir` if
/// one doesn't already exist, then prune everything beyond [`KEEP`].
#[tracing::instrument(skip(pool))]
pub async fn snapshot_if_needed(pool: &SqlitePool, snapshot_dir: &Path) -> Result<(), StorageError> {
    std::fs::create_dir_all(snapshot_dir)?;
    let today = Utc::now().date_naive();
    let target = snapshot_dir.join(snapshot_name(today));

    if !target.exists() {
        tracing::info!(path = %target.display(), "writing daily database snapshot");
        let target_sql = target.display().to_string().replace('\'', "''");
        sqlx::query(&format!("VACUUM INTO '{target_sql}'")).execute(pool).await?;
    }

    prune(snapshot_dir)?;
    Ok(())
}

fn prune(snapshot_dir: &Path) -> Result<(), StorageError> {
    let mut snapshots: Vec<PathBuf> = std::fs::read_dir(snapshot_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "db"))
        .collect();
    snapshots.sort();

    while snapshots.len() > KEEP {
        let oldest = snapshots.remove(0);
        tracing::info!(path = %oldest.display(), "pruning old database snapshot");
        if let Err(error) = std::fs::remove_file(&oldest) {
            tracing::warn!(path = %oldest.display(), %error, "failed to prune snapshot");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::connect;
    use tempfile::TempDir;

    #[tokio::test]
    async fn writes_one_snapshot_per_day() {
        let db_dir = TempDir::new().expect("db dir");
        let snap_dir = TempDir::new().expect("snap dir");
        let pool = connect(db_dir.path().join("test.db")).await.expect("connect");

        snapshot_if_needed(&pool, snap_dir.path()).await.expect("snapshot");
        snapshot_if_needed(&pool, snap_dir.path()).await.expect("snapshot again");

        let count = std::fs::read_dir(snap_dir.path()).expect("read dir").count();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn prune_keeps_at_most_seven() {
        let snap_dir = TempDir::new().expect("snap dir");
        for day in 1..=10u32 {
            let name = snapshot_name(
                chrono::NaiveDate::from_ymd_opt(2026, 1, day).expect("valid date"),
            );
            std::fs::write(snap_dir.path().join(name), b"fake").expect("write");
        }
        prune(snap_dir.path()).expect("prune");
        let count = std::fs::read_dir(snap_dir.path()).expect("read dir").count();
        assert_eq!(count, KEEP);
    }
}
