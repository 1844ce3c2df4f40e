// SPDX-License-Identifier: MIT

//! Key-value settings store. The only required key is `backup_root`
//! (`spec.md` §3).

use sqlx::SqlitePool;

use crate::error::StorageError;

#[tracing::instrument(skip(pool))]
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>, StorageError> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(value,)| value))
}

#[tracing::instrument(skip(pool, value))]
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<(), StorageError> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::connect;
    use bc_core::BACKUP_ROOT_KEY;
    use tempfile::TempDir;

    #[tokio::test]
    async fn unset_key_is_none() {
        let dir = TempDir::new().expect("tempdir");
        let pool = connect(dir.path().join("test.db")).await.expect("connect");
        assert!(get_setting(&pool, BACKUP_ROOT_KEY).await.expect("query").is_none());
    }

    #[tokio::test]
    async fn set_then_get_round_trips_and_upserts() {
        let dir = TempDir::new().expect("tempdir");
        let pool = connect(dir.path().join("test.db")).await.expect("connect");
        set_setting(&pool, BACKUP_ROOT_KEY, "/srv/backups").await.expect("set");
        assert_eq!(
            get_setting(&pool, BACKUP_ROOT_KEY).await.expect("query"),
            Some("/srv/backups".to_string())
        );
        set_setting(&pool, BACKUP_ROOT_KEY, "/mnt/backups").await.expect("set again");
        assert_eq!(
            get_setting(&pool, BACKUP_ROOT_KEY).await.expect("query"),
            Some("/mnt/backups".to_string())
        );
    }
}
