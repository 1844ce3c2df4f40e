// SPDX-License-Identifier: MIT

//! Pool construction: durability-first pragmas and embedded migrations
//! (`spec.md` §4.1: "synchronous writes fully committed before
//! acknowledgement, journal mode optimized for durability over
//! throughput, foreign keys enforced").

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use crate::error::StorageError;

#[tracing::instrument(skip_all, fields(path = %db_path.as_ref().display()))]
pub async fn connect(db_path: impl AsRef<Path>) -> Result<SqlitePool, StorageError> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.as_ref().display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete)
        .synchronous(SqliteSynchronous::Full)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new().max_connections(1).connect_with(options).await?;

    tracing::info!("running migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
