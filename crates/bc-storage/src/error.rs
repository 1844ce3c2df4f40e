// SPDX-License-Identifier: MIT

//! Storage-layer errors, mirroring the teacher's per-crate `thiserror`
//! enums (`SnapshotError`, `MigrationError`) with one variant per
//! failure class named in `SPEC_FULL.md` §4.1.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
}
