// SPDX-License-Identifier: MIT

//! `Log`: per-run audit record, cascade-deleted with the job (`spec.md` §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{JobId, LogId};
use crate::job::JobStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    pub id: LogId,
    pub job_id: JobId,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Terminal status; `None` while the run is still in flight.
    pub status: Option<JobStatus>,
    pub bytes_transferred: u64,
    pub files_transferred: u64,
    pub output: String,
    pub error: Option<String>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for Log {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;
        let status: Option<String> = row.try_get("status")?;
        let status = status
            .map(|s| s.parse::<JobStatus>())
            .transpose()
            .map_err(|e: String| sqlx::Error::Decode(e.into()))?;
        Ok(Self {
            id: row.try_get("id")?,
            job_id: row.try_get("job_id")?,
            started_at: row.try_get("started_at")?,
            finished_at: row.try_get("finished_at")?,
            status,
            bytes_transferred: row.try_get::<i64, _>("bytes_transferred")? as u64,
            files_transferred: row.try_get::<i64, _>("files_transferred")? as u64,
            output: row.try_get("output")?,
            error: row.try_get("error")?,
        })
    }
}
