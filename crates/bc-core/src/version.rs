// SPDX-License-Identifier: MIT

//! `Version`: one snapshot attempt of a [`crate::Job`] (`spec.md` §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{JobId, LogId, VersionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionStatus {
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for VersionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown version status: {other}")),
        }
    }
}

/// One snapshot attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub job_id: JobId,
    pub log_id: Option<LogId>,
    /// Lexicographically sortable `YYYY-MM-DD_HH-MM-SS`, derived from
    /// `created_at` (`spec.md` §3).
    pub timestamp: String,
    pub local_path: String,
    pub status: VersionStatus,
    pub bytes_transferred: u64,
    pub bytes_total: u64,
    pub files_transferred: u64,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Render the version-timestamp directory name for a creation instant.
/// Shared by the storage layer (row field) and the layout manager
/// (directory name) so the two never drift.
pub fn format_version_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d_%H-%M-%S").to_string()
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for Version {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            job_id: row.try_get("job_id")?,
            log_id: row.try_get("log_id")?,
            timestamp: row.try_get("timestamp")?,
            local_path: row.try_get("local_path")?,
            status: status.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            bytes_transferred: row.try_get::<i64, _>("bytes_transferred")? as u64,
            bytes_total: row.try_get::<i64, _>("bytes_total")? as u64,
            files_transferred: row.try_get::<i64, _>("files_transferred")? as u64,
            created_at: row.try_get("created_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_format_is_sortable() {
        let a = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 6).unwrap();
        assert!(format_version_timestamp(a) < format_version_timestamp(b));
        assert_eq!(format_version_timestamp(a), "2026-01-02_03-04-05");
    }
}
