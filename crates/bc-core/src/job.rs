// SPDX-License-Identifier: MIT

//! `Job`: a backup specification bound to a [`crate::Server`] (`spec.md` §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{JobId, ServerId};

/// Default retention count for completed versions (`spec.md` §3).
pub const DEFAULT_RETENTION_COUNT: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl JobStatus {
    /// The state-machine table in `spec.md` §4.6: every status but
    /// `running` accepts a fresh `start`.
    pub fn can_start(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// A backup specification bound to a server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub server_id: ServerId,
    pub name: String,
    /// Ordered absolute remote paths to back up. Persisted as an encoded
    /// sequence of strings (`spec.md` §9 "dynamic typing leakage").
    pub remote_paths: Vec<String>,
    /// `backup_root/<slug(server.name)>/<slug(job.name)>`, allocated once
    /// at creation (`spec.md` §4.5).
    pub local_path: String,
    pub cron: Option<String>,
    pub status: JobStatus,
    pub enabled: bool,
    pub retention_count: u32,
    pub last_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted from `POST /api/jobs`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewJob {
    pub server_id: ServerId,
    pub name: String,
    pub remote_paths: Vec<String>,
    pub cron: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub retention_count: Option<u32>,
}

fn default_enabled() -> bool {
    true
}

/// Fields accepted from `PUT /api/jobs/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobUpdate {
    pub name: Option<String>,
    pub remote_paths: Option<Vec<String>>,
    pub cron: Option<Option<String>>,
    pub enabled: Option<bool>,
    pub retention_count: Option<u32>,
}

/// Encode the ordered remote-path list the way it is persisted in the
/// `jobs.remote_paths` TEXT column. `spec.md` §9 requires
/// `decode(encode(v)) == v`.
pub fn encode_remote_paths(paths: &[String]) -> String {
    // `serde_json::to_string` on a `Vec<String>` cannot fail.
    serde_json::to_string(paths).unwrap_or_else(|_| "[]".to_string())
}

/// Inverse of [`encode_remote_paths`].
pub fn decode_remote_paths(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for Job {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;
        let status: String = row.try_get("status")?;
        let remote_paths: String = row.try_get("remote_paths")?;
        Ok(Self {
            id: row.try_get("id")?,
            server_id: row.try_get("server_id")?,
            name: row.try_get("name")?,
            remote_paths: decode_remote_paths(&remote_paths),
            local_path: row.try_get("local_path")?,
            cron: row.try_get("cron")?,
            status: status.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            enabled: row.try_get("enabled")?,
            retention_count: row.try_get::<i64, _>("retention_count")? as u32,
            last_run_at: row.try_get("last_run_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
