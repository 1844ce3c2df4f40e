// SPDX-License-Identifier: MIT

//! Version directory lifecycle: eager creation, meta manifests, the
//! "current" pointer (`spec.md` §4.5).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::LayoutError;

pub fn versions_dir(job_path: &Path) -> PathBuf {
    job_path.join("versions")
}

pub fn version_dir(job_path: &Path, timestamp: &str) -> PathBuf {
    versions_dir(job_path).join(timestamp)
}

/// Create `versions/<timestamp>/` eagerly so uploads can target it
/// before the run completes (`spec.md` §4.6 "idle -> running").
pub fn create_version_dir(job_path: &Path, timestamp: &str) -> Result<PathBuf, LayoutError> {
    let dir = version_dir(job_path, timestamp);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[derive(Debug, Serialize)]
struct ServerManifest<'a> {
    name: &'a str,
    hostname: &'a str,
    port: u16,
}

#[derive(Debug, Serialize)]
struct JobManifest<'a> {
    id: String,
    name: &'a str,
    #[serde(rename = "remotePaths")]
    remote_paths: &'a [String],
}

#[derive(Debug, Serialize)]
struct AgentManifest {
    enabled: bool,
}

/// `.backup-meta.json` at the job root (`spec.md` §4.6).
#[derive(Debug, Serialize)]
struct BackupMeta<'a> {
    server: ServerManifest<'a>,
    job: JobManifest<'a>,
    agent: AgentManifest,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
    #[serde(rename = "lastRunAt")]
    last_run_at: Option<DateTime<Utc>>,
}

#[allow(clippy::too_many_arguments)]
pub fn write_backup_meta(
    job_path: &Path,
    server_name: &str,
    server_hostname: &str,
    server_port: u16,
    job_id: &str,
    job_name: &str,
    remote_paths: &[String],
    created_at: DateTime<Utc>,
    last_run_at: Option<DateTime<Utc>>,
) -> Result<(), LayoutError> {
    let meta = BackupMeta {
        server: ServerManifest { name: server_name, hostname: server_hostname, port: server_port },
        job: JobManifest { id: job_id.to_string(), name: job_name, remote_paths },
        agent: AgentManifest { enabled: true },
        created_at,
        last_run_at,
    };
    let path = job_path.join(".backup-meta.json");
    std::fs::write(path, serde_json::to_vec_pretty(&meta)?)?;
    Ok(())
}

/// `.version-meta.json` written on completion (`spec.md` §6 "Persisted
/// layout").
#[derive(Debug, Serialize)]
struct VersionMeta<'a> {
    version_id: &'a str,
    timestamp: &'a str,
    bytes_transferred: u64,
    files_transferred: u64,
    status: &'a str,
}

pub fn write_version_meta(
    job_path: &Path,
    timestamp: &str,
    version_id: &str,
    bytes_transferred: u64,
    files_transferred: u64,
    status: &str,
) -> Result<(), LayoutError> {
    let meta = VersionMeta { version_id, timestamp, bytes_transferred, files_transferred, status };
    let path = version_dir(job_path, timestamp).join(".version-meta.json");
    std::fs::write(path, serde_json::to_vec_pretty(&meta)?)?;
    Ok(())
}

/// Atomically point `current` at `versions/<timestamp>` (unlink then
/// create), only called after a version transitions to `completed`
/// (`spec.md` §4.5: "readers must tolerate its transient absence").
pub fn promote_current(job_path: &Path, timestamp: &str) -> Result<(), LayoutError> {
    let current = job_path.join("current");
    if current.exists() || current.symlink_metadata().is_ok() {
        std::fs::remove_file(&current)?;
    }
    #[cfg(unix)]
    std::os::unix::fs::symlink(Path::new("versions").join(timestamp), &current)?;
    #[cfg(not(unix))]
    std::fs::write(&current, Path::new("versions").join(timestamp).to_string_lossy().as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn create_version_dir_is_idempotent() {
        let dir = TempDir::new().expect("tempdir");
        let a = create_version_dir(dir.path(), "2026-01-02_03-04-05").expect("create");
        let b = create_version_dir(dir.path(), "2026-01-02_03-04-05").expect("create again");
        assert_eq!(a, b);
        assert!(a.is_dir());
    }

    #[test]
    fn promote_current_points_at_versions_subdir() {
        let dir = TempDir::new().expect("tempdir");
        create_version_dir(dir.path(), "2026-01-02_03-04-05").expect("create");
        promote_current(dir.path(), "2026-01-02_03-04-05").expect("promote");
        let target = std::fs::read_link(dir.path().join("current")).expect("read link");
        assert_eq!(target, Path::new("versions").join("2026-01-02_03-04-05"));
    }

    #[test]
    fn promote_current_replaces_existing_link() {
        let dir = TempDir::new().expect("tempdir");
        create_version_dir(dir.path(), "2026-01-02_03-04-05").expect("create first");
        create_version_dir(dir.path(), "2026-01-02_03-05-00").expect("create second");
        promote_current(dir.path(), "2026-01-02_03-04-05").expect("promote first");
        promote_current(dir.path(), "2026-01-02_03-05-00").expect("promote second");
        let target = std::fs::read_link(dir.path().join("current")).expect("read link");
        assert_eq!(target, Path::new("versions").join("2026-01-02_03-05-00"));
    }

    #[test]
    fn version_meta_round_trips_through_json() {
        let dir = TempDir::new().expect("tempdir");
        create_version_dir(dir.path(), "2026-01-02_03-04-05").expect("create");
        write_version_meta(dir.path(), "2026-01-02_03-04-05", "v-1", 1024, 12, "completed")
            .expect("write meta");
        let raw = std::fs::read_to_string(
            version_dir(dir.path(), "2026-01-02_03-04-05").join(".version-meta.json"),
        )
        .expect("read meta");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("parse");
        assert_eq!(value["bytes_transferred"], 1024);
        assert_eq!(value["status"], "completed");
    }
}
