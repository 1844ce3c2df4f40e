// SPDX-License-Identifier: MIT

//! `/api/storage*` (`spec.md` §6): settings (with move-on-change), path
//! browsing (guarded by [`bc_layout::resolve_within`], invariant I7),
//! disk usage, and the aggregated server/job/version hierarchy.

use std::path::{Path as FsPath, PathBuf};

use axum::extract::{Query, State};
use axum::Json;
use bc_core::BACKUP_ROOT_KEY;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sysinfo::Disks;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    backup_root: Option<String>,
}

pub async fn get_settings(State(state): State<AppState>) -> Result<Json<SettingsResponse>, ApiError> {
    let backup_root = bc_storage::settings::get_setting(&state.pool, BACKUP_ROOT_KEY).await?;
    Ok(Json(SettingsResponse { backup_root }))
}

#[derive(Debug, Deserialize)]
pub struct SettingsUpdate {
    backup_root: String,
}

/// Moves existing content to the new root (a single `rename`, atomic on
/// the same filesystem) and rewrites every Job's `local_path` before
/// persisting the new setting, so readers never observe a root pointing
/// at paths that don't exist on disk (`spec.md` §6 "Storage settings").
pub async fn put_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let previous = bc_storage::settings::get_setting(&state.pool, BACKUP_ROOT_KEY).await?;

    if let Some(previous) = &previous {
        if previous != &update.backup_root {
            let old_root = PathBuf::from(previous);
            let new_root = PathBuf::from(&update.backup_root);
            if let Some(parent) = new_root.parent() {
                std::fs::create_dir_all(parent).map_err(bc_layout::LayoutError::from)?;
            }
            if old_root.exists() {
                std::fs::rename(&old_root, &new_root).map_err(bc_layout::LayoutError::from)?;
            } else {
                std::fs::create_dir_all(&new_root).map_err(bc_layout::LayoutError::from)?;
            }

            for job in bc_storage::jobs::list(&state.pool).await? {
                let Ok(relative) = FsPath::new(&job.local_path).strip_prefix(&old_root) else { continue };
                let rewritten = new_root.join(relative);
                bc_storage::jobs::set_local_path(&state.pool, job.id, &rewritten.to_string_lossy()).await?;
            }
        }
    }

    bc_storage::settings::set_setting(&state.pool, BACKUP_ROOT_KEY, &update.backup_root).await?;
    Ok(Json(SettingsResponse { backup_root: Some(update.backup_root) }))
}

#[derive(Debug, Serialize)]
struct DirEntry {
    name: String,
    #[serde(rename = "isDir")]
    is_dir: bool,
    size: u64,
}

fn list_dir(dir: &FsPath) -> Result<Vec<DirEntry>, ApiError> {
    let mut entries = Vec::new();
    let read_dir = std::fs::read_dir(dir).map_err(bc_layout::LayoutError::from)?;
    for entry in read_dir {
        let entry = entry.map_err(bc_layout::LayoutError::from)?;
        let metadata = entry.metadata().map_err(bc_layout::LayoutError::from)?;
        entries.push(DirEntry {
            name: entry.file_name().to_string_lossy().to_string(),
            is_dir: metadata.is_dir(),
            size: metadata.len(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

#[derive(Debug, Deserialize)]
pub struct BrowseQuery {
    #[serde(default)]
    path: String,
}

pub async fn browse(State(state): State<AppState>, Query(query): Query<BrowseQuery>) -> Result<Json<Value>, ApiError> {
    let backup_root = state.backup_root().await?;
    let resolved = bc_layout::resolve_within(FsPath::new(&backup_root), &query.path)?;
    Ok(Json(serde_json::json!({"entries": list_dir(&resolved)?})))
}

#[derive(Debug, Deserialize)]
pub struct BrowseVersionQuery {
    version_id: bc_core::VersionId,
    #[serde(default)]
    path: String,
}

/// Guarded by [`bc_layout::resolve_within`] (invariant I7): a path that
/// escapes the version root maps to `403`, not a filesystem error.
pub async fn browse_version(
    State(state): State<AppState>,
    Query(query): Query<BrowseVersionQuery>,
) -> Result<Json<Value>, ApiError> {
    let version = bc_storage::versions::get(&state.pool, query.version_id).await?;
    let resolved = bc_layout::resolve_within(FsPath::new(&version.local_path), &query.path)?;
    Ok(Json(serde_json::json!({"entries": list_dir(&resolved)?})))
}

#[derive(Debug, Serialize)]
pub struct DiskUsage {
    total_bytes: u64,
    available_bytes: u64,
    used_bytes: u64,
}

pub async fn disk_usage(State(state): State<AppState>) -> Result<Json<DiskUsage>, ApiError> {
    let backup_root = state.backup_root().await?;
    let disks = Disks::new_with_refreshed_list();
    let root = PathBuf::from(&backup_root);

    let best = disks
        .list()
        .iter()
        .filter(|disk| root.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len());

    let Some(disk) = best else {
        return Err(ApiError::Precondition("could not determine disk for the backup root".to_string()));
    };

    let total = disk.total_space();
    let available = disk.available_space();
    Ok(Json(DiskUsage { total_bytes: total, available_bytes: available, used_bytes: total.saturating_sub(available) }))
}

#[derive(Debug, Serialize)]
struct HierarchyVersion {
    id: bc_core::VersionId,
    timestamp: String,
    status: bc_core::VersionStatus,
    bytes_total: u64,
}

#[derive(Debug, Serialize)]
struct HierarchyJob {
    id: bc_core::JobId,
    name: String,
    versions: Vec<HierarchyVersion>,
}

#[derive(Debug, Serialize)]
struct HierarchyServer {
    id: bc_core::ServerId,
    name: String,
    jobs: Vec<HierarchyJob>,
}

/// Aggregated server -> job -> version tree for the storage dashboard
/// (`spec.md` §6 "Hierarchy"). Composed from existing queries rather
/// than a dedicated bc-layout/bc-storage primitive.
pub async fn hierarchy(State(state): State<AppState>) -> Result<Json<Vec<HierarchyServer>>, ApiError> {
    let mut tree = Vec::new();
    for server in bc_storage::servers::list(&state.pool).await? {
        let mut jobs = Vec::new();
        for job in bc_storage::jobs::list_for_server(&state.pool, server.id).await? {
            let versions = bc_storage::versions::list_for_job(&state.pool, job.id)
                .await?
                .into_iter()
                .map(|v| HierarchyVersion { id: v.id, timestamp: v.timestamp, status: v.status, bytes_total: v.bytes_total })
                .collect();
            jobs.push(HierarchyJob { id: job.id, name: job.name, versions });
        }
        tree.push(HierarchyServer { id: server.id, name: server.name, jobs });
    }
    Ok(Json(tree))
}
