// SPDX-License-Identifier: MIT

//! REST route tables, one module per resource (`spec.md` §6).

pub mod agent;
pub mod jobs;
pub mod servers;
pub mod storage;
pub mod upload;
pub mod versions;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/servers", get(servers::list).post(servers::create))
        .route(
            "/api/servers/:id",
            get(servers::get).put(servers::update).delete(servers::delete),
        )
        .route("/api/servers/ping-status", get(servers::ping_status))
        .route("/api/servers/:id/explore", get(servers::explore))
        .route("/api/jobs", get(jobs::list).post(jobs::create))
        .route("/api/jobs/:id", get(jobs::get).put(jobs::update).delete(jobs::delete))
        .route("/api/jobs/:id/run", post(jobs::run))
        .route("/api/jobs/:id/cancel", post(jobs::cancel))
        .route("/api/jobs/:id/logs", get(jobs::logs))
        .route("/api/versions", get(versions::list))
        .route("/api/versions/:id", get(versions::get).delete(versions::delete))
        .route("/api/versions/by-job/:jobId", delete(versions::delete_by_job))
        .route("/api/versions/by-server/:serverId", delete(versions::delete_by_server))
        .route("/api/storage/settings", get(storage::get_settings).put(storage::put_settings))
        .route("/api/storage/browse", get(storage::browse))
        .route("/api/storage/browse-version", get(storage::browse_version))
        .route("/api/storage/disk-usage", get(storage::disk_usage))
        .route("/api/storage/hierarchy", get(storage::hierarchy))
        .route("/api/files/upload", post(upload::upload))
        .route("/api/agent/update/:serverId", post(agent::update))
        .route("/api/agent/binary", get(agent::binary))
}
