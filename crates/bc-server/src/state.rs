// SPDX-License-Identifier: MIT

//! Shared application state, following the teacher's module-scoped
//! `Arc<...>` shared-state convention (`bc-eventbus::bus`'s doc comment
//! on `ListenCtx.state`): one `AppState`, cheap to clone, handed to every
//! route handler via axum's `State` extractor.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

use bc_core::ServerId;
use bc_deploy::Deployer;
use bc_eventbus::EventBus;
use bc_orchestrator::Orchestrator;
use bc_registry::Registry;
use bc_scheduler::Scheduler;
use parking_lot::Mutex;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;

/// The registry's current per-server reachability, recomputed by the
/// ping service every `PING_INTERVAL_SECS` (`SPEC_FULL.md` §4.9).
#[derive(Default)]
pub struct PingSnapshot {
    inner: Mutex<HashMap<ServerId, bool>>,
}

impl PingSnapshot {
    pub fn get(&self) -> HashMap<ServerId, bool> {
        self.inner.lock().clone()
    }

    pub fn set(&self, snapshot: HashMap<ServerId, bool>) {
        *self.inner.lock() = snapshot;
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub registry: Arc<Registry>,
    pub events: EventBus,
    pub orchestrator: Orchestrator,
    pub scheduler: Arc<tokio::sync::Mutex<Scheduler>>,
    pub deployer: Arc<dyn Deployer>,
    pub ping_snapshot: Arc<PingSnapshot>,
    pub local_ipv4_interfaces: Arc<Vec<Ipv4Addr>>,
    /// Cancelled during graceful shutdown (step 4, `SPEC_FULL.md` §4.10)
    /// so every UI socket's read/write loop can unwind without the event
    /// bus needing a dedicated close-all primitive.
    pub ui_shutdown: CancellationToken,
    /// Cancelled during graceful shutdown (step 2) to stop the ping,
    /// snapshot, and replay-sweep background tasks.
    pub background_shutdown: CancellationToken,
}

impl AppState {
    /// The configured backup root, or the precondition error every route
    /// that needs one should return when it is unset (`spec.md` §7
    /// "backup root unset").
    pub async fn backup_root(&self) -> Result<String, ApiError> {
        bc_storage::settings::get_setting(&self.pool, bc_core::BACKUP_ROOT_KEY)
            .await?
            .ok_or_else(|| ApiError::Precondition("backup root is not configured".to_string()))
    }
}
