// SPDX-License-Identifier: MIT

//! Periodic database snapshot task (`SPEC_FULL.md` §4.1): runs
//! `bc_storage::snapshot::snapshot_if_needed` once at startup and again
//! every 24 hours thereafter, mirroring `ping::run`'s shape, so a
//! long-lived process never skips a calendar day.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::env;
use crate::state::AppState;

const SNAPSHOT_CHECK_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

pub async fn run(state: AppState, cancel: CancellationToken) {
    let snapshot_dir = PathBuf::from(env::data_dir()).join("snapshots");
    tick(&state, &snapshot_dir).await;

    let mut interval = tokio::time::interval(SNAPSHOT_CHECK_INTERVAL);
    interval.tick().await; // first tick fires immediately; the startup check above already ran

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => tick(&state, &snapshot_dir).await,
        }
    }
}

async fn tick(state: &AppState, snapshot_dir: &Path) {
    if let Err(error) = bc_storage::snapshot::snapshot_if_needed(&state.pool, snapshot_dir).await {
        tracing::warn!(%error, "database snapshot check failed");
    }
}
