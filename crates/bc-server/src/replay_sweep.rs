// SPDX-License-Identifier: MIT

//! Periodic replay-buffer sweep (`spec.md` §4.2): drops per-job replay
//! buffers whose terminal event is more than 5 minutes old so a
//! long-lived process doesn't keep one buffer per finished job forever.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::state::AppState;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub async fn run(state: AppState, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    interval.tick().await; // first tick fires immediately; nothing to sweep yet

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => state.events.sweep_expired_replays(),
        }
    }
}
