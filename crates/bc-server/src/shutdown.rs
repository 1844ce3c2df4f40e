// SPDX-License-Identifier: MIT

//! Graceful shutdown controller (`SPEC_FULL.md` §4.10). Runs as the
//! future handed to `axum::serve(..).with_graceful_shutdown(..)`: once
//! the process receives its exit signal, tear down in a fixed order so
//! in-flight backups are cancelled and every socket is told before the
//! listener itself closes. A watchdog races the ordered teardown so a
//! stuck step can't hang the process past `SHUTDOWN_WATCHDOG_SECS`.

use crate::env;
use crate::state::AppState;

pub async fn signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

pub async fn run(state: AppState) {
    tracing::info!("shutdown signal received, tearing down");

    tokio::select! {
        _ = teardown(&state) => {}
        _ = tokio::time::sleep(env::shutdown_watchdog()) => {
            tracing::warn!("shutdown watchdog expired, forcing exit");
        }
    }
}

async fn teardown(state: &AppState) {
    // 1. Stop accepting new cron ticks first so nothing new starts mid-teardown.
    if let Err(error) = state.scheduler.lock().await.shutdown().await {
        tracing::warn!(%error, "failed to shut down scheduler cleanly");
    }

    // 2. Stop the ping, snapshot, and replay-sweep background loops.
    state.background_shutdown.cancel();

    // 3. Cancel every running job, then force-close every agent connection.
    // `fail_pending` is global and only safe to call here, where every
    // connection is being torn down at once — elsewhere it would
    // spuriously fail RPCs in flight to servers that are still connected.
    state.orchestrator.cancel_all_running();
    for server_id in state.registry.connected_server_ids() {
        if let Some(connection) = state.registry.unregister(server_id) {
            connection.close();
        }
    }
    state.registry.fail_pending();

    // 4. Close every UI socket.
    state.ui_shutdown.cancel();

    // 5. Close the database pool.
    state.pool.close().await;

    tracing::info!("shutdown teardown complete");
}
