// SPDX-License-Identifier: MIT

//! Liveness ping service (`spec.md` §4.9, `SPEC_FULL.md` §4.9): every
//! `PING_INTERVAL_SECS`, diff the registry's connected-server snapshot
//! against the last one and broadcast `server:ping` only for servers
//! whose reachability changed.

use std::collections::HashMap;

use bc_wire::UiEvent;
use tokio_util::sync::CancellationToken;

use crate::env;
use crate::state::AppState;

pub async fn run(state: AppState, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(env::ping_interval());
    interval.tick().await; // first tick fires immediately; skip it

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => tick(&state).await,
        }
    }
}

async fn tick(state: &AppState) {
    let servers = match bc_storage::servers::list(&state.pool).await {
        Ok(servers) => servers,
        Err(error) => {
            tracing::warn!(%error, "ping service failed to list servers");
            return;
        }
    };

    let previous = state.ping_snapshot.get();
    let mut next = HashMap::with_capacity(servers.len());

    for server in &servers {
        let reachable = state.registry.is_connected(server.id);
        next.insert(server.id, reachable);
        if previous.get(&server.id).copied() != Some(reachable) {
            state.events.publish(UiEvent::ServerPing { server_id: server.id, reachable });
        }
    }

    state.ping_snapshot.set(next);
}
