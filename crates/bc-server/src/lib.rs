// SPDX-License-Identifier: MIT

//! Backup controller HTTP/WebSocket server: library surface shared by
//! `main.rs` and the integration test suite.

pub mod agent_transport;
pub mod env;
pub mod error;
pub mod ping;
pub mod replay_sweep;
pub mod routes;
pub mod shutdown;
pub mod snapshot;
pub mod state;
pub mod validate;
pub mod ws;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Assemble the full router: `/api/*` REST routes plus the two
/// WebSocket upgrade endpoints, with request tracing.
pub fn router(state: AppState) -> Router {
    routes::router()
        .route("/ws/agent", get(ws::agent::handler))
        .route("/ws/ui", get(ws::ui::handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
