// SPDX-License-Identifier: MIT

//! `/api/agent/*` (`spec.md` §6): pushing an update to a connected
//! agent, and serving the agent binary the deployer uploads during
//! `POST /api/servers`.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use bc_core::{AgentState, ServerId};
use bc_wire::ControllerOutbound;
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;
use crate::env;

/// Fire-and-forget `agent:update` (`spec.md` §4.8): the agent's own
/// restart-with-new-binary flow is out of scope here, the controller
/// only has to hand it a download path and mark the row `updating`.
pub async fn update(State(state): State<AppState>, Path(server_id): Path<ServerId>) -> Result<Json<Value>, ApiError> {
    if !state.registry.is_connected(server_id) {
        return Err(ApiError::AgentUnavailable);
    }

    let sent = state
        .registry
        .send(
            server_id,
            ControllerOutbound::AgentUpdate {
                download_path: "/api/agent/binary".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        )
        .await;
    if !sent {
        return Err(ApiError::AgentUnavailable);
    }

    bc_storage::servers::set_agent_state(&state.pool, server_id, AgentState::Updating).await?;
    Ok(Json(serde_json::json!({"updating": true})))
}

pub async fn binary() -> Result<impl IntoResponse, ApiError> {
    let bytes = tokio::fs::read(env::agent_binary_path())
        .await
        .map_err(|error| ApiError::Precondition(format!("agent binary unavailable: {error}")))?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}
