// SPDX-License-Identifier: MIT

//! `/api/servers*` (`spec.md` §6).

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use bc_core::{NewServer, Server, ServerId, ServerUpdate};
use bc_deploy::DeployRequest;
use bc_wire::{ControllerOutbound, UiEvent};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;
use crate::{env, validate};

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Server>>, ApiError> {
    Ok(Json(bc_storage::servers::list(&state.pool).await?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<ServerId>) -> Result<Json<Server>, ApiError> {
    Ok(Json(bc_storage::servers::get(&state.pool, id).await?))
}

/// Creates the row, deploys the agent, and deletes the row again if
/// deploy fails before the service is verified active (`spec.md` §4.4).
pub async fn create(State(state): State<AppState>, Json(new_server): Json<NewServer>) -> Result<Json<Server>, ApiError> {
    validate::non_empty_slug(&new_server.name)?;

    let server = bc_storage::servers::create(&state.pool, new_server.clone()).await?;

    let agent_binary = tokio::fs::read(env::agent_binary_path())
        .await
        .map_err(|error| ApiError::Precondition(format!("agent binary unavailable on controller host: {error}")))?;

    let request = DeployRequest {
        server_id: server.id,
        hostname: new_server.hostname,
        port: new_server.port,
        ssh_user: new_server.ssh_user,
        ssh_password: new_server.password,
        agent_binary,
        agent_listen_port: env::agent_listen_port(),
        agent_data_dir: env::agent_data_dir(),
        env_controller_ip: env::backup_server_ip(),
        local_ipv4_interfaces: (*state.local_ipv4_interfaces).clone(),
    };

    if let Err(error) = state.deployer.deploy(request).await {
        tracing::warn!(%error, server_id = %server.id, "agent deploy failed, rolling back server row");
        if let Err(cleanup_error) = bc_storage::servers::delete(&state.pool, server.id).await {
            tracing::error!(%cleanup_error, server_id = %server.id, "failed to roll back server row after deploy failure");
        }
        return Err(ApiError::Deploy(error));
    }

    state.events.publish(UiEvent::ServerCreated { server_id: server.id });
    tokio::spawn(await_registration(state.clone(), server.id));
    Ok(Json(server))
}

/// Waits up to 30s for the freshly deployed agent to complete
/// `agent:register` (`spec.md` §4.4 step 7). Runs detached from the
/// response: success is not required for `create` to return.
async fn await_registration(state: AppState, server_id: ServerId) {
    const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(500);
    const WAIT_LIMIT: std::time::Duration = std::time::Duration::from_secs(30);

    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while tokio::time::Instant::now() < deadline {
        if state.registry.is_connected(server_id) {
            tracing::info!(%server_id, "agent completed registration after deploy");
            return;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    tracing::warn!(%server_id, "agent did not complete registration within 30s of deploy");
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<ServerId>,
    Json(update): Json<ServerUpdate>,
) -> Result<Json<Server>, ApiError> {
    if let Some(name) = &update.name {
        validate::non_empty_slug(name)?;
    }
    let server = bc_storage::servers::update(&state.pool, id, update).await?;
    state.events.publish(UiEvent::ServerUpdated { server_id: id });
    Ok(Json(server))
}

/// Cancels every job running against this server, force-closes its
/// agent connection, and deletes the row — Jobs/Logs/Versions cascade
/// at the database level (`bc-storage/migrations/0001_init.sql`).
pub async fn delete(State(state): State<AppState>, Path(id): Path<ServerId>) -> Result<Json<Value>, ApiError> {
    for job in bc_storage::jobs::list_for_server(&state.pool, id).await? {
        if state.orchestrator.is_running(job.id) {
            let _ = state.orchestrator.cancel(job.id).await;
        }
        state.scheduler.lock().await.unschedule(job.id).await?;
    }

    if let Some(connection) = state.registry.unregister(id) {
        connection.close();
    }

    bc_storage::servers::delete(&state.pool, id).await?;
    state.events.publish(UiEvent::ServerDeleted { server_id: id });
    Ok(Json(serde_json::json!({"deleted": true})))
}

pub async fn ping_status(State(state): State<AppState>) -> Json<HashMap<ServerId, bool>> {
    Json(state.ping_snapshot.get())
}

#[derive(Debug, Deserialize)]
pub struct ExploreQuery {
    #[serde(default)]
    path: String,
}

/// Proxies a `fs:browse` RPC to the connected agent (`spec.md` §6
/// "Explore"). 503 if the agent is not connected.
pub async fn explore(
    State(state): State<AppState>,
    Path(id): Path<ServerId>,
    Query(query): Query<ExploreQuery>,
) -> Result<Json<Value>, ApiError> {
    let payload = state.registry.request(id, ControllerOutbound::FsBrowse { path: query.path }, None).await?;
    Ok(Json(payload))
}
