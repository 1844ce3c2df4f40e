// SPDX-License-Identifier: MIT

//! Agent WebSocket handler (`spec.md` §4.3, §6 "Agent WebSocket").
//!
//! The first frame on a new connection must be `agent:register`; every
//! frame after that is handed to [`bc_registry::Registry::dispatch_inbound`],
//! which resolves it against a pending RPC or broadcasts it as an
//! [`AgentEvent`]. When the socket closes, the connection is
//! unregistered and every job still running on that server is sealed
//! as failed (`spec.md` §4.6 "agent disconnects mid-run").

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use bc_core::AgentState;
use bc_wire::{AgentEvent, Frame, RegisterReply, UiEvent};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::agent_transport::WsAgentTransport;
use crate::env;
use crate::state::AppState;

pub async fn handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();
    let cancel = CancellationToken::new();
    let awaiting_pong = Arc::new(AtomicBool::new(false));

    let write_cancel = cancel.clone();
    let write_awaiting_pong = awaiting_pong.clone();
    let write_task = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(env::agent_ping_interval());
        ping_interval.tick().await; // first tick fires immediately

        loop {
            tokio::select! {
                _ = write_cancel.cancelled() => break,
                frame = rx.recv() => {
                    let Some(frame) = frame else { break };
                    let Ok(text) = frame.to_json() else { continue };
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if write_awaiting_pong.swap(true, Ordering::SeqCst) {
                        tracing::warn!("agent socket missed a pong, closing");
                        break;
                    }
                    if sink.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = sink.close().await;
    });

    let transport = Arc::new(WsAgentTransport::new(tx, cancel.clone()));
    let mut registered: Option<bc_core::ServerId> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            message = stream.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        let Ok(frame) = Frame::from_json(&text) else {
                            tracing::warn!("agent socket sent malformed frame");
                            continue;
                        };
                        match registered {
                            None => {
                                if !try_register(&state, &frame, &transport, &mut registered).await {
                                    break;
                                }
                            }
                            Some(server_id) => {
                                state.registry.dispatch_inbound(server_id, &frame);
                            }
                        }
                    }
                    Some(Ok(Message::Pong(_))) => awaiting_pong.store(false, Ordering::SeqCst),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        tracing::warn!(%error, "agent socket read error");
                        break;
                    }
                }
            }
        }
    }

    cancel.cancel();
    if let Some(server_id) = registered {
        state.registry.unregister(server_id);
        state.orchestrator.handle_agent_disconnected(server_id);
        // An agent pushed an update drops its socket to restart into the new
        // binary; `Updating` must survive that self-restart disconnect and
        // only clear once the new process re-registers (`spec.md` §4.3, §4.8).
        match bc_storage::servers::get(&state.pool, server_id).await {
            Ok(server) if server.agent_state == AgentState::Updating => {}
            Ok(_) => {
                if let Err(error) =
                    bc_storage::servers::set_agent_state(&state.pool, server_id, AgentState::Disconnected).await
                {
                    tracing::warn!(%error, %server_id, "failed to mark server disconnected");
                }
            }
            Err(error) => {
                tracing::warn!(%error, %server_id, "failed to read agent state on disconnect");
            }
        }
        state.events.publish(UiEvent::ServerUpdated { server_id });
    }
    let _ = write_task.await;
}

/// Handles the first frame on a fresh connection. Returns `false` when
/// the connection should be dropped (unknown server, malformed
/// registration).
async fn try_register(
    state: &AppState,
    frame: &Frame,
    transport: &Arc<WsAgentTransport>,
    registered: &mut Option<bc_core::ServerId>,
) -> bool {
    let event = match AgentEvent::from_frame(frame) {
        Ok(event) => event,
        Err(error) => {
            tracing::warn!(%error, "first frame on agent socket was not agent:register");
            return false;
        }
    };
    let AgentEvent::Register { server_id, hostname, version } = event else {
        tracing::warn!("first frame on agent socket was not agent:register");
        return false;
    };

    if bc_storage::servers::get(&state.pool, server_id).await.is_err() {
        let _ = transport.send_frame(RegisterReply::Error { reason: "unknown server".to_string() }.into_frame()).await;
        return false;
    }

    state.registry.register(server_id, hostname, version.clone(), transport.clone());
    if let Err(error) = bc_storage::servers::mark_connected(&state.pool, server_id, &version).await {
        tracing::warn!(%error, %server_id, "failed to record agent connection");
    }
    state.events.publish(UiEvent::ServerUpdated { server_id });
    let _ = transport.send_frame(RegisterReply::Ok.into_frame()).await;
    *registered = Some(server_id);
    true
}
