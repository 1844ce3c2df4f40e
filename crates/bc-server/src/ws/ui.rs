// SPDX-License-Identifier: MIT

//! UI WebSocket handler (`spec.md` §4.2, §6 "UI WebSocket").
//!
//! Every connected dashboard receives every [`UiEvent`] broadcast by
//! the event bus. The only inbound message a UI client sends is
//! `replay:request`, used after a reconnect to backfill events missed
//! while offline.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use bc_wire::{Frame, ReplayRequest};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::env;
use crate::state::AppState;

pub async fn handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (connection, mut rx) = state.events.connect();
    let awaiting_pong = Arc::new(AtomicBool::new(false));

    let write_cancel = state.ui_shutdown.clone();
    let write_awaiting_pong = awaiting_pong.clone();
    let write_task = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(env::ui_ping_interval());
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
                        tracing::warn!("ui socket missed a pong, closing");
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

    loop {
        tokio::select! {
            _ = state.ui_shutdown.cancelled() => break,
            message = stream.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => handle_text(&state, &connection, &text),
                    Some(Ok(Message::Pong(_))) => awaiting_pong.store(false, Ordering::SeqCst),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        tracing::warn!(%error, "ui socket read error");
                        break;
                    }
                }
            }
        }
    }

    write_task.abort();
}

fn handle_text(state: &AppState, connection: &bc_eventbus::UiConnection, text: &str) {
    let Ok(frame) = Frame::from_json(text) else {
        tracing::warn!("ui socket sent malformed frame");
        return;
    };
    if frame.message_type != "replay:request" {
        return;
    }
    let Ok(request) = ReplayRequest::from_frame(&frame) else {
        tracing::warn!("malformed replay:request payload");
        return;
    };
    for replayed in state.events.replay(&request) {
        connection.send(replayed);
    }
}
