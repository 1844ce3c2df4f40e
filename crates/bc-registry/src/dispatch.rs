// SPDX-License-Identifier: MIT

//! The registry itself: connection map, registration handshake,
//! message dispatch, and the outbound `send`/`request` API
//! (`spec.md` §4.3).
//!
//! `on(type, handler)`/`off(type, handler)` from the spec's abstract
//! API become `subscribe()`/drop of the returned receiver: every
//! non-RPC-response [`AgentEvent`] is broadcast, and callers filter by
//! type themselves. This is the direct idiomatic translation of
//! multi-cast registration into a `tokio::sync::broadcast` channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bc_core::{new_request_id, ServerId};
use bc_wire::{AgentEvent, ControllerOutbound, Frame};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::connection::{AgentTransport, Connection};
use crate::error::RegistryError;
use crate::pending::PendingRequests;

/// Capacity of the broadcast channel backing `subscribe()`. Slow
/// subscribers drop the oldest events rather than stall dispatch
/// (`spec.md` §4.3 "Ordering guarantee ... concurrency across agents is
/// unbounded").
const EVENT_CHANNEL_CAPACITY: usize = 1024;

pub struct Registry {
    connections: Mutex<HashMap<ServerId, Connection>>,
    pending: PendingRequests,
    events: broadcast::Sender<(ServerId, AgentEvent)>,
}

impl Default for Registry {
    fn default() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { connections: Mutex::new(HashMap::new()), pending: PendingRequests::new(), events }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every dispatched agent event (`spec.md` §4.3
    /// "invoke every handler registered for that type").
    pub fn subscribe(&self) -> broadcast::Receiver<(ServerId, AgentEvent)> {
        self.events.subscribe()
    }

    /// Install a connection for `server_id`, force-closing any prior
    /// one (`spec.md` §4.3: "if a prior AgentConnection exists for this
    /// server id, force-close it").
    #[tracing::instrument(skip(self, transport))]
    pub fn register(
        &self,
        server_id: ServerId,
        hostname: String,
        version: String,
        transport: Arc<dyn AgentTransport>,
    ) {
        let connection = Connection::new(hostname, version, transport);
        let previous = self.connections.lock().insert(server_id, connection);
        if let Some(previous) = previous {
            tracing::info!("replacing existing agent connection on reconnect");
            previous.close();
        }
    }

    /// Remove and return the connection for a closed socket, if any
    /// (`spec.md` §4.3 "On any termination").
    pub fn unregister(&self, server_id: ServerId) -> Option<Connection> {
        self.connections.lock().remove(&server_id)
    }

    pub fn is_connected(&self, server_id: ServerId) -> bool {
        self.connections.lock().contains_key(&server_id)
    }

    pub fn connected_server_ids(&self) -> Vec<ServerId> {
        self.connections.lock().keys().copied().collect()
    }

    pub fn record_ping(&self, server_id: ServerId) {
        if let Some(connection) = self.connections.lock().get_mut(&server_id) {
            connection.last_ping_at = Instant::now();
        }
    }

    pub fn last_ping_at(&self, server_id: ServerId) -> Option<Instant> {
        self.connections.lock().get(&server_id).map(|c| c.last_ping_at)
    }

    /// `send(server_id, message) -> bool` (`spec.md` §4.3): best-effort,
    /// returns `false` rather than erroring when not connected.
    #[tracing::instrument(skip(self, message))]
    pub async fn send(&self, server_id: ServerId, message: ControllerOutbound) -> bool {
        let transport = {
            let connections = self.connections.lock();
            connections.get(&server_id).map(|c| Arc::clone(&c.transport))
        };
        match transport {
            Some(transport) => transport.send_frame(message.into_frame()).await.is_ok(),
            None => false,
        }
    }

    /// `request(server_id, message, timeout) -> future<payload>`
    /// (`spec.md` §4.3): used for `fs:browse` and other synchronous
    /// agent queries.
    #[tracing::instrument(skip(self, message))]
    pub async fn request(
        &self,
        server_id: ServerId,
        message: ControllerOutbound,
        timeout: Option<Duration>,
    ) -> Result<serde_json::Value, RegistryError> {
        let transport = {
            let connections = self.connections.lock();
            connections.get(&server_id).map(|c| Arc::clone(&c.transport))
        };
        let Some(transport) = transport else {
            return Err(RegistryError::NotConnected);
        };

        let request_id = new_request_id();
        let frame = message.into_frame().with_request_id(request_id.clone());
        let rx = self.pending.insert(request_id.clone());

        transport
            .send_frame(frame)
            .await
            .map_err(|_| RegistryError::Closed)?;

        self.pending.wait(&request_id, rx, timeout).await
    }

    /// Route one inbound frame from an already-registered agent
    /// (`spec.md` §4.3 "Message dispatch").
    #[tracing::instrument(skip(self, frame))]
    pub fn dispatch_inbound(&self, server_id: ServerId, frame: &Frame) {
        if let Some(request_id) = frame.request_id() {
            if self.pending.resolve(request_id, frame.payload.clone()) {
                return;
            }
        }

        match AgentEvent::from_frame(frame) {
            Ok(event) => {
                let _ = self.events.send((server_id, event));
            }
            Err(error) => {
                tracing::warn!(%error, "dropping unroutable agent frame");
            }
        }
    }

    /// Fail every pending request for a connection that just closed
    /// (`spec.md` §4.3 "rejects on timeout ... or on socket close").
    pub fn fail_pending(&self) {
        self.pending.fail_all();
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
