// SPDX-License-Identifier: MIT

//! `EventBus`: fan-out of [`UiEvent`] to every connected UI socket, plus
//! the per-job replay buffer (`spec.md` §4.2).

use std::sync::Arc;

use bc_core::{Clock, SystemClock};
use bc_wire::{Frame, ReplayRequest, UiEvent};
use parking_lot::Mutex;

use crate::connection::UiConnection;
use crate::error::EventBusError;
use crate::replay::ReplayBuffers;

/// Shared event bus handle. Cheap to clone; every clone shares the same
/// connection list and replay buffers (teacher's `Arc<Mutex<...>>`
/// shared-state convention, `ListenCtx.state`).
#[derive(Clone)]
pub struct EventBus<C: Clock = SystemClock> {
    connections: Arc<Mutex<Vec<UiConnection>>>,
    replay: Arc<Mutex<ReplayBuffers>>,
    clock: C,
}

impl EventBus<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for EventBus<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> EventBus<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { connections: Arc::new(Mutex::new(Vec::new())), replay: Arc::new(Mutex::new(ReplayBuffers::new())), clock }
    }

    /// Register a newly connected UI socket.
    pub fn connect(&self) -> (UiConnection, tokio::sync::mpsc::UnboundedReceiver<Frame>) {
        let (connection, rx) = UiConnection::channel();
        self.connections.lock().push(connection.clone());
        (connection, rx)
    }

    /// Broadcast one event to every connected UI socket, and append it
    /// to the per-job replay buffer when eligible (`spec.md` §4.2).
    #[tracing::instrument(skip(self, event))]
    pub fn publish(&self, event: UiEvent) {
        let is_replayable = event.is_replayable();
        let job_id = event.job_id();
        let is_terminal = matches!(event, UiEvent::BackupCompleted { .. } | UiEvent::BackupFailed { .. });
        let emitted_at = self.clock.epoch_ms();
        let frame = event.into_frame();

        if let Err(error) = serde_json::to_string(&frame.payload).map_err(EventBusError::from) {
            tracing::warn!(%error, message_type = %frame.message_type, "dropping unencodable event payload");
            return;
        }

        if is_replayable {
            if let Some(job_id) = job_id {
                self.replay.lock().append(job_id, frame.clone(), emitted_at, is_terminal);
            }
        }

        self.broadcast(frame);
    }

    fn broadcast(&self, frame: Frame) {
        let mut connections = self.connections.lock();
        connections.retain(|connection| connection.send(frame.clone()));
    }

    /// Answer a `replay:request` from a reconnecting UI client
    /// (`spec.md` §4.2, §6).
    pub fn replay(&self, request: &ReplayRequest) -> Vec<Frame> {
        self.replay.lock().replay(request.job_id, request.since)
    }

    /// Drop replay buffers whose job finished more than 5 minutes ago.
    /// Intended to be driven by a periodic task in `bc-server`.
    pub fn sweep_expired_replays(&self) {
        self.replay.lock().sweep_expired(self.clock.epoch_ms());
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn buffered_job_count(&self) -> usize {
        self.replay.lock().job_count()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
