// SPDX-License-Identifier: MIT

//! One connected UI WebSocket, represented as an outbound frame sender.
//!
//! Mirrors the teacher's module-scoped `Arc<Mutex<...>>` connection-set
//! convention (`ListenCtx.state`/`event_bus.rs`): the bus never touches a
//! socket directly, only an `mpsc::UnboundedSender<Frame>` that the axum
//! handler in `bc-server` reads from and forwards onto the wire.

use bc_wire::Frame;
use tokio::sync::mpsc;

/// A connected UI client's outbound queue. Cloning is cheap and several
/// owners (the event bus's connection list, and whatever spawned the
/// socket's write task) may hold a copy.
#[derive(Clone)]
pub struct UiConnection {
    tx: mpsc::UnboundedSender<Frame>,
}

impl UiConnection {
    /// Create a connection paired with the receiver the caller's
    /// WebSocket write loop should drain.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// `true` if the frame was queued. `false` means the receiving end
    /// (the socket's write task) is gone and this connection should be
    /// dropped from the bus's connection list.
    pub fn send(&self, frame: Frame) -> bool {
        self.tx.send(frame).is_ok()
    }
}
