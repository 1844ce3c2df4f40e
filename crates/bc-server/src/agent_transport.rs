// SPDX-License-Identifier: MIT

//! The real `AgentTransport` used outside tests: a handle onto an
//! agent WebSocket connection's outbound channel, plus a cancellation
//! token the connection's read/write loops select on so `close()` can
//! force the socket down from outside the connection task (needed when
//! [`bc_registry::Registry::register`] replaces a stale connection).

use async_trait::async_trait;
use bc_registry::{AgentTransport, RegistryError};
use bc_wire::Frame;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct WsAgentTransport {
    tx: mpsc::UnboundedSender<Frame>,
    cancel: CancellationToken,
}

impl WsAgentTransport {
    pub fn new(tx: mpsc::UnboundedSender<Frame>, cancel: CancellationToken) -> Self {
        Self { tx, cancel }
    }
}

#[async_trait]
impl AgentTransport for WsAgentTransport {
    async fn send_frame(&self, frame: Frame) -> Result<(), RegistryError> {
        self.tx.send(frame).map_err(|_| RegistryError::Closed)
    }

    fn close(&self) {
        self.cancel.cancel();
    }
}
