// SPDX-License-Identifier: MIT

//! One live agent connection and the transport abstraction it is built
//! on, mirroring the teacher's `AgentAdapter` trait-object pattern
//! (`crates/daemon/src/adapters/agent/mod.rs`): registry logic is
//! written once against `dyn AgentTransport` and driven by a real
//! WebSocket sink in `bc-server` or a `FakeTransport` in tests.

use std::time::Instant;

use async_trait::async_trait;
use bc_wire::Frame;

use crate::error::RegistryError;

/// Sends frames to one connected agent. Implemented by an axum
/// WebSocket sink wrapper in `bc-server`; implemented by
/// [`crate::test_support::FakeTransport`] in tests.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    async fn send_frame(&self, frame: Frame) -> Result<(), RegistryError>;

    /// Force-close the underlying socket (`spec.md` §4.3: reconnect
    /// force-closes the prior connection).
    fn close(&self);
}

/// A registered, live agent session (`spec.md` §3 "AgentConnection").
pub struct Connection {
    pub hostname: String,
    pub version: String,
    pub connected_at: Instant,
    pub last_ping_at: Instant,
    pub(crate) transport: std::sync::Arc<dyn AgentTransport>,
}

impl Connection {
    pub fn new(hostname: String, version: String, transport: std::sync::Arc<dyn AgentTransport>) -> Self {
        let now = Instant::now();
        Self { hostname, version, connected_at: now, last_ping_at: now, transport }
    }

    pub async fn send(&self, frame: Frame) -> Result<(), RegistryError> {
        self.transport.send_frame(frame).await
    }

    pub fn close(&self) {
        self.transport.close();
    }
}
