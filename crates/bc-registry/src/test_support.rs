// SPDX-License-Identifier: MIT

//! Fake agent transport for tests, mirroring the teacher's
//! `FakeAgentAdapter` (`crates/daemon/src/adapters/agent/mod.rs`):
//! captures every frame sent to it instead of touching a real socket.

use async_trait::async_trait;
use bc_wire::Frame;
use parking_lot::Mutex;

use crate::connection::AgentTransport;
use crate::error::RegistryError;

#[derive(Default)]
pub struct FakeTransport {
    sent: Mutex<Vec<Frame>>,
    closed: Mutex<bool>,
    fail_sends: Mutex<bool>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `send_frame` call fail, simulating a dead
    /// socket.
    pub fn fail_sends(&self) {
        *self.fail_sends.lock() = true;
    }

    pub fn sent_frames(&self) -> Vec<Frame> {
        self.sent.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }
}

#[async_trait]
impl AgentTransport for FakeTransport {
    async fn send_frame(&self, frame: Frame) -> Result<(), RegistryError> {
        if *self.fail_sends.lock() {
            return Err(RegistryError::Transport("fake transport send failure".into()));
        }
        self.sent.lock().push(frame);
        Ok(())
    }

    fn close(&self) {
        *self.closed.lock() = true;
    }
}
