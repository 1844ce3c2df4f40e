// SPDX-License-Identifier: MIT

//! UI event bus: WebSocket fan-out and the per-job replay ring buffer
//! (`spec.md` §4.2).

mod bus;
mod connection;
mod error;
mod replay;

pub use bus::EventBus;
pub use connection::UiConnection;
pub use error::EventBusError;
pub use replay::{BufferedEvent, ReplayBuffers, REPLAY_CAPACITY, REPLAY_TTL_MS};
