// SPDX-License-Identifier: MIT

//! Agent connection registry: who is connected, correlated request/reply
//! plumbing, and event fan-out (`spec.md` §4.3).

mod connection;
mod dispatch;
mod error;
mod pending;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use connection::{AgentTransport, Connection};
pub use dispatch::Registry;
pub use error::RegistryError;
