// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no agent connected for this server")]
    NotConnected,
    #[error("server id is unknown")]
    UnknownServer,
    #[error("request timed out waiting for agent response")]
    Timeout,
    #[error("agent socket closed before responding")]
    Closed,
    #[error("transport error: {0}")]
    Transport(String),
}
