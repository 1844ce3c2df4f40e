// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Fan-out to UI sockets is fire-and-forget, so this is unreachable on
/// any ordinary path; it exists so `publish` has somewhere to report a
/// malformed payload instead of silently dropping it.
#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("failed to encode event payload: {0}")]
    Encode(#[from] serde_json::Error),
}
