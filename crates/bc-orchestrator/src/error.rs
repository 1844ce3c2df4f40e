// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("job is not running")]
    NotRunning,
    #[error("server has no connected agent")]
    AgentNotConnected,
    #[error(transparent)]
    Storage(#[from] bc_storage::StorageError),
    #[error(transparent)]
    Layout(#[from] bc_layout::LayoutError),
}
