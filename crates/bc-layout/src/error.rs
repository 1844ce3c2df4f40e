// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("requested path escapes the version root")]
    PathEscape,
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Defensive: every numeric suffix up to an absurd bound was taken.
    #[error("could not allocate a unique slug for {0:?}")]
    SlugCollision(String),
}
