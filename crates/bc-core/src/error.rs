// SPDX-License-Identifier: MIT

//! Validation errors shared by every crate that constructs or mutates a
//! [`crate::Server`] or [`crate::Job`] (`spec.md` §7 "Validation" class).

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("server name must produce a non-empty slug")]
    EmptyServerSlug,
    #[error("job must have at least one remote path")]
    NoRemotePaths,
    #[error("backup root is not configured")]
    BackupRootUnset,
}
