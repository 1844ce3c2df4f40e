// SPDX-License-Identifier: MIT

//! Small validation helpers shared by the route handlers (`spec.md` §7
//! "Validation" class).

use bc_core::ValidationError;

use crate::error::ApiError;

pub fn non_empty_slug(name: &str) -> Result<(), ApiError> {
    if bc_core::slugify(name).is_empty() {
        return Err(ApiError::Validate(ValidationError::EmptyServerSlug));
    }
    Ok(())
}

pub fn non_empty_remote_paths(paths: &[String]) -> Result<(), ApiError> {
    if paths.is_empty() {
        return Err(ApiError::Validate(ValidationError::NoRemotePaths));
    }
    Ok(())
}
