// SPDX-License-Identifier: MIT

//! Retention pruning: best-effort, asynchronous filesystem delete after
//! the row delete has already happened (`spec.md` §4.5).
//!
//! The row-ownership decision (which versions are beyond
//! `retention_count`) belongs to `bc-orchestrator`/`bc-storage`; this
//! module only removes directories it is told to remove, logging
//! failures instead of propagating them (`spec.md` §7: "best-effort ...
//! logged, not surfaced, not retried").

use std::path::Path;

pub fn prune_version_dir(path: &Path) {
    if let Err(error) = std::fs::remove_dir_all(path) {
        if error.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), %error, "failed to delete pruned version directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn removes_existing_directory() {
        let dir = TempDir::new().expect("tempdir");
        let target = dir.path().join("versions").join("2026-01-01_00-00-00");
        std::fs::create_dir_all(&target).expect("create");
        prune_version_dir(&target);
        assert!(!target.exists());
    }

    #[test]
    fn missing_directory_does_not_panic() {
        let dir = TempDir::new().expect("tempdir");
        prune_version_dir(&dir.path().join("never-existed"));
    }
}
