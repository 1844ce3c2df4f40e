// SPDX-License-Identifier: MIT

//! Per-job base path allocation (`spec.md` §4.5):
//! `backup_root/<slug(server.name)>/<slug(job.name)>`, collisions
//! resolved by appending `-2`, `-3`, ... until unique across all jobs.

use std::path::{Path, PathBuf};

use bc_core::slugify;

use crate::error::LayoutError;

/// Defensive bound on the `-N` collision search (`SPEC_FULL.md` §4.5:
/// `LayoutError::SlugCollision` "exists for the pathological case where
/// -2..-1000 are all taken").
const MAX_SLUG_ATTEMPTS: u32 = 1000;

/// Compute the local base path for a new job, given the already-slugged
/// server directory and a predicate for "is this job-relative path
/// already taken by another job".
pub fn allocate_job_path(
    backup_root: &Path,
    server_name: &str,
    job_name: &str,
    mut is_taken: impl FnMut(&str) -> bool,
) -> Result<PathBuf, LayoutError> {
    let server_slug = slugify(server_name);
    let job_slug = slugify(job_name);

    let mut candidate = job_slug.clone();
    for attempt in 0..MAX_SLUG_ATTEMPTS {
        let relative = format!("{server_slug}/{candidate}");
        if !is_taken(&relative) {
            return Ok(backup_root.join(server_slug).join(candidate));
        }
        candidate = format!("{job_slug}-{}", attempt + 2);
    }
    Err(LayoutError::SlugCollision(job_slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_under_server_and_job_slugs() {
        let path = allocate_job_path(Path::new("/srv/backups"), "web-01", "Daily", |_| false)
            .expect("allocate");
        assert_eq!(path, Path::new("/srv/backups/web-01/daily"));
    }

    #[test]
    fn collision_appends_numeric_suffix() {
        let mut calls = Vec::new();
        let path = allocate_job_path(Path::new("/srv/backups"), "web-01", "Daily", |candidate| {
            calls.push(candidate.to_string());
            candidate == "web-01/daily"
        })
        .expect("allocate");
        assert_eq!(path, Path::new("/srv/backups/web-01/daily-2"));
    }

    #[test]
    fn exhausting_attempts_reports_slug_collision() {
        let result = allocate_job_path(Path::new("/srv/backups"), "web-01", "Daily", |_| true);
        assert!(matches!(result, Err(LayoutError::SlugCollision(_))));
    }
}
