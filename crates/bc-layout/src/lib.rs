// SPDX-License-Identifier: MIT

//! bc-layout: the storage layout manager (`spec.md` §4.5).
//!
//! Pure-ish path computation plus the filesystem side effects needed to
//! create, promote, browse, and prune version directories. Holds no
//! state of its own; every function takes the paths/ids it needs.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod browse;
pub mod error;
pub mod path;
pub mod retention;
pub mod version_dir;

pub use browse::resolve_within;
pub use error::LayoutError;
pub use path::allocate_job_path;
pub use retention::prune_version_dir;
pub use version_dir::{
    create_version_dir, promote_current, version_dir, versions_dir, write_backup_meta,
    write_version_meta,
};
