// SPDX-License-Identifier: MIT

//! Controller-wide key-value settings (`spec.md` §3). The only required
//! key is `backup_root`.

/// Key under which the configured storage root is stored.
pub const BACKUP_ROOT_KEY: &str = "backup_root";
