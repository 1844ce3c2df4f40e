// SPDX-License-Identifier: MIT

//! bc-core: shared data model for the backup controller.
//!
//! Every other crate in the workspace depends on this one for entity
//! types, opaque ids, and the slug/clock helpers that both the storage
//! layer and the storage-layout manager need to agree on.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod clock;
pub mod error;
pub mod id;
pub mod job;
pub mod log;
pub mod server;
pub mod setting;
pub mod slug;
pub mod version;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::ValidationError;
pub use id::{new_request_id, parse_request_id, JobId, LogId, ServerId, VersionId};
pub use job::{
    decode_remote_paths, encode_remote_paths, Job, JobStatus, JobUpdate, NewJob,
    DEFAULT_RETENTION_COUNT,
};
pub use log::Log;
pub use server::{AgentState, NewServer, Server, ServerUpdate};
pub use setting::BACKUP_ROOT_KEY;
pub use slug::{next_candidate, slugify};
pub use version::{format_version_timestamp, Version, VersionStatus};
