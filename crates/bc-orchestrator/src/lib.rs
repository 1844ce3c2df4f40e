// SPDX-License-Identifier: MIT

//! Backup orchestrator: `start`/`cancel`, the three-tier semaphore
//! concurrency model, progress aggregation, and the per-job state
//! machine (`spec.md` §4.6).

mod error;
mod orchestrator;
mod progress;
mod running;
mod semaphores;

pub use error::OrchestratorError;
pub use orchestrator::{Orchestrator, JOB_TIME_LIMIT};
pub use progress::{clamp_monotonic_percent, current_file_or_placeholder, format_speed, PROGRESS_THROTTLE};
pub use semaphores::{Semaphores, DEFAULT_MAX_CONCURRENT_GLOBAL, DEFAULT_MAX_CONCURRENT_PER_SERVER};
