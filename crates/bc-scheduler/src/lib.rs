// SPDX-License-Identifier: MIT

//! Cron-driven job triggering over `tokio-cron-scheduler`, with
//! running-job exclusion delegated to `bc-orchestrator` (`spec.md`
//! §4.7).

mod error;
mod scheduler;

pub use error::SchedulerError;
pub use scheduler::Scheduler;
