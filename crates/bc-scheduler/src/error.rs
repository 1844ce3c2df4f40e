// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid cron expression {expression:?}: {source}")]
    InvalidCron { expression: String, source: tokio_cron_scheduler::JobSchedulerError },
    #[error(transparent)]
    Driver(#[from] tokio_cron_scheduler::JobSchedulerError),
    #[error(transparent)]
    Storage(#[from] bc_storage::StorageError),
}
