// SPDX-License-Identifier: MIT

//! Cron-driven job triggering (`spec.md` §4.7): at startup, register a
//! cron subscription for every enabled Job with a cron expression; on
//! tick, skip disabled or already-running jobs, otherwise
//! `orchestrator.start(job, full=false)`.

use std::collections::HashMap;
use std::sync::Arc;

use bc_core::JobId;
use bc_orchestrator::Orchestrator;
use parking_lot::Mutex;
use sqlx::SqlitePool;
use tokio_cron_scheduler::{Job as CronJob, JobScheduler};
use uuid::Uuid;

use crate::error::SchedulerError;

/// Wraps a `tokio-cron-scheduler` driver with a `JobId -> Uuid` map so
/// `schedule` is idempotent: calling it twice for the same job first
/// removes the prior cron subscription.
pub struct Scheduler {
    inner: JobScheduler,
    pool: SqlitePool,
    orchestrator: Orchestrator,
    cron_ids: Arc<Mutex<HashMap<JobId, Uuid>>>,
}

impl Scheduler {
    pub async fn new(pool: SqlitePool, orchestrator: Orchestrator) -> Result<Self, SchedulerError> {
        let inner = JobScheduler::new().await?;
        Ok(Self { inner, pool, orchestrator, cron_ids: Arc::new(Mutex::new(HashMap::new())) })
    }

    /// Register a cron subscription for every enabled Job carrying a
    /// cron expression. An invalid expression is logged and skipped; it
    /// never blocks startup (`spec.md` §4.7: "do not prevent startup").
    #[tracing::instrument(skip(self))]
    pub async fn load_from_storage(&self) -> Result<(), SchedulerError> {
        for job in bc_storage::jobs::list_scheduled(&self.pool).await? {
            if let Err(error) = self.schedule(job.id, job.cron.as_deref().unwrap_or_default()).await {
                tracing::error!(job_id = %job.id, %error, "failed to register cron subscription for job");
            }
        }
        Ok(())
    }

    /// Register (or replace) the cron subscription for `job_id`.
    /// Re-entrant: a second call for the same job id first removes the
    /// previous subscription before adding the new one.
    #[tracing::instrument(skip(self))]
    pub async fn schedule(&self, job_id: JobId, expression: &str) -> Result<(), SchedulerError> {
        self.unschedule(job_id).await?;

        let pool = self.pool.clone();
        let orchestrator = self.orchestrator.clone();
        let cron_job = CronJob::new_async(expression, move |_uuid, _l| {
            let pool = pool.clone();
            let orchestrator = orchestrator.clone();
            Box::pin(async move {
                tick(&pool, &orchestrator, job_id).await;
            })
        })
        .map_err(|source| SchedulerError::InvalidCron { expression: expression.to_string(), source })?;

        let uuid = self.inner.add(cron_job).await?;
        self.cron_ids.lock().insert(job_id, uuid);
        Ok(())
    }

    /// Remove the cron subscription for `job_id`, if any. A no-op if
    /// the job has no active subscription.
    #[tracing::instrument(skip(self))]
    pub async fn unschedule(&self, job_id: JobId) -> Result<(), SchedulerError> {
        let uuid = self.cron_ids.lock().remove(&job_id);
        if let Some(uuid) = uuid {
            self.inner.remove(&uuid).await?;
        }
        Ok(())
    }

    pub async fn start(&self) -> Result<(), SchedulerError> {
        self.inner.start().await?;
        Ok(())
    }

    /// Drop every cron subscription (`spec.md` §5 shutdown step 1).
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&mut self) -> Result<(), SchedulerError> {
        self.cron_ids.lock().clear();
        self.inner.shutdown().await?;
        Ok(())
    }
}

async fn tick(pool: &SqlitePool, orchestrator: &Orchestrator, job_id: JobId) {
    let job = match bc_storage::jobs::get(pool, job_id).await {
        Ok(job) => job,
        Err(error) => {
            tracing::warn!(%job_id, %error, "cron tick fired for a job that no longer exists");
            return;
        }
    };

    if !job.enabled {
        tracing::debug!(%job_id, "cron tick skipped: job disabled");
        return;
    }
    if orchestrator.is_running(job_id) {
        tracing::debug!(%job_id, "cron tick skipped: job already running");
        return;
    }

    if let Err(error) = orchestrator.start(job_id, false).await {
        tracing::error!(%job_id, %error, "cron-triggered start failed");
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
