// SPDX-License-Identifier: MIT

//! `Orchestrator`: `start`/`cancel` plus the per-job spawned task driving
//! the state machine in `spec.md` §4.6.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bc_core::{format_version_timestamp, Job, JobId, JobStatus, ServerId};
use bc_eventbus::EventBus;
use bc_registry::Registry;
use bc_wire::{AgentEvent, ControllerOutbound, UiEvent};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::OrchestratorError;
use crate::progress::{current_file_or_placeholder, format_speed, ProgressThrottle};
use crate::running::{RunningJobs, StopReason, StopSignal};
use crate::semaphores::Semaphores;

/// Wall-clock cap on one run (`spec.md` §4.6: "1-hour wall-clock since
/// acquire").
pub const JOB_TIME_LIMIT: Duration = Duration::from_secs(60 * 60);

/// How often the job task polls the wall-clock cap.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone)]
pub struct Orchestrator {
    pool: SqlitePool,
    registry: Arc<Registry>,
    events: EventBus,
    semaphores: Arc<Semaphores>,
    running: Arc<RunningJobs>,
}

impl Orchestrator {
    pub fn new(pool: SqlitePool, registry: Arc<Registry>, events: EventBus, semaphores: Semaphores) -> Self {
        Self { pool, registry, events, semaphores: Arc::new(semaphores), running: Arc::new(RunningJobs::new()) }
    }

    pub fn is_running(&self, job_id: JobId) -> bool {
        self.running.is_running(job_id)
    }

    /// `start(job, full)` (`spec.md` §4.6). Re-entrant: a no-op if the
    /// job is already running.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self, job_id: JobId, full: bool) -> Result<(), OrchestratorError> {
        let job = bc_storage::jobs::get(&self.pool, job_id).await?;

        let Some(signal) = self.running.try_start(job_id, job.server_id) else {
            tracing::info!("job already running, start is a no-op");
            return Ok(());
        };

        let task = JobTask {
            pool: self.pool.clone(),
            registry: Arc::clone(&self.registry),
            events: self.events.clone(),
            semaphores: Arc::clone(&self.semaphores),
            running: Arc::clone(&self.running),
            job,
            full,
            signal,
        };
        tokio::spawn(task.run());
        Ok(())
    }

    /// `cancel(job_id)` (`spec.md` §4.6). Fire-and-forget to the agent;
    /// does not wait for acknowledgment.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, job_id: JobId) -> Result<(), OrchestratorError> {
        if !self.running.trigger_stop(job_id, StopReason::Cancelled) {
            return Err(OrchestratorError::NotRunning);
        }
        Ok(())
    }

    /// Seal every job running against `server_id` as failed with a
    /// synthetic "agent disconnected" error. Called by `bc-server`'s
    /// websocket-close handler, not by the registry itself (`spec.md`
    /// §4.6: "agent socket drops -> failed").
    #[tracing::instrument(skip(self))]
    pub fn handle_agent_disconnected(&self, server_id: ServerId) {
        for job_id in self.running.running_for_server(server_id) {
            self.running.trigger_stop(job_id, StopReason::AgentDisconnected);
        }
    }

    /// Stop every running job, for graceful shutdown (`spec.md` §5,
    /// §4.10). Runs are sealed as cancelled.
    pub fn cancel_all_running(&self) {
        self.running.stop_all(StopReason::Cancelled);
    }
}

enum Terminal {
    Completed { total_bytes: u64, files_transferred: u64 },
    Failed { error: String },
    Cancelled,
}

struct JobTask {
    pool: SqlitePool,
    registry: Arc<Registry>,
    events: EventBus,
    semaphores: Arc<Semaphores>,
    running: Arc<RunningJobs>,
    job: Job,
    full: bool,
    signal: StopSignal,
}

impl JobTask {
    #[tracing::instrument(skip(self), fields(job_id = %self.job.id, server_id = %self.job.server_id))]
    async fn run(self) {
        let job_id = self.job.id;
        if let Err(error) = self.run_inner().await {
            tracing::error!(%error, "job task failed before reaching the terminal state machine");
        }
        self.running.finish(job_id);
    }

    async fn run_inner(&self) -> Result<(), OrchestratorError> {
        let server = bc_storage::servers::get(&self.pool, self.job.server_id).await?;

        let _permits = self.semaphores.acquire(self.job.server_id, self.job.remote_paths.len()).await;

        let link_dest = if self.full {
            None
        } else {
            bc_storage::versions::find_latest_completed_version(&self.pool, self.job.id)
                .await?
                .map(|version| version.local_path)
        };

        let log = bc_storage::logs::start(&self.pool, self.job.id).await?;
        let now = Utc::now();
        let timestamp = format_version_timestamp(now);
        let job_path = PathBuf::from(&self.job.local_path);

        bc_layout::create_version_dir(&job_path, &timestamp)?;
        bc_layout::write_backup_meta(
            &job_path,
            &server.name,
            &server.hostname,
            server.port,
            &self.job.id.to_string(),
            &self.job.name,
            &self.job.remote_paths,
            self.job.created_at,
            self.job.last_run_at,
        )?;

        let version =
            bc_storage::versions::create(&self.pool, self.job.id, log.id, &version_path_string(&job_path, &timestamp))
                .await?;
        bc_storage::jobs::set_status(&self.pool, self.job.id, JobStatus::Running).await?;

        self.events.publish(UiEvent::BackupStarted { job_id: self.job.id });
        self.events.publish(UiEvent::JobUpdated { job_id: self.job.id });
        self.events.publish(UiEvent::BackupProgress {
            job_id: self.job.id,
            percent: 0,
            current_file: Some(current_file_or_placeholder(None)),
            speed: None,
        });

        let sent = self
            .registry
            .send(
                self.job.server_id,
                ControllerOutbound::BackupStart {
                    job_id: self.job.id,
                    paths: self.job.remote_paths.clone(),
                    link_dest,
                },
            )
            .await;

        let terminal = if !sent {
            Terminal::Failed { error: "agent disconnected during backup".to_string() }
        } else {
            self.drive_to_terminal().await
        };

        self.seal(log.id, version.id, terminal).await
    }

    async fn drive_to_terminal(&self) -> Terminal {
        let mut agent_events = self.registry.subscribe();
        let mut ticks = tokio::time::interval(TICK_INTERVAL);
        let deadline = tokio::time::Instant::now() + JOB_TIME_LIMIT;
        let mut throttle = ProgressThrottle::new(bc_core::SystemClock);
        let mut last_bytes = 0u64;
        let mut last_sample_at = tokio::time::Instant::now();

        loop {
            tokio::select! {
                biased;

                _ = self.signal.cancelled() => {
                    match self.signal.reason() {
                        StopReason::Cancelled => {
                            let _ = self
                                .registry
                                .send(self.job.server_id, ControllerOutbound::BackupCancel { job_id: self.job.id })
                                .await;
                            return Terminal::Cancelled;
                        }
                        StopReason::AgentDisconnected => {
                            return Terminal::Failed { error: "agent disconnected during backup".to_string() };
                        }
                    }
                }

                _ = ticks.tick() => {
                    if tokio::time::Instant::now() >= deadline {
                        return Terminal::Failed { error: "timed out".to_string() };
                    }
                }

                event = agent_events.recv() => {
                    match event {
                        Ok((server_id, event)) if server_id == self.job.server_id => {
                            if let Some(terminal) = self.handle_agent_event(event, &mut throttle, &mut last_bytes, &mut last_sample_at) {
                                return terminal;
                            }
                        }
                        Ok(_) => {}
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "orchestrator missed agent events under broadcast backpressure");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            return Terminal::Failed { error: "agent disconnected during backup".to_string() };
                        }
                    }
                }
            }
        }
    }

    fn handle_agent_event(
        &self,
        event: AgentEvent,
        throttle: &mut ProgressThrottle<bc_core::SystemClock>,
        last_bytes: &mut u64,
        last_sample_at: &mut tokio::time::Instant,
    ) -> Option<Terminal> {
        match event {
            AgentEvent::BackupProgress { job_id, percent, current_file, bytes_transferred } if job_id == self.job.id => {
                let Some(percent) = throttle.admit(f64::from(percent)) else { return None };

                let now = tokio::time::Instant::now();
                let elapsed = now.saturating_duration_since(*last_sample_at).as_secs_f64();
                let speed = if elapsed > 0.0 && bytes_transferred >= *last_bytes {
                    Some(format_speed((bytes_transferred - *last_bytes) as f64 / elapsed))
                } else {
                    None
                };
                *last_bytes = bytes_transferred;
                *last_sample_at = now;

                self.events.publish(UiEvent::BackupProgress {
                    job_id: self.job.id,
                    percent,
                    current_file: Some(current_file_or_placeholder(current_file.as_deref())),
                    speed,
                });
                None
            }
            AgentEvent::BackupCompleted { job_id, total_bytes, files_transferred } if job_id == self.job.id => {
                Some(Terminal::Completed { total_bytes, files_transferred })
            }
            AgentEvent::BackupFailed { job_id, error } if job_id == self.job.id => {
                Some(Terminal::Failed { error })
            }
            _ => None,
        }
    }

    async fn seal(&self, log_id: bc_core::LogId, version_id: bc_core::VersionId, terminal: Terminal) -> Result<(), OrchestratorError> {
        let job_path = PathBuf::from(&self.job.local_path);

        match terminal {
            Terminal::Completed { total_bytes, files_transferred } => {
                let version =
                    bc_storage::versions::update_version_on_completion(&self.pool, version_id, total_bytes, files_transferred)
                        .await?;
                bc_storage::logs::finish(&self.pool, log_id, JobStatus::Completed, total_bytes, files_transferred, "", None)
                    .await?;
                bc_storage::jobs::set_status(&self.pool, self.job.id, JobStatus::Completed).await?;
                bc_layout::promote_current(&job_path, &version.timestamp)?;
                bc_layout::write_version_meta(
                    &job_path,
                    &version.timestamp,
                    &version.id.to_string(),
                    total_bytes,
                    files_transferred,
                    "completed",
                )?;
                self.prune_retention().await?;

                self.events.publish(UiEvent::BackupCompleted { job_id: self.job.id, version_id });
                self.events.publish(UiEvent::JobUpdated { job_id: self.job.id });
                self.events.publish(UiEvent::BackupProgress {
                    job_id: self.job.id,
                    percent: 100,
                    current_file: Some(current_file_or_placeholder(None)),
                    speed: None,
                });
            }
            Terminal::Failed { error } => {
                bc_storage::versions::mark_failed(&self.pool, version_id).await?;
                bc_storage::logs::finish(&self.pool, log_id, JobStatus::Failed, 0, 0, "", Some(&error)).await?;
                bc_storage::jobs::set_status(&self.pool, self.job.id, JobStatus::Failed).await?;

                self.events.publish(UiEvent::BackupFailed { job_id: self.job.id, error });
                self.events.publish(UiEvent::JobUpdated { job_id: self.job.id });
            }
            Terminal::Cancelled => {
                bc_storage::versions::mark_failed(&self.pool, version_id).await?;
                bc_storage::logs::finish(&self.pool, log_id, JobStatus::Cancelled, 0, 0, "", Some("cancelled by user"))
                    .await?;
                bc_storage::jobs::set_status(&self.pool, self.job.id, JobStatus::Cancelled).await?;

                self.events.publish(UiEvent::BackupFailed {
                    job_id: self.job.id,
                    error: "cancelled by user".to_string(),
                });
                self.events.publish(UiEvent::JobUpdated { job_id: self.job.id });
            }
        }
        Ok(())
    }

    /// Delete version rows (and their directories) beyond
    /// `job.retention_count`, oldest first (`spec.md` §4.5).
    async fn prune_retention(&self) -> Result<(), OrchestratorError> {
        let versions = bc_storage::versions::list_for_job(&self.pool, self.job.id).await?;
        let keep = self.job.retention_count as usize;
        if versions.len() <= keep {
            return Ok(());
        }

        for version in &versions[keep..] {
            bc_storage::versions::delete(&self.pool, version.id).await?;
            bc_layout::prune_version_dir(&PathBuf::from(&version.local_path));
        }
        Ok(())
    }
}

fn version_path_string(job_path: &std::path::Path, timestamp: &str) -> String {
    bc_layout::version_dir(job_path, timestamp).to_string_lossy().into_owned()
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
