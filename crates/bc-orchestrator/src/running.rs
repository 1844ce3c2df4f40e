// SPDX-License-Identifier: MIT

//! The in-memory set of running job ids (`spec.md` §4.6: "Tracks the
//! set of running job ids in memory"). Backs the re-entrant `start`
//! guard and gives `cancel`/shutdown a handle to signal the job task.

use std::collections::HashMap;
use std::sync::Arc;

use bc_core::{JobId, ServerId};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Why a job task's `select!` loop was woken externally. `cancel(job_id)`
/// and an agent socket drop both stop the task through the same
/// [`CancellationToken`], but seal the run differently (`spec.md` §4.6:
/// "cancel" -> `cancelled`, "agent socket drops" -> `failed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    AgentDisconnected,
}

/// The signal a running job task watches: a token to wake its `select!`
/// loop, and the reason set immediately before it is cancelled.
#[derive(Clone)]
pub struct StopSignal {
    cancel: CancellationToken,
    reason: Arc<Mutex<Option<StopReason>>>,
}

impl StopSignal {
    fn new() -> Self {
        Self { cancel: CancellationToken::new(), reason: Arc::new(Mutex::new(None)) }
    }

    fn trigger(&self, reason: StopReason) {
        *self.reason.lock() = Some(reason);
        self.cancel.cancel();
    }

    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    /// The reason the signal was triggered. Only meaningful after
    /// [`StopSignal::cancelled`] resolves.
    pub fn reason(&self) -> StopReason {
        self.reason.lock().unwrap_or(StopReason::Cancelled)
    }
}

struct RunningJob {
    server_id: ServerId,
    signal: StopSignal,
}

#[derive(Default)]
pub struct RunningJobs {
    inner: Mutex<HashMap<JobId, RunningJob>>,
}

impl RunningJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `job_id` as running, returning the [`StopSignal`] the
    /// spawned job task should watch. Returns `None` if the job id is
    /// already running — the re-entrant no-op case (`spec.md` §4.6:
    /// "absorb scheduler races").
    pub fn try_start(&self, job_id: JobId, server_id: ServerId) -> Option<StopSignal> {
        let mut jobs = self.inner.lock();
        if jobs.contains_key(&job_id) {
            return None;
        }
        let signal = StopSignal::new();
        jobs.insert(job_id, RunningJob { server_id, signal: signal.clone() });
        Some(signal)
    }

    pub fn finish(&self, job_id: JobId) {
        self.inner.lock().remove(&job_id);
    }

    pub fn is_running(&self, job_id: JobId) -> bool {
        self.inner.lock().contains_key(&job_id)
    }

    /// Trigger the stop signal for a running job, for `cancel(job_id)`
    /// and `handle_agent_disconnected`. Returns `false` if the job isn't
    /// running.
    pub fn trigger_stop(&self, job_id: JobId, reason: StopReason) -> bool {
        match self.inner.lock().get(&job_id) {
            Some(running) => {
                running.signal.trigger(reason);
                true
            }
            None => false,
        }
    }

    /// Every job currently running against `server_id`, for
    /// `handle_agent_disconnected`.
    pub fn running_for_server(&self, server_id: ServerId) -> Vec<JobId> {
        self.inner
            .lock()
            .iter()
            .filter(|(_, running)| running.server_id == server_id)
            .map(|(job_id, _)| *job_id)
            .collect()
    }

    /// Trigger every running job's stop signal, for graceful shutdown
    /// (`spec.md` §5, §4.10: "cancel every running job").
    pub fn stop_all(&self, reason: StopReason) {
        for running in self.inner.lock().values() {
            running.signal.trigger(reason);
        }
    }
}
