// SPDX-License-Identifier: MIT

//! The three layered semaphores from `spec.md` §4.6 "Concurrency model":
//! a single-permit job semaphore (at most one job runs controller-wide),
//! a global upload-slot semaphore, and one upload-slot semaphore per
//! server, created lazily. Acquisition order is job → global → per-server,
//! per remote path; release is the exact reverse (`OwnedSemaphorePermit`'s
//! `Drop` order, since permits are dropped in reverse field order when a
//! [`JobPermits`] is dropped).

use std::collections::HashMap;
use std::sync::Arc;

use bc_core::ServerId;
use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub const DEFAULT_MAX_CONCURRENT_GLOBAL: usize = 8;
pub const DEFAULT_MAX_CONCURRENT_PER_SERVER: usize = 4;

pub struct Semaphores {
    job: Arc<Semaphore>,
    global: Arc<Semaphore>,
    per_server: Mutex<HashMap<ServerId, Arc<Semaphore>>>,
    max_concurrent_per_server: usize,
}

/// Permits held for the duration of one job run. Dropping this releases
/// the per-server permits, then the global permits, then the job permit
/// — the reverse of acquisition order.
pub struct JobPermits {
    _remote_path_permits: Vec<(OwnedSemaphorePermit, OwnedSemaphorePermit)>,
    _job_permit: OwnedSemaphorePermit,
}

impl Semaphores {
    pub fn new(max_concurrent_global: usize, max_concurrent_per_server: usize) -> Self {
        Self {
            job: Arc::new(Semaphore::new(1)),
            global: Arc::new(Semaphore::new(max_concurrent_global)),
            per_server: Mutex::new(HashMap::new()),
            max_concurrent_per_server,
        }
    }

    fn server_semaphore(&self, server_id: ServerId) -> Arc<Semaphore> {
        self.per_server
            .lock()
            .entry(server_id)
            .or_insert_with(|| Arc::new(Semaphore::new(self.max_concurrent_per_server)))
            .clone()
    }

    /// Acquire the job permit, then one global + one per-server permit
    /// for each remote path in the job (`spec.md` §4.6: "job-semaphore →
    /// (per remote path) global-semaphore → per-server-semaphore").
    pub async fn acquire(&self, server_id: ServerId, remote_path_count: usize) -> JobPermits {
        let job_permit = Arc::clone(&self.job).acquire_owned().await.expect("job semaphore never closes");

        let server_semaphore = self.server_semaphore(server_id);
        let mut remote_path_permits = Vec::with_capacity(remote_path_count);
        for _ in 0..remote_path_count {
            let global_permit =
                Arc::clone(&self.global).acquire_owned().await.expect("global semaphore never closes");
            let server_permit = Arc::clone(&server_semaphore)
                .acquire_owned()
                .await
                .expect("per-server semaphore never closes");
            remote_path_permits.push((global_permit, server_permit));
        }

        JobPermits { _remote_path_permits: remote_path_permits, _job_permit: job_permit }
    }
}

impl Default for Semaphores {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_GLOBAL, DEFAULT_MAX_CONCURRENT_PER_SERVER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bc_core::ServerId;

    #[tokio::test]
    async fn a_second_job_waits_for_the_single_job_permit() {
        let semaphores = Arc::new(Semaphores::new(8, 4));
        let server_id = ServerId::new();

        let first = semaphores.acquire(server_id, 1).await;
        assert_eq!(semaphores.job.available_permits(), 0);

        drop(first);
        assert_eq!(semaphores.job.available_permits(), 1);
    }

    #[tokio::test]
    async fn each_remote_path_consumes_one_global_and_one_server_permit() {
        let semaphores = Semaphores::new(8, 4);
        let server_id = ServerId::new();

        let permits = semaphores.acquire(server_id, 3).await;
        assert_eq!(semaphores.global.available_permits(), 5);
        assert_eq!(semaphores.server_semaphore(server_id).available_permits(), 1);

        drop(permits);
        assert_eq!(semaphores.global.available_permits(), 8);
        assert_eq!(semaphores.server_semaphore(server_id).available_permits(), 4);
    }

    #[tokio::test]
    async fn distinct_servers_get_independent_per_server_semaphores() {
        let semaphores = Semaphores::new(8, 4);
        let server_a = ServerId::new();
        let server_b = ServerId::new();

        let _permits = semaphores.acquire(server_a, 4).await;
        assert_eq!(semaphores.server_semaphore(server_a).available_permits(), 0);
        assert_eq!(semaphores.server_semaphore(server_b).available_permits(), 4);
    }
}
