// SPDX-License-Identifier: MIT

//! Per-job replay ring buffer (`spec.md` §4.2): events whose type starts
//! with `backup:` and carry a job id are appended here so a UI client
//! that reconnects mid-run can catch up with `replay:request`.

use std::collections::{HashMap, VecDeque};

use bc_core::JobId;
use bc_wire::Frame;

/// Ring buffer capacity per job (`spec.md` §4.2).
pub const REPLAY_CAPACITY: usize = 100;

/// How long after a job's terminal event its buffer stays around
/// (`spec.md` §4.2).
pub const REPLAY_TTL_MS: u64 = 5 * 60 * 1000;

#[derive(Debug, Clone)]
pub struct BufferedEvent {
    pub frame: Frame,
    pub emitted_at: u64,
}

struct JobBuffer {
    events: VecDeque<BufferedEvent>,
    /// `epoch_ms` of the terminal event (`backup:completed`/`backup:failed`),
    /// once one has been appended.
    terminal_at: Option<u64>,
}

impl JobBuffer {
    fn new() -> Self {
        Self { events: VecDeque::with_capacity(REPLAY_CAPACITY), terminal_at: None }
    }
}

/// Per-job ring buffer map. Not internally synchronized: `bc-eventbus`'s
/// `EventBus` wraps one instance in a `parking_lot::Mutex`, matching the
/// teacher's "one mutex per piece of shared state" discipline.
#[derive(Default)]
pub struct ReplayBuffers {
    jobs: HashMap<JobId, JobBuffer>,
}

impl ReplayBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, evicting the oldest once the ring is full.
    /// `is_terminal` marks `backup:completed`/`backup:failed`, which
    /// starts this job's 5-minute eviction countdown.
    pub fn append(&mut self, job_id: JobId, frame: Frame, emitted_at: u64, is_terminal: bool) {
        let buffer = self.jobs.entry(job_id).or_insert_with(JobBuffer::new);
        if buffer.events.len() == REPLAY_CAPACITY {
            buffer.events.pop_front();
        }
        buffer.events.push_back(BufferedEvent { frame, emitted_at });
        if is_terminal {
            buffer.terminal_at = Some(emitted_at);
        }
    }

    /// Buffered events for `job_id` with `emitted_at > since`, in order
    /// (`spec.md` §4.2 "replay:request").
    pub fn replay(&self, job_id: JobId, since: i64) -> Vec<Frame> {
        let Some(buffer) = self.jobs.get(&job_id) else {
            return Vec::new();
        };
        buffer
            .events
            .iter()
            .filter(|event| event.emitted_at as i64 > since)
            .map(|event| event.frame.clone())
            .collect()
    }

    /// Drop every job buffer whose terminal event is more than
    /// [`REPLAY_TTL_MS`] old as of `now_ms`.
    pub fn sweep_expired(&mut self, now_ms: u64) {
        self.jobs.retain(|_, buffer| match buffer.terminal_at {
            Some(terminal_at) => now_ms.saturating_sub(terminal_at) < REPLAY_TTL_MS,
            None => true,
        });
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_at(n: u64) -> Frame {
        Frame::new("backup:progress", serde_json::json!({"n": n}))
    }

    #[test]
    fn replay_returns_events_after_since() {
        let mut buffers = ReplayBuffers::new();
        let job_id = JobId::new();
        buffers.append(job_id, frame_at(1), 10, false);
        buffers.append(job_id, frame_at(2), 20, false);
        buffers.append(job_id, frame_at(3), 30, false);

        let replayed = buffers.replay(job_id, 15);
        assert_eq!(replayed.len(), 2);
        assert_eq!(replayed[0].payload["n"], 2);
        assert_eq!(replayed[1].payload["n"], 3);
    }

    #[test]
    fn replay_twice_yields_the_same_events() {
        let mut buffers = ReplayBuffers::new();
        let job_id = JobId::new();
        buffers.append(job_id, frame_at(1), 10, false);

        assert_eq!(buffers.replay(job_id, 0).len(), buffers.replay(job_id, 0).len());
    }

    #[test]
    fn ring_evicts_oldest_beyond_capacity() {
        let mut buffers = ReplayBuffers::new();
        let job_id = JobId::new();
        for n in 0..(REPLAY_CAPACITY as u64 + 10) {
            buffers.append(job_id, frame_at(n), n, false);
        }
        let replayed = buffers.replay(job_id, -1);
        assert_eq!(replayed.len(), REPLAY_CAPACITY);
        assert_eq!(replayed[0].payload["n"], 10);
    }

    #[test]
    fn sweep_drops_buffers_past_the_ttl_after_a_terminal_event() {
        let mut buffers = ReplayBuffers::new();
        let job_id = JobId::new();
        buffers.append(job_id, frame_at(1), 1_000, true);
        assert_eq!(buffers.job_count(), 1);

        buffers.sweep_expired(1_000 + REPLAY_TTL_MS - 1);
        assert_eq!(buffers.job_count(), 1);

        buffers.sweep_expired(1_000 + REPLAY_TTL_MS + 1);
        assert_eq!(buffers.job_count(), 0);
    }

    #[test]
    fn sweep_never_drops_a_job_with_no_terminal_event() {
        let mut buffers = ReplayBuffers::new();
        let job_id = JobId::new();
        buffers.append(job_id, frame_at(1), 1_000, false);

        buffers.sweep_expired(1_000 + REPLAY_TTL_MS * 100);
        assert_eq!(buffers.job_count(), 1);
    }

    #[test]
    fn replay_for_unknown_job_is_empty() {
        let buffers = ReplayBuffers::new();
        assert!(buffers.replay(JobId::new(), 0).is_empty());
    }
}
