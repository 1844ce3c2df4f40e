// SPDX-License-Identifier: MIT

//! Events broadcast to UI WebSocket clients, and the one message type a
//! UI client may send back (`spec.md` §4.2 "UI broadcast layer", §6 "UI
//! WebSocket").
//!
//! `UiEvent` is a closed enum spanning backup lifecycle, job/server/
//! version CRUD, per-server ping, and agent-level status changes. Event
//! types beginning with `backup:` and carrying a job id are mirrored
//! into the per-job replay buffer by the event bus; everything else is
//! fire-and-forget.

use bc_core::{JobId, ServerId, VersionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::envelope::Frame;

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    BackupStarted { job_id: JobId },
    BackupProgress { job_id: JobId, percent: u8, current_file: Option<String>, speed: Option<String> },
    BackupCompleted { job_id: JobId, version_id: VersionId },
    BackupFailed { job_id: JobId, error: String },
    JobCreated { job_id: JobId },
    JobUpdated { job_id: JobId },
    JobDeleted { job_id: JobId },
    ServerCreated { server_id: ServerId },
    ServerUpdated { server_id: ServerId },
    ServerDeleted { server_id: ServerId },
    VersionCreated { job_id: JobId, version_id: VersionId },
    VersionDeleted { job_id: JobId, version_id: VersionId },
    ServerPing { server_id: ServerId, reachable: bool },
}

impl UiEvent {
    /// Wire type string, e.g. `"backup:progress"`.
    pub fn message_type(&self) -> &'static str {
        match self {
            UiEvent::BackupStarted { .. } => "backup:started",
            UiEvent::BackupProgress { .. } => "backup:progress",
            UiEvent::BackupCompleted { .. } => "backup:completed",
            UiEvent::BackupFailed { .. } => "backup:failed",
            UiEvent::JobCreated { .. } => "job:created",
            UiEvent::JobUpdated { .. } => "job:updated",
            UiEvent::JobDeleted { .. } => "job:deleted",
            UiEvent::ServerCreated { .. } => "server:created",
            UiEvent::ServerUpdated { .. } => "server:updated",
            UiEvent::ServerDeleted { .. } => "server:deleted",
            UiEvent::VersionCreated { .. } => "version:created",
            UiEvent::VersionDeleted { .. } => "version:deleted",
            UiEvent::ServerPing { .. } => "server:ping",
        }
    }

    /// `job_id` carried by this event, if any — used by the event bus to
    /// decide which replay buffer (if any) to append to (`spec.md` §4.2:
    /// "events whose type starts with `backup:` and whose payload
    /// carries a job id").
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            UiEvent::BackupStarted { job_id }
            | UiEvent::BackupProgress { job_id, .. }
            | UiEvent::BackupCompleted { job_id, .. }
            | UiEvent::BackupFailed { job_id, .. }
            | UiEvent::JobCreated { job_id }
            | UiEvent::JobUpdated { job_id }
            | UiEvent::JobDeleted { job_id }
            | UiEvent::VersionCreated { job_id, .. }
            | UiEvent::VersionDeleted { job_id, .. } => Some(*job_id),
            UiEvent::ServerCreated { .. }
            | UiEvent::ServerUpdated { .. }
            | UiEvent::ServerDeleted { .. }
            | UiEvent::ServerPing { .. } => None,
        }
    }

    /// This event's type starts with `backup:` and carries a job id, so
    /// it is eligible for replay buffering.
    pub fn is_replayable(&self) -> bool {
        self.message_type().starts_with("backup:") && self.job_id().is_some()
    }

    fn payload(&self) -> Value {
        match self {
            UiEvent::BackupStarted { job_id } => serde_json::json!({"job_id": job_id}),
            UiEvent::BackupProgress { job_id, percent, current_file, speed } => {
                serde_json::json!({
                    "job_id": job_id,
                    "percent": percent,
                    "current_file": current_file,
                    "speed": speed,
                })
            }
            UiEvent::BackupCompleted { job_id, version_id } => {
                serde_json::json!({"job_id": job_id, "version_id": version_id})
            }
            UiEvent::BackupFailed { job_id, error } => {
                serde_json::json!({"job_id": job_id, "error": error})
            }
            UiEvent::JobCreated { job_id }
            | UiEvent::JobUpdated { job_id }
            | UiEvent::JobDeleted { job_id } => serde_json::json!({"job_id": job_id}),
            UiEvent::ServerCreated { server_id }
            | UiEvent::ServerUpdated { server_id }
            | UiEvent::ServerDeleted { server_id } => serde_json::json!({"server_id": server_id}),
            UiEvent::VersionCreated { job_id, version_id }
            | UiEvent::VersionDeleted { job_id, version_id } => {
                serde_json::json!({"job_id": job_id, "version_id": version_id})
            }
            UiEvent::ServerPing { server_id, reachable } => {
                serde_json::json!({"server_id": server_id, "reachable": reachable})
            }
        }
    }

    pub fn into_frame(self) -> Frame {
        Frame::new(self.message_type(), self.payload())
    }
}

/// The one message type a UI client can send (`spec.md` §4.2, §6).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReplayRequest {
    #[serde(rename = "jobId")]
    pub job_id: JobId,
    pub since: i64,
}

impl ReplayRequest {
    pub fn from_frame(frame: &Frame) -> Result<Self, serde_json::Error> {
        serde_json::from_value(frame.payload.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_progress_is_replayable_and_carries_job_id() {
        let job_id = JobId::new();
        let event =
            UiEvent::BackupProgress { job_id, percent: 50, current_file: None, speed: None };
        assert!(event.is_replayable());
        assert_eq!(event.job_id(), Some(job_id));
    }

    #[test]
    fn server_ping_is_not_replayable() {
        let event = UiEvent::ServerPing { server_id: ServerId::new(), reachable: true };
        assert!(!event.is_replayable());
        assert_eq!(event.job_id(), None);
    }

    #[test]
    fn frame_uses_expected_type_string() {
        let frame = UiEvent::JobUpdated { job_id: JobId::new() }.into_frame();
        assert_eq!(frame.message_type, "job:updated");
    }

    #[test]
    fn replay_request_decodes_camel_case_job_id() {
        let job_id = JobId::new();
        let frame = Frame::new(
            "replay:request",
            serde_json::json!({"jobId": job_id, "since": 0}),
        );
        let request = ReplayRequest::from_frame(&frame).expect("decode");
        assert_eq!(request, ReplayRequest { job_id, since: 0 });
    }
}
