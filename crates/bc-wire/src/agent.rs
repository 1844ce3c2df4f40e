// SPDX-License-Identifier: MIT

//! Typed messages on the agent WebSocket (`spec.md` §4.3, §6 "Agent
//! WebSocket").
//!
//! Inbound frames that carry a `request_id` matching a pending RPC are
//! resolved against that RPC and never reach [`AgentEvent`] (`spec.md`
//! §4.3 "Message dispatch"); everything else is decoded here.

use bc_core::{JobId, ServerId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::envelope::Frame;

/// Inbound frames the controller consumes from an agent socket, other
/// than RPC responses (handled by the registry before reaching this
/// type).
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    Register { server_id: ServerId, hostname: String, version: String },
    BackupStarted { job_id: JobId },
    BackupProgress { job_id: JobId, percent: u8, current_file: Option<String>, bytes_transferred: u64 },
    BackupCompleted { job_id: JobId, total_bytes: u64, files_transferred: u64 },
    BackupFailed { job_id: JobId, error: String },
    Status { reachable: bool },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentEventError {
    #[error("unrecognized agent message type: {0}")]
    UnknownType(String),
    #[error("malformed payload for {message_type}: {source}")]
    BadPayload { message_type: String, source: String },
}

impl AgentEvent {
    pub fn from_frame(frame: &Frame) -> Result<Self, AgentEventError> {
        let bad = |e: serde_json::Error| AgentEventError::BadPayload {
            message_type: frame.message_type.clone(),
            source: e.to_string(),
        };
        match frame.message_type.as_str() {
            "agent:register" => {
                let p: RegisterPayload = serde_json::from_value(frame.payload.clone()).map_err(bad)?;
                Ok(AgentEvent::Register { server_id: p.server_id, hostname: p.hostname, version: p.version })
            }
            "backup:started" => {
                let p: JobOnlyPayload = serde_json::from_value(frame.payload.clone()).map_err(bad)?;
                Ok(AgentEvent::BackupStarted { job_id: p.job_id })
            }
            "backup:progress" => {
                let p: ProgressPayload = serde_json::from_value(frame.payload.clone()).map_err(bad)?;
                Ok(AgentEvent::BackupProgress {
                    job_id: p.job_id,
                    percent: p.percent,
                    current_file: p.current_file,
                    bytes_transferred: p.bytes_transferred,
                })
            }
            "backup:completed" => {
                let p: CompletedPayload = serde_json::from_value(frame.payload.clone()).map_err(bad)?;
                Ok(AgentEvent::BackupCompleted {
                    job_id: p.job_id,
                    total_bytes: p.total_bytes,
                    files_transferred: p.files_transferred,
                })
            }
            "backup:failed" => {
                let p: FailedPayload = serde_json::from_value(frame.payload.clone()).map_err(bad)?;
                Ok(AgentEvent::BackupFailed { job_id: p.job_id, error: p.error })
            }
            "agent:status" => {
                let p: StatusPayload = serde_json::from_value(frame.payload.clone()).map_err(bad)?;
                Ok(AgentEvent::Status { reachable: p.reachable })
            }
            other => Err(AgentEventError::UnknownType(other.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    server_id: ServerId,
    hostname: String,
    version: String,
}

#[derive(Debug, Deserialize)]
struct JobOnlyPayload {
    job_id: JobId,
}

#[derive(Debug, Deserialize)]
struct ProgressPayload {
    job_id: JobId,
    percent: u8,
    #[serde(default)]
    current_file: Option<String>,
    #[serde(default)]
    bytes_transferred: u64,
}

#[derive(Debug, Deserialize)]
struct CompletedPayload {
    job_id: JobId,
    total_bytes: u64,
    #[serde(default)]
    files_transferred: u64,
}

#[derive(Debug, Deserialize)]
struct FailedPayload {
    job_id: JobId,
    error: String,
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    reachable: bool,
}

/// Frames the controller sends to an agent (`spec.md` §6 "Outbound
/// types").
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerOutbound {
    /// `link_dest` is the local path of the latest completed version,
    /// passed so the agent can hard-link unchanged files instead of
    /// re-uploading them (`spec.md` §4.1 "Deduplication against prior
    /// version"); `None` for a full backup or a job's first run.
    BackupStart { job_id: JobId, paths: Vec<String>, link_dest: Option<String> },
    BackupCancel { job_id: JobId },
    FsBrowse { path: String },
    AgentUpdate { download_path: String, version: String },
}

impl ControllerOutbound {
    pub fn into_frame(self) -> Frame {
        match self {
            ControllerOutbound::BackupStart { job_id, paths, link_dest } => Frame::new(
                "backup:start",
                serde_json::json!({"job_id": job_id, "paths": paths, "link_dest": link_dest}),
            ),
            ControllerOutbound::BackupCancel { job_id } => {
                Frame::new("backup:cancel", serde_json::json!({"job_id": job_id}))
            }
            ControllerOutbound::FsBrowse { path } => {
                Frame::new("fs:browse", serde_json::json!({"path": path}))
            }
            ControllerOutbound::AgentUpdate { download_path, version } => Frame::new(
                "agent:update",
                serde_json::json!({"download_path": download_path, "version": version}),
            ),
        }
    }
}

/// The controller's reply to `agent:register` (`spec.md` §4.3).
#[derive(Debug, Clone, PartialEq)]
pub enum RegisterReply {
    Ok,
    Error { reason: String },
}

impl RegisterReply {
    pub fn into_frame(self) -> Frame {
        match self {
            RegisterReply::Ok => Frame::new("agent:register:ok", serde_json::json!({})),
            RegisterReply::Error { reason } => {
                Frame::new("agent:register:error", serde_json::json!({"reason": reason}))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_register() {
        let server_id = ServerId::new();
        let frame = Frame::new(
            "agent:register",
            serde_json::json!({"server_id": server_id, "hostname": "web-01", "version": "1.2.0"}),
        );
        let event = AgentEvent::from_frame(&frame).expect("decode");
        assert_eq!(
            event,
            AgentEvent::Register { server_id, hostname: "web-01".into(), version: "1.2.0".into() }
        );
    }

    #[test]
    fn decodes_progress_with_defaults() {
        let job_id = JobId::new();
        let frame = Frame::new("backup:progress", serde_json::json!({"job_id": job_id, "percent": 42}));
        let event = AgentEvent::from_frame(&frame).expect("decode");
        assert_eq!(
            event,
            AgentEvent::BackupProgress {
                job_id,
                percent: 42,
                current_file: None,
                bytes_transferred: 0
            }
        );
    }

    #[test]
    fn rejects_unknown_type() {
        let frame = Frame::new("something:else", serde_json::json!({}));
        assert_eq!(AgentEvent::from_frame(&frame), Err(AgentEventError::UnknownType("something:else".into())));
    }

    #[test]
    fn backup_start_encodes_job_id_and_paths() {
        let job_id = JobId::new();
        let outbound = ControllerOutbound::BackupStart {
            job_id,
            paths: vec!["/etc".into(), "/var/www".into()],
            link_dest: Some("/srv/backups/web-01/daily/versions/2026-01-01_00-00-00".into()),
        };
        let frame = outbound.into_frame();
        assert_eq!(frame.message_type, "backup:start");
        assert_eq!(frame.payload["job_id"], job_id.to_string());
        assert_eq!(frame.payload["paths"][1], "/var/www");
        assert_eq!(frame.payload["link_dest"], "/srv/backups/web-01/daily/versions/2026-01-01_00-00-00");
    }

    #[test]
    fn register_error_roundtrips_through_json() {
        let reply = RegisterReply::Error { reason: "unknown server".into() };
        let frame = reply.into_frame();
        let text = frame.to_json().expect("encode");
        assert!(text.contains("agent:register:error"));
        assert!(text.contains("unknown server"));
    }
}
