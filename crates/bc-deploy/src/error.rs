// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Any failure before the service is verified active rolls the Server
/// row back (`spec.md` §4.4: "Any failure before step 6 succeeds deletes
/// the Server row").
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("failed to open SSH session to {hostname}:{port}: {source}")]
    Connect { hostname: String, port: u16, source: String },

    #[error("authentication failed for {ssh_user}@{hostname}")]
    Authenticate { hostname: String, ssh_user: String },

    #[error("failed to upload agent binary: {0}")]
    Upload(String),

    #[error("sudo mv to the install path failed: {0}")]
    Install(String),

    #[error("failed to write agent config: {0}")]
    ConfigWrite(String),

    #[error("failed to install or start the agent service: {0}")]
    ServiceInstall(String),

    #[error("agent service failed to become active; last journal lines:\n{journal_tail}")]
    ServiceVerify { journal_tail: String },

    #[error("remote command failed: {0}")]
    Exec(String),
}
