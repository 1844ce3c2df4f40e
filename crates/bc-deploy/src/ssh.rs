// SPDX-License-Identifier: MIT

//! Thin wrapper over `russh`/`russh-keys` exposing exactly the
//! operations the deploy flow needs: run a remote command and capture
//! its output, and write a file by piping through `tee`/`cat` (the
//! scope here is one binary and a couple of config files, not a
//! general SFTP client, so there is no need for the SFTP subsystem).

use std::sync::Arc;

use russh::client::{self, Handle};
use russh::{ChannelMsg, Disconnect};
use russh_keys::key::PublicKey;

use crate::error::DeployError;

struct AcceptAnyKey;

#[async_trait::async_trait]
impl client::Handler for AcceptAnyKey {
    type Error = russh::Error;

    async fn check_server_key(&mut self, _server_public_key: &PublicKey) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

pub struct SshSession {
    handle: Handle<AcceptAnyKey>,
}

impl SshSession {
    #[tracing::instrument(skip(password))]
    pub async fn connect(
        hostname: &str,
        port: u16,
        ssh_user: &str,
        password: &str,
    ) -> Result<Self, DeployError> {
        let config = Arc::new(client::Config::default());
        let mut handle = client::connect(config, (hostname, port), AcceptAnyKey)
            .await
            .map_err(|e| DeployError::Connect {
                hostname: hostname.to_string(),
                port,
                source: e.to_string(),
            })?;

        let authenticated = handle
            .authenticate_password(ssh_user, password)
            .await
            .map_err(|e| DeployError::Connect { hostname: hostname.to_string(), port, source: e.to_string() })?;

        if !authenticated {
            return Err(DeployError::Authenticate {
                hostname: hostname.to_string(),
                ssh_user: ssh_user.to_string(),
            });
        }

        Ok(Self { handle })
    }

    /// Run a remote command to completion and return (stdout, exit code).
    #[tracing::instrument(skip(self))]
    pub async fn exec(&mut self, command: &str) -> Result<(String, i32), DeployError> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| DeployError::Exec(e.to_string()))?;
        channel
            .exec(true, command)
            .await
            .map_err(|e| DeployError::Exec(e.to_string()))?;

        let mut stdout = Vec::new();
        let mut exit_code = 0;
        loop {
            let Some(msg) = channel.wait().await else { break };
            match msg {
                ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
                ChannelMsg::ExitStatus { exit_status } => exit_code = exit_status as i32,
                ChannelMsg::Eof | ChannelMsg::Close => break,
                _ => {}
            }
        }

        Ok((String::from_utf8_lossy(&stdout).into_owned(), exit_code))
    }

    /// Write `contents` to `remote_path` by piping through `tee` over the
    /// exec channel (`spec.md` §4.4 steps 2 and 4: "via temp-file +
    /// `sudo mv`").
    #[tracing::instrument(skip(self, contents))]
    pub async fn write_file(&mut self, remote_path: &str, contents: &[u8]) -> Result<(), DeployError> {
        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| DeployError::Upload(e.to_string()))?;
        channel
            .exec(true, format!("cat > {remote_path}"))
            .await
            .map_err(|e| DeployError::Upload(e.to_string()))?;
        channel
            .data(contents)
            .await
            .map_err(|e| DeployError::Upload(e.to_string()))?;
        channel.eof().await.map_err(|e| DeployError::Upload(e.to_string()))?;

        loop {
            let Some(msg) = channel.wait().await else { break };
            if let ChannelMsg::ExitStatus { exit_status } = msg {
                if exit_status != 0 {
                    return Err(DeployError::Upload(format!("remote write exited {exit_status}")));
                }
            }
            if matches!(msg, ChannelMsg::Eof | ChannelMsg::Close) {
                break;
            }
        }
        Ok(())
    }

    pub async fn close(mut self) {
        let _ = self
            .handle
            .disconnect(Disconnect::ByApplication, "deploy complete", "en")
            .await;
    }
}
