// SPDX-License-Identifier: MIT

//! The 7-step agent deploy flow (`spec.md` §4.4), as an `async_trait` so
//! the REST handler that creates a Server can be tested against
//! [`crate::test_support::FakeDeployer`] the same way the teacher tests
//! its engine crate against `oj-adapters`' fakes.

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use bc_core::ServerId;

use crate::config::{AgentConfig, CompressionConfig, PerformanceConfig};
use crate::error::DeployError;
use crate::source_ip::detect_source_ip;
use crate::ssh::SshSession;

const AGENT_BINARY_INSTALL_PATH: &str = "/usr/local/bin/backup-agent";
const AGENT_CONFIG_PATH: &str = "/etc/backup-agent/config.toml";
const AGENT_SERVICE_UNIT: &str = "backup-agent.service";
const SERVICE_SETTLE_DELAY: Duration = Duration::from_secs(2);
const SERVICE_VERIFY_JOURNAL_LINES: u32 = 30;

/// Everything the deployer needs to know about the target and the
/// already-created Server row.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub server_id: ServerId,
    pub hostname: String,
    pub port: u16,
    pub ssh_user: String,
    pub ssh_password: String,
    pub agent_binary: Vec<u8>,
    pub agent_listen_port: u16,
    pub agent_data_dir: String,
    /// `BACKUP_SERVER_IP` env fallback (`spec.md` §6 "Environment").
    pub env_controller_ip: Option<String>,
    pub local_ipv4_interfaces: Vec<Ipv4Addr>,
}

/// Step 7 (waiting up to 30s for `agent:register`) is a `bc-registry`
/// concern, not this crate's: it is polled by whoever calls `deploy`
/// after it returns, against the server id already in `DeployRequest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployOutcome;

#[async_trait]
pub trait Deployer: Send + Sync {
    async fn deploy(&self, request: DeployRequest) -> Result<DeployOutcome, DeployError>;
}

/// Real SSH-backed deployer.
pub struct RusshDeployer;

impl Default for RusshDeployer {
    fn default() -> Self {
        Self
    }
}

impl RusshDeployer {
    pub fn new() -> Self {
        Self::default()
    }

    async fn fetch_journal_tail(session: &mut SshSession) -> String {
        session
            .exec(&format!("journalctl -u {AGENT_SERVICE_UNIT} -n {SERVICE_VERIFY_JOURNAL_LINES} --no-pager"))
            .await
            .map(|(stdout, _)| stdout)
            .unwrap_or_else(|e| format!("(failed to fetch journal: {e})"))
    }
}

#[async_trait]
impl Deployer for RusshDeployer {
    #[tracing::instrument(skip(self, request), fields(server_id = %request.server_id))]
    async fn deploy(&self, request: DeployRequest) -> Result<DeployOutcome, DeployError> {
        // Step 1: open the SSH session.
        let mut session =
            SshSession::connect(&request.hostname, request.port, &request.ssh_user, &request.ssh_password)
                .await?;

        // Step 2: upload the binary, sudo mv into place, chmod +x.
        let temp_path = format!("/tmp/backup-agent.{}", request.server_id);
        session.write_file(&temp_path, &request.agent_binary).await?;
        let (_, exit) = session
            .exec(&format!("sudo mv {temp_path} {AGENT_BINARY_INSTALL_PATH} && sudo chmod +x {AGENT_BINARY_INSTALL_PATH}"))
            .await?;
        if exit != 0 {
            return Err(DeployError::Install(format!("install exited with status {exit}")));
        }

        // Step 3: source IP detection.
        let (ssh_connection_output, _) = session.exec("echo $SSH_CONNECTION").await?;
        let controller_ip = detect_source_ip(
            Some(&ssh_connection_output),
            request.env_controller_ip.as_deref(),
            &request.local_ipv4_interfaces,
        );

        // Step 4: write config.toml.
        let agent_config = AgentConfig {
            controller_url: format!("ws://{controller_ip}:{}", request.agent_listen_port),
            server_id: request.server_id,
            listen_port: request.agent_listen_port,
            data_dir: request.agent_data_dir.clone(),
            compression: CompressionConfig::default(),
            performance: PerformanceConfig::default(),
        };
        let rendered = agent_config
            .render_toml()
            .map_err(|e| DeployError::ConfigWrite(e.to_string()))?;
        let temp_config_path = format!("/tmp/backup-agent-config.{}.toml", request.server_id);
        session.write_file(&temp_config_path, rendered.as_bytes()).await?;
        let (_, exit) = session
            .exec(&format!(
                "sudo mkdir -p /etc/backup-agent && sudo mv {temp_config_path} {AGENT_CONFIG_PATH}"
            ))
            .await?;
        if exit != 0 {
            return Err(DeployError::ConfigWrite(format!("config install exited with status {exit}")));
        }

        // Step 5: install, (re)start the service unit.
        let service_unit = render_service_unit();
        let temp_unit_path = "/tmp/backup-agent.service";
        session.write_file(temp_unit_path, service_unit.as_bytes()).await?;
        let install_service_cmd = format!(
            "sudo mv {temp_unit_path} /etc/systemd/system/{AGENT_SERVICE_UNIT} && \
             sudo systemctl daemon-reload && \
             sudo systemctl enable {AGENT_SERVICE_UNIT} && \
             (sudo fuser -k {}/tcp || true) && \
             sudo systemctl restart {AGENT_SERVICE_UNIT}",
            request.agent_listen_port
        );
        let (_, exit) = session.exec(&install_service_cmd).await?;
        if exit != 0 {
            return Err(DeployError::ServiceInstall(format!("service install exited with status {exit}")));
        }

        // Step 6: settle, then verify the service is active.
        tokio::time::sleep(SERVICE_SETTLE_DELAY).await;
        let (status, _) = session.exec(&format!("systemctl is-active {AGENT_SERVICE_UNIT}")).await?;
        if status.trim() != "active" {
            let journal_tail = Self::fetch_journal_tail(&mut session).await;
            session.close().await;
            return Err(DeployError::ServiceVerify { journal_tail });
        }

        session.close().await;

        Ok(DeployOutcome)
    }
}

fn render_service_unit() -> String {
    format!(
        "[Unit]\n\
         Description=Backup Agent\n\
         After=network.target\n\n\
         [Service]\n\
         ExecStart={AGENT_BINARY_INSTALL_PATH} --config {AGENT_CONFIG_PATH}\n\
         Restart=on-failure\n\
         RestartSec=2\n\n\
         [Install]\n\
         WantedBy=multi-user.target\n"
    )
}
