// SPDX-License-Identifier: MIT

//! Rendered `/etc/backup-agent/config.toml` (`spec.md` §4.4 step 4).

use bc_core::ServerId;
use serde::Serialize;

/// zstd level baked in by the spec; not operator-configurable.
pub const COMPRESSION_LEVEL: i32 = 3;

#[derive(Debug, Clone, Serialize)]
pub struct CompressionConfig {
    pub algorithm: &'static str,
    pub level: i32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self { algorithm: "zstd", level: COMPRESSION_LEVEL }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceConfig {
    pub max_concurrent_transfers: u32,
    pub chunk_size_bytes: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self { max_concurrent_transfers: 4, chunk_size_bytes: 1 << 20 }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentConfig {
    pub controller_url: String,
    pub server_id: ServerId,
    pub listen_port: u16,
    pub data_dir: String,
    pub compression: CompressionConfig,
    pub performance: PerformanceConfig,
}

impl AgentConfig {
    pub fn render_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_server_id_and_controller_url() {
        let config = AgentConfig {
            controller_url: "ws://10.0.0.1:3000".into(),
            server_id: ServerId::new(),
            listen_port: 7420,
            data_dir: "/var/lib/backup-agent".into(),
            compression: CompressionConfig::default(),
            performance: PerformanceConfig::default(),
        };
        let rendered = config.render_toml().expect("render");
        assert!(rendered.contains("controller_url"));
        assert!(rendered.contains("zstd"));
        assert!(rendered.contains("listen_port = 7420"));
    }
}
