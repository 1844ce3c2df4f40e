// SPDX-License-Identifier: MIT

//! Centralized environment variable access, mirroring the teacher's
//! `daemon::env` convention: one free function per variable, each
//! documenting its own fallback chain (`SPEC_FULL.md` §6).

use std::time::Duration;

pub fn port() -> u16 {
    std::env::var("PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(3000)
}

/// Startup default backup root, used to seed the `backup_root` setting
/// the first time the controller runs (`spec.md` §6).
pub fn backups_dir() -> Option<String> {
    std::env::var("BACKUPS_DIR").ok().filter(|s| !s.is_empty())
}

pub fn max_concurrent_global() -> usize {
    std::env::var("MAX_CONCURRENT_GLOBAL").ok().and_then(|s| s.parse().ok()).unwrap_or(8)
}

pub fn max_concurrent_per_server() -> usize {
    std::env::var("MAX_CONCURRENT_PER_SERVER").ok().and_then(|s| s.parse().ok()).unwrap_or(4)
}

/// Fallback controller IP for the deployer's source-IP detection
/// (`spec.md` §4.4 step 3).
pub fn backup_server_ip() -> Option<String> {
    std::env::var("BACKUP_SERVER_IP").ok().filter(|s| !s.is_empty())
}

pub fn log_level() -> String {
    std::env::var("LOG_LEVEL").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| "info".to_string())
}

/// Holds the SQLite file and daily snapshots (`SPEC_FULL.md` §6).
pub fn data_dir() -> String {
    std::env::var("DATA_DIR").ok().filter(|s| !s.is_empty()).unwrap_or_else(|| "data".to_string())
}

pub fn ping_interval() -> Duration {
    std::env::var("PING_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(10))
}

pub fn ui_ping_interval() -> Duration {
    std::env::var("UI_PING_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(30))
}

pub fn agent_ping_interval() -> Duration {
    std::env::var("AGENT_PING_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(30))
}

pub fn shutdown_watchdog() -> Duration {
    std::env::var("SHUTDOWN_WATCHDOG_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(8))
}

/// Path to the current agent binary on disk, served by
/// `GET /api/agent/binary` and uploaded during deploy. Not named in
/// `spec.md`'s environment table; the spec simply says "serve current
/// agent binary" without saying where it lives on the controller host,
/// so this is a supplemental knob rather than part of the literal
/// contract.
pub fn agent_binary_path() -> String {
    std::env::var("AGENT_BINARY_PATH")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "data/backup-agent".to_string())
}

pub fn agent_listen_port() -> u16 {
    std::env::var("AGENT_LISTEN_PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(7420)
}

pub fn agent_data_dir() -> String {
    std::env::var("AGENT_DATA_DIR")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "/var/lib/backup-agent".to_string())
}
