// SPDX-License-Identifier: MIT

//! `Server`: a remote host under management (`spec.md` §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::ServerId;

/// Connection state of a managed agent, derived from [`crate::registry`]
/// events and persisted on the `Server` row so REST reads don't need a
/// live registry round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    Disconnected,
    Connected,
    Updating,
    Error,
}

impl Default for AgentState {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Updating => "updating",
            Self::Error => "error",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AgentState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disconnected" => Ok(Self::Disconnected),
            "connected" => Ok(Self::Connected),
            "updating" => Ok(Self::Updating),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown agent state: {other}")),
        }
    }
}

/// A remote host under management.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub id: ServerId,
    pub name: String,
    pub hostname: String,
    pub port: u16,
    pub ssh_user: String,
    pub agent_state: AgentState,
    pub agent_version: Option<String>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted from `POST /api/servers` (`spec.md` §6). The plaintext
/// password is used once, during deploy, and is never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct NewServer {
    pub name: String,
    pub hostname: String,
    pub port: u16,
    pub ssh_user: String,
    pub password: String,
}

/// Fields accepted from `PUT /api/servers/:id`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerUpdate {
    pub name: Option<String>,
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub ssh_user: Option<String>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for Server {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;
        let agent_state: String = row.try_get("agent_state")?;
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            hostname: row.try_get("hostname")?,
            port: row.try_get::<i64, _>("port")? as u16,
            ssh_user: row.try_get("ssh_user")?,
            agent_state: agent_state.parse().map_err(|e: String| sqlx::Error::Decode(e.into()))?,
            agent_version: row.try_get("agent_version")?,
            last_seen_at: row.try_get("last_seen_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
