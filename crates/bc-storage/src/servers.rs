// SPDX-License-Identifier: MIT

//! CRUD for [`Server`] rows.

use bc_core::{AgentState, NewServer, Server, ServerId, ServerUpdate};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::StorageError;

#[tracing::instrument(skip(pool, new), fields(name = %new.name))]
pub async fn create(pool: &SqlitePool, new: NewServer) -> Result<Server, StorageError> {
    let id = ServerId::new();
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO servers (id, name, hostname, port, ssh_user, agent_state, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(&new.name)
    .bind(&new.hostname)
    .bind(i64::from(new.port))
    .bind(&new.ssh_user)
    .bind(AgentState::Disconnected.to_string())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    get(pool, id).await
}

#[tracing::instrument(skip(pool))]
pub async fn get(pool: &SqlitePool, id: ServerId) -> Result<Server, StorageError> {
    sqlx::query_as::<_, Server>("SELECT * FROM servers WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(StorageError::NotFound("server"))
}

#[tracing::instrument(skip(pool))]
pub async fn list(pool: &SqlitePool) -> Result<Vec<Server>, StorageError> {
    Ok(sqlx::query_as::<_, Server>("SELECT * FROM servers ORDER BY name").fetch_all(pool).await?)
}

#[tracing::instrument(skip(pool, update))]
pub async fn update(pool: &SqlitePool, id: ServerId, update: ServerUpdate) -> Result<Server, StorageError> {
    let existing = get(pool, id).await?;
    let name = update.name.unwrap_or(existing.name);
    let hostname = update.hostname.unwrap_or(existing.hostname);
    let port = update.port.unwrap_or(existing.port);
    let ssh_user = update.ssh_user.unwrap_or(existing.ssh_user);

    sqlx::query(
        "UPDATE servers SET name = ?, hostname = ?, port = ?, ssh_user = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&name)
    .bind(&hostname)
    .bind(i64::from(port))
    .bind(&ssh_user)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    get(pool, id).await
}

#[tracing::instrument(skip(pool))]
pub async fn delete(pool: &SqlitePool, id: ServerId) -> Result<(), StorageError> {
    let result = sqlx::query("DELETE FROM servers WHERE id = ?").bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound("server"));
    }
    Ok(())
}

/// Mark a server connected, recording the agent version and last-seen
/// instant (`spec.md` §4.3 registration handshake).
#[tracing::instrument(skip(pool))]
pub async fn mark_connected(pool: &SqlitePool, id: ServerId, agent_version: &str) -> Result<Server, StorageError> {
    let now = Utc::now();
    sqlx::query(
        "UPDATE servers SET agent_state = ?, agent_version = ?, last_seen_at = ?, updated_at = ? WHERE id = ?",
    )
    .bind(AgentState::Connected.to_string())
    .bind(agent_version)
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;
    get(pool, id).await
}

#[tracing::instrument(skip(pool))]
pub async fn set_agent_state(pool: &SqlitePool, id: ServerId, state: AgentState) -> Result<Server, StorageError> {
    sqlx::query("UPDATE servers SET agent_state = ?, updated_at = ? WHERE id = ?")
        .bind(state.to_string())
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    get(pool, id).await
}

#[cfg(test)]
#[path = "servers_tests.rs"]
mod tests;
