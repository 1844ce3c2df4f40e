// SPDX-License-Identifier: MIT

use super::*;
use crate::pool::connect;
use bc_core::AgentState;
use tempfile::TempDir;

async fn test_pool() -> (TempDir, sqlx::SqlitePool) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("test.db");
    let pool = connect(&path).await.expect("connect");
    (dir, pool)
}

#[tokio::test]
async fn create_then_get_round_trips() {
    let (_dir, pool) = test_pool().await;
    let new = NewServer {
        name: "web-01".into(),
        hostname: "10.0.0.5".into(),
        port: 22,
        ssh_user: "admin".into(),
        password: "hunter2".into(),
    };
    let created = create(&pool, new).await.expect("create");
    let fetched = get(&pool, created.id).await.expect("get");
    assert_eq!(fetched.name, "web-01");
    assert_eq!(fetched.port, 22);
    assert_eq!(fetched.agent_state, AgentState::Disconnected);
}

#[tokio::test]
async fn mark_connected_updates_state_and_version() {
    let (_dir, pool) = test_pool().await;
    let created = create(
        &pool,
        NewServer {
            name: "web-02".into(),
            hostname: "10.0.0.6".into(),
            port: 22,
            ssh_user: "admin".into(),
            password: "x".into(),
        },
    )
    .await
    .expect("create");

    let updated = mark_connected(&pool, created.id, "1.2.0").await.expect("mark connected");
    assert_eq!(updated.agent_state, AgentState::Connected);
    assert_eq!(updated.agent_version.as_deref(), Some("1.2.0"));
    assert!(updated.last_seen_at.is_some());
}

#[tokio::test]
async fn delete_missing_server_errors() {
    let (_dir, pool) = test_pool().await;
    let err = delete(&pool, bc_core::ServerId::new()).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound("server")));
}
