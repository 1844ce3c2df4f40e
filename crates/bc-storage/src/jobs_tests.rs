// SPDX-License-Identifier: MIT

use super::*;
use crate::pool::connect;
use crate::servers;
use bc_core::{JobUpdate, NewServer};
use tempfile::TempDir;

async fn test_pool() -> (TempDir, sqlx::SqlitePool) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("test.db");
    let pool = connect(&path).await.expect("connect");
    (dir, pool)
}

async fn seed_server(pool: &sqlx::SqlitePool) -> ServerId {
    servers::create(
        pool,
        NewServer {
            name: "web-01".into(),
            hostname: "10.0.0.5".into(),
            port: 22,
            ssh_user: "admin".into(),
            password: "x".into(),
        },
    )
    .await
    .expect("create server")
    .id
}

#[tokio::test]
async fn create_applies_default_retention() {
    let (_dir, pool) = test_pool().await;
    let server_id = seed_server(&pool).await;
    let job = create(
        &pool,
        NewJob {
            server_id,
            name: "Daily".into(),
            remote_paths: vec!["/etc".into(), "/var/www".into()],
            cron: Some("0 3 * * *".into()),
            enabled: true,
            retention_count: None,
        },
        "/srv/backups/web-01/daily",
    )
    .await
    .expect("create job");

    assert_eq!(job.retention_count, bc_core::DEFAULT_RETENTION_COUNT);
    assert_eq!(job.remote_paths, vec!["/etc".to_string(), "/var/www".to_string()]);
    assert_eq!(job.status, JobStatus::Idle);
}

#[tokio::test]
async fn set_status_to_running_bumps_last_run_at() {
    let (_dir, pool) = test_pool().await;
    let server_id = seed_server(&pool).await;
    let job = create(
        &pool,
        NewJob {
            server_id,
            name: "Daily".into(),
            remote_paths: vec!["/etc".into()],
            cron: None,
            enabled: true,
            retention_count: None,
        },
        "/srv/backups/web-01/daily",
    )
    .await
    .expect("create job");
    assert!(job.last_run_at.is_none());

    let running = set_status(&pool, job.id, JobStatus::Running).await.expect("set status");
    assert_eq!(running.status, JobStatus::Running);
    assert!(running.last_run_at.is_some());
}

#[tokio::test]
async fn update_replaces_only_provided_fields() {
    let (_dir, pool) = test_pool().await;
    let server_id = seed_server(&pool).await;
    let job = create(
        &pool,
        NewJob {
            server_id,
            name: "Daily".into(),
            remote_paths: vec!["/etc".into()],
            cron: None,
            enabled: true,
            retention_count: None,
        },
        "/srv/backups/web-01/daily",
    )
    .await
    .expect("create job");

    let updated = update(
        &pool,
        job.id,
        JobUpdate { enabled: Some(false), ..Default::default() },
    )
    .await
    .expect("update");

    assert!(!updated.enabled);
    assert_eq!(updated.name, "Daily");
}
