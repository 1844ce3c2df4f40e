// SPDX-License-Identifier: MIT

use super::*;
use crate::pool::connect;
use crate::{jobs, servers};
use bc_core::{NewJob, NewServer};
use tempfile::TempDir;

async fn seeded_job() -> (TempDir, sqlx::SqlitePool, JobId) {
    let dir = TempDir::new().expect("tempdir");
    let pool = connect(dir.path().join("test.db")).await.expect("connect");
    let server = servers::create(
        &pool,
        NewServer {
            name: "web-01".into(),
            hostname: "10.0.0.5".into(),
            port: 22,
            ssh_user: "admin".into(),
            password: "x".into(),
        },
    )
    .await
    .expect("create server");
    let job = jobs::create(
        &pool,
        NewJob {
            server_id: server.id,
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
    (dir, pool, job.id)
}

#[tokio::test]
async fn start_creates_an_unfinished_log() {
    let (_dir, pool, job_id) = seeded_job().await;
    let log = start(&pool, job_id).await.expect("start");
    assert!(log.finished_at.is_none());
    assert!(log.status.is_none());
}

#[tokio::test]
async fn finish_records_totals_and_status() {
    let (_dir, pool, job_id) = seeded_job().await;
    let log = start(&pool, job_id).await.expect("start");
    let finished = finish(&pool, log.id, JobStatus::Completed, 2048, 7, "ok", None).await.expect("finish");
    assert_eq!(finished.status, Some(JobStatus::Completed));
    assert_eq!(finished.bytes_transferred, 2048);
    assert!(finished.finished_at.is_some());
}
