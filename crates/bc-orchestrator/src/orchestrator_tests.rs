// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::Duration;

use bc_core::{NewJob, NewServer};
use bc_eventbus::EventBus;
use bc_registry::test_support::FakeTransport;
use bc_registry::Registry;
use bc_wire::{AgentEvent, Frame};
use tempfile::TempDir;

use super::*;

struct Fixture {
    _job_dir: TempDir,
    _db_dir: TempDir,
    pool: sqlx::SqlitePool,
    registry: Arc<Registry>,
    transport: Arc<FakeTransport>,
    server_id: bc_core::ServerId,
}

async fn fixture() -> (Fixture, Orchestrator) {
    let db_dir = TempDir::new().expect("tempdir");
    let pool = bc_storage::connect(db_dir.path().join("test.db")).await.expect("connect");

    let server = bc_storage::servers::create(
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

    let registry = Arc::new(Registry::new());
    let transport = Arc::new(FakeTransport::new());
    registry.register(server.id, "web-01".into(), "1.0.0".into(), transport.clone());

    let events = EventBus::new();
    let semaphores = Semaphores::new(8, 4);
    let job_dir = TempDir::new().expect("tempdir");

    let orchestrator = Orchestrator::new(pool.clone(), Arc::clone(&registry), events, semaphores);

    let fixture = Fixture { _job_dir: job_dir, _db_dir: db_dir, pool, registry, transport, server_id: server.id };
    (fixture, orchestrator)
}

async fn seed_job(fixture: &Fixture, local_path: &std::path::Path) -> bc_core::JobId {
    let job = bc_storage::jobs::create(
        &fixture.pool,
        NewJob {
            server_id: fixture.server_id,
            name: "Daily".into(),
            remote_paths: vec!["/etc".into()],
            cron: None,
            enabled: true,
            retention_count: None,
        },
        local_path.to_str().expect("utf8 path"),
    )
    .await
    .expect("create job");
    job.id
}

async fn wait_for_sent_frame(transport: &FakeTransport) -> Frame {
    for _ in 0..200 {
        let frames = transport.sent_frames();
        if let Some(frame) = frames.into_iter().find(|f| f.message_type == "backup:start") {
            return frame;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("backup:start was never sent");
}

#[tokio::test]
async fn start_sends_backup_start_and_completes_on_agent_completion() {
    let (fixture, orchestrator) = fixture().await;
    let local_path = fixture._job_dir.path().join("web-01").join("daily");
    let job_id = seed_job(&fixture, &local_path).await;

    orchestrator.start(job_id, false).await.expect("start");
    assert!(orchestrator.is_running(job_id));

    let frame = wait_for_sent_frame(&fixture.transport).await;
    assert_eq!(frame.payload["job_id"], job_id.to_string());

    fixture.registry.dispatch_inbound(
        fixture.server_id,
        &AgentEvent::BackupCompleted { job_id, total_bytes: 1024, files_transferred: 3 }
            .clone_into_frame(),
    );

    wait_until(|| !orchestrator.is_running(job_id)).await;

    let job = bc_storage::jobs::get(&fixture.pool, job_id).await.expect("job");
    assert_eq!(job.status, bc_core::JobStatus::Completed);

    let versions = bc_storage::versions::list_for_job(&fixture.pool, job_id).await.expect("versions");
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].status, bc_core::VersionStatus::Completed);
    assert!(local_path.join("current").symlink_metadata().is_ok());
}

#[tokio::test]
async fn a_second_start_while_running_is_a_no_op() {
    let (fixture, orchestrator) = fixture().await;
    let local_path = fixture._job_dir.path().join("web-01").join("daily");
    let job_id = seed_job(&fixture, &local_path).await;

    orchestrator.start(job_id, false).await.expect("first start");
    wait_for_sent_frame(&fixture.transport).await;

    orchestrator.start(job_id, false).await.expect("second start is a no-op");
    assert_eq!(fixture.transport.sent_frames().iter().filter(|f| f.message_type == "backup:start").count(), 1);
}

#[tokio::test]
async fn cancel_sends_backup_cancel_and_marks_job_cancelled() {
    let (fixture, orchestrator) = fixture().await;
    let local_path = fixture._job_dir.path().join("web-01").join("daily");
    let job_id = seed_job(&fixture, &local_path).await;

    orchestrator.start(job_id, false).await.expect("start");
    wait_for_sent_frame(&fixture.transport).await;

    orchestrator.cancel(job_id).await.expect("cancel");
    wait_until(|| !orchestrator.is_running(job_id)).await;

    let job = bc_storage::jobs::get(&fixture.pool, job_id).await.expect("job");
    assert_eq!(job.status, bc_core::JobStatus::Cancelled);

    let frames = fixture.transport.sent_frames();
    assert!(frames.iter().any(|f| f.message_type == "backup:cancel"));
}

#[tokio::test]
async fn cancel_on_a_job_that_is_not_running_errors() {
    let (_fixture, orchestrator) = fixture().await;
    let result = orchestrator.cancel(bc_core::JobId::new()).await;
    assert!(matches!(result, Err(OrchestratorError::NotRunning)));
}

#[tokio::test]
async fn agent_not_connected_fails_the_job_immediately() {
    let (fixture, orchestrator) = fixture().await;
    let local_path = fixture._job_dir.path().join("web-01").join("daily");
    let job_id = seed_job(&fixture, &local_path).await;

    fixture.registry.unregister(fixture.server_id);

    orchestrator.start(job_id, false).await.expect("start");
    wait_until(|| !orchestrator.is_running(job_id)).await;

    let job = bc_storage::jobs::get(&fixture.pool, job_id).await.expect("job");
    assert_eq!(job.status, bc_core::JobStatus::Failed);
}

#[tokio::test]
async fn handle_agent_disconnected_marks_every_job_running_on_that_server_as_failed() {
    let (fixture, orchestrator) = fixture().await;
    let local_path = fixture._job_dir.path().join("web-01").join("daily");
    let job_id = seed_job(&fixture, &local_path).await;

    orchestrator.start(job_id, false).await.expect("start");
    wait_for_sent_frame(&fixture.transport).await;

    orchestrator.handle_agent_disconnected(fixture.server_id);
    wait_until(|| !orchestrator.is_running(job_id)).await;

    let job = bc_storage::jobs::get(&fixture.pool, job_id).await.expect("job");
    assert_eq!(job.status, bc_core::JobStatus::Failed);
}

async fn wait_until(mut predicate: impl FnMut() -> bool) {
    for _ in 0..500 {
        if predicate() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition was never satisfied");
}

trait CloneIntoFrame {
    fn clone_into_frame(&self) -> Frame;
}

impl CloneIntoFrame for AgentEvent {
    fn clone_into_frame(&self) -> Frame {
        match self {
            AgentEvent::BackupCompleted { job_id, total_bytes, files_transferred } => Frame::new(
                "backup:completed",
                serde_json::json!({"job_id": job_id, "total_bytes": total_bytes, "files_transferred": files_transferred}),
            ),
            AgentEvent::BackupFailed { job_id, error } => {
                Frame::new("backup:failed", serde_json::json!({"job_id": job_id, "error": error}))
            }
            _ => unimplemented!("not needed by these tests"),
        }
    }
}
