// SPDX-License-Identifier: MIT

//! End-to-end scenarios against a real `bc-server` router bound to a
//! loopback port, exercising the invariants in `spec.md` §8: server and
//! job CRUD, the path-escape guard (I7), validation ordering, and the
//! agent WebSocket registration handshake.
//!
//! Agent presence is faked by registering a
//! [`bc_registry::test_support::FakeTransport`] directly against the
//! shared registry rather than driving a full WebSocket client for every
//! test, the same fixture shape `bc-orchestrator`'s own tests use; one
//! dedicated test drives a real `tokio-tungstenite` client through
//! `/ws/agent` to cover the handshake itself end to end.

use std::net::Ipv4Addr;
use std::sync::Arc;

use bc_deploy::test_support::FakeDeployer;
use bc_eventbus::EventBus;
use bc_orchestrator::{Orchestrator, Semaphores};
use bc_registry::test_support::FakeTransport;
use bc_registry::Registry;
use bc_scheduler::Scheduler;
use bc_server::state::{AppState, PingSnapshot};
use bc_wire::{Frame, RegisterReply};
use serde_json::json;
use serial_test::serial;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

struct App {
    base_url: String,
    state: AppState,
    _db_dir: TempDir,
    _backup_root: TempDir,
    _server_task: tokio::task::JoinHandle<()>,
}

async fn spawn_app() -> App {
    let db_dir = TempDir::new().expect("tempdir");
    let pool = bc_storage::connect(db_dir.path().join("test.db")).await.expect("connect");

    let backup_root = TempDir::new().expect("tempdir");
    bc_storage::settings::set_setting(
        &pool,
        bc_core::BACKUP_ROOT_KEY,
        &backup_root.path().to_string_lossy(),
    )
    .await
    .expect("seed backup root");

    let registry = Arc::new(Registry::new());
    let events = EventBus::new();
    let semaphores = Semaphores::new(8, 4);
    let orchestrator = Orchestrator::new(pool.clone(), registry.clone(), events.clone(), semaphores);
    let scheduler = Scheduler::new(pool.clone(), orchestrator.clone()).await.expect("scheduler");

    let state = AppState {
        pool,
        registry,
        events,
        orchestrator,
        scheduler: Arc::new(tokio::sync::Mutex::new(scheduler)),
        deployer: Arc::new(FakeDeployer::succeeding()),
        ping_snapshot: Arc::new(PingSnapshot::default()),
        local_ipv4_interfaces: Arc::new(vec![Ipv4Addr::new(127, 0, 0, 1)]),
        ui_shutdown: CancellationToken::new(),
        background_shutdown: CancellationToken::new(),
    };

    let app = bc_server::router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let server_task = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server");
    });

    App {
        base_url: format!("http://{addr}"),
        state,
        _db_dir: db_dir,
        _backup_root: backup_root,
        _server_task: server_task,
    }
}

fn new_server_body(name: &str) -> serde_json::Value {
    json!({
        "name": name,
        "hostname": "10.0.0.5",
        "port": 22,
        "ssh_user": "admin",
        "password": "hunter2",
    })
}

async fn create_server(app: &App, client: &reqwest::Client) -> bc_core::Server {
    let response = client
        .post(format!("{}/api/servers", app.base_url))
        .json(&new_server_body("Web 01"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 200);
    response.json().await.expect("decode server")
}

/// Registers a `FakeTransport` directly against the app's registry, as
/// if that server's agent had already completed the `/ws/agent`
/// handshake.
fn fake_connect(app: &App, server_id: bc_core::ServerId) -> Arc<FakeTransport> {
    let transport = Arc::new(FakeTransport::new());
    app.state.registry.register(server_id, "web-01".into(), "1.0.0".into(), transport.clone());
    transport
}

#[tokio::test]
#[serial]
async fn server_create_then_delete_round_trips() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let server = create_server(&app, &client).await;

    let list: Vec<bc_core::Server> =
        client.get(format!("{}/api/servers", app.base_url)).send().await.expect("req").json().await.expect("json");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id, server.id);

    let response = client.delete(format!("{}/api/servers/{}", app.base_url, server.id)).send().await.expect("req");
    assert_eq!(response.status(), 200);

    let list: Vec<bc_core::Server> =
        client.get(format!("{}/api/servers", app.base_url)).send().await.expect("req").json().await.expect("json");
    assert!(list.is_empty());
}

#[tokio::test]
#[serial]
async fn server_create_rolls_back_row_when_deploy_fails() {
    let client = reqwest::Client::new();

    // Build a standalone app wired to a failing deployer, rather than
    // mutating the shared fixture's deployer mid-test.
    let db_dir = TempDir::new().expect("tempdir");
    let pool = bc_storage::connect(db_dir.path().join("test.db")).await.expect("connect");
    let backup_root = TempDir::new().expect("tempdir");
    bc_storage::settings::set_setting(&pool, bc_core::BACKUP_ROOT_KEY, &backup_root.path().to_string_lossy())
        .await
        .expect("seed");
    let registry = Arc::new(Registry::new());
    let events = EventBus::new();
    let orchestrator = Orchestrator::new(pool.clone(), registry.clone(), events.clone(), Semaphores::new(8, 4));
    let scheduler = Scheduler::new(pool.clone(), orchestrator.clone()).await.expect("scheduler");
    let state = AppState {
        pool,
        registry,
        events,
        orchestrator,
        scheduler: Arc::new(tokio::sync::Mutex::new(scheduler)),
        deployer: Arc::new(FakeDeployer::failing_with(bc_deploy::DeployError::Connect {
            hostname: "10.0.0.5".into(),
            port: 22,
            source: "connection refused".into(),
        })),
        ping_snapshot: Arc::new(PingSnapshot::default()),
        local_ipv4_interfaces: Arc::new(Vec::new()),
        ui_shutdown: CancellationToken::new(),
        background_shutdown: CancellationToken::new(),
    };
    let router = bc_server::router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move { axum::serve(listener, router).await.expect("server") });

    let response = client
        .post(format!("http://{addr}/api/servers"))
        .json(&new_server_body("Web 02"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 422);

    let list: Vec<bc_core::Server> =
        client.get(format!("http://{addr}/api/servers")).send().await.expect("req").json().await.expect("json");
    assert!(list.is_empty(), "server row must be rolled back when deploy fails");
}

#[tokio::test]
#[serial]
async fn job_creation_rejects_empty_remote_paths() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let server = create_server(&app, &client).await;
    fake_connect(&app, server.id);

    let response = client
        .post(format!("{}/api/jobs", app.base_url))
        .json(&json!({
            "server_id": server.id,
            "name": "Daily",
            "remote_paths": [],
            "cron": null,
        }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 422);
}

#[tokio::test]
#[serial]
async fn job_creation_allocates_local_path_and_run_is_conflict_while_running() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let server = create_server(&app, &client).await;
    let transport = fake_connect(&app, server.id);

    let response = client
        .post(format!("{}/api/jobs", app.base_url))
        .json(&json!({
            "server_id": server.id,
            "name": "Daily",
            "remote_paths": ["/etc"],
            "cron": null,
        }))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 200);
    let job: bc_core::Job = response.json().await.expect("job");
    assert!(!job.local_path.is_empty());

    let run = client.post(format!("{}/api/jobs/{}/run", app.base_url, job.id)).send().await.expect("run");
    assert_eq!(run.status(), 200);

    // The orchestrator sent backup:start over the fake transport.
    let mut saw_start = false;
    for _ in 0..200 {
        if transport.sent_frames().iter().any(|f| f.message_type == "backup:start") {
            saw_start = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(saw_start, "expected backup:start to be sent to the fake agent transport");

    let conflict = client.post(format!("{}/api/jobs/{}/run", app.base_url, job.id)).send().await.expect("run again");
    assert_eq!(conflict.status(), 409);
}

#[tokio::test]
#[serial]
async fn storage_browse_rejects_path_that_escapes_backup_root() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/storage/browse", app.base_url))
        .query(&[("path", "../../etc/passwd")])
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[serial]
async fn agent_websocket_handshake_registers_connection() {
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let server = create_server(&app, &client).await;

    let ws_url = format!("ws://{}/ws/agent", app.base_url.trim_start_matches("http://"));
    let (mut socket, _) = tokio_tungstenite::connect_async(ws_url).await.expect("connect ws");

    let register = Frame::new(
        "agent:register",
        json!({"server_id": server.id, "hostname": "web-01", "version": "1.0.0"}),
    );
    socket.send(Message::Text(register.to_json().expect("encode"))).await.expect("send register");

    let reply = socket.next().await.expect("reply").expect("ws ok");
    let Message::Text(text) = reply else { panic!("expected text frame") };
    let frame = Frame::from_json(&text).expect("decode reply");
    assert_eq!(frame.message_type, RegisterReply::Ok.into_frame().message_type);

    assert!(app.state.registry.is_connected(server.id));

    socket.close(None).await.expect("close");
}

#[tokio::test]
#[serial]
async fn agent_disconnect_preserves_updating_state() {
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let server = create_server(&app, &client).await;

    let ws_url = format!("ws://{}/ws/agent", app.base_url.trim_start_matches("http://"));
    let (mut socket, _) = tokio_tungstenite::connect_async(ws_url).await.expect("connect ws");
    let register = Frame::new(
        "agent:register",
        json!({"server_id": server.id, "hostname": "web-01", "version": "1.0.0"}),
    );
    socket.send(Message::Text(register.to_json().expect("encode"))).await.expect("send register");
    socket.next().await.expect("reply").expect("ws ok");

    let response = client
        .post(format!("{}/api/agent/update/{}", app.base_url, server.id))
        .send()
        .await
        .expect("update request");
    assert_eq!(response.status(), 200);

    // The agent drops its socket to restart into the new binary, exactly
    // as the real self-update flow does.
    socket.close(None).await.expect("close");

    let mut saw_updating = false;
    for _ in 0..200 {
        let current: bc_core::Server = client
            .get(format!("{}/api/servers/{}", app.base_url, server.id))
            .send()
            .await
            .expect("req")
            .json()
            .await
            .expect("json");
        if !app.state.registry.is_connected(server.id) {
            assert_eq!(current.agent_state, bc_core::AgentState::Updating);
            saw_updating = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(saw_updating, "expected the disconnect handler to observe the closed socket");
}

#[tokio::test]
#[serial]
async fn ui_websocket_delivers_published_events() {
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let ws_url = format!("ws://{}/ws/ui", app.base_url.trim_start_matches("http://"));
    let (mut socket, _) = tokio_tungstenite::connect_async(ws_url).await.expect("connect ws");

    // Give the server a moment to register the connection before publishing.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let server = create_server(&app, &client).await;

    let message = tokio::time::timeout(std::time::Duration::from_secs(2), socket.next())
        .await
        .expect("did not time out")
        .expect("stream item")
        .expect("ws ok");
    let Message::Text(text) = message else { panic!("expected text frame") };
    let frame = Frame::from_json(&text).expect("decode");
    assert_eq!(frame.message_type, "server:created");
    assert_eq!(frame.payload["server_id"], server.id.to_string());
}
