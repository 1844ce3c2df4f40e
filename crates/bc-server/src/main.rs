// SPDX-License-Identifier: MIT

//! Binary entry point: wires the shared services together, binds the
//! HTTP listener, and runs until a shutdown signal arrives
//! (`SPEC_FULL.md` §4.10).

use std::sync::Arc;

use anyhow::Context;
use bc_core::BACKUP_ROOT_KEY;
use bc_deploy::RusshDeployer;
use bc_eventbus::EventBus;
use bc_orchestrator::{Orchestrator, Semaphores};
use bc_registry::Registry;
use bc_scheduler::Scheduler;
use bc_server::state::{AppState, PingSnapshot};
use bc_server::{env, ping, replay_sweep, router, shutdown, snapshot};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tokio::fs::create_dir_all(env::data_dir()).await.context("failed to create data directory")?;
    let pool = bc_storage::pool::connect(format!("{}/backup-controller.db", env::data_dir()))
        .await
        .context("failed to open sqlite pool")?;

    if bc_storage::settings::get_setting(&pool, BACKUP_ROOT_KEY).await?.is_none() {
        if let Some(backups_dir) = env::backups_dir() {
            bc_storage::settings::set_setting(&pool, BACKUP_ROOT_KEY, &backups_dir).await?;
        }
    }

    let registry = Arc::new(Registry::new());
    let events = EventBus::new();
    let semaphores = Semaphores::new(env::max_concurrent_global(), env::max_concurrent_per_server());
    let orchestrator = Orchestrator::new(pool.clone(), registry.clone(), events.clone(), semaphores);

    let scheduler = Scheduler::new(pool.clone(), orchestrator.clone()).await.context("failed to start scheduler")?;
    scheduler.load_from_storage().await.context("failed to load scheduled jobs")?;
    scheduler.start().await.context("failed to start scheduler")?;

    let state = AppState {
        pool,
        registry,
        events,
        orchestrator,
        scheduler: Arc::new(tokio::sync::Mutex::new(scheduler)),
        deployer: Arc::new(RusshDeployer::new()),
        ping_snapshot: Arc::new(PingSnapshot::default()),
        local_ipv4_interfaces: Arc::new(Vec::new()),
        ui_shutdown: CancellationToken::new(),
        background_shutdown: CancellationToken::new(),
    };

    tokio::spawn(ping::run(state.clone(), state.background_shutdown.clone()));
    tokio::spawn(snapshot::run(state.clone(), state.background_shutdown.clone()));
    tokio::spawn(replay_sweep::run(state.clone(), state.background_shutdown.clone()));

    let app = router(state.clone());
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", env::port()))
        .await
        .with_context(|| format!("failed to bind port {}", env::port()))?;

    tracing::info!(port = env::port(), "backup controller listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown::signal().await;
            shutdown::run(state).await;
        })
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(env::log_level()).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
