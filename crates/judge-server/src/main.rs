use std::sync::Arc;

use anyhow::{Context, Result};
use judge_api::{AppState, HttpEndpoint};
use judge_catalog::{Catalog, ResourceCeilings};
use judge_config::JudgeConfig;
use judge_dispatcher::Dispatcher;
use judge_sandbox::{DockerSandboxDriver, SandboxDriver};
use judge_store::JobStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let config = JudgeConfig::from_env();

    let store = JobStore::open(config.database_path())
        .with_context(|| format!("opening job store at {}", config.database_path().display()))?;
    let ceilings = ResourceCeilings {
        max_memory_mb: config.max_memory_mb,
        max_wall_time_ms: config.max_wall_time_ms,
        max_cpu_time_ms: config.max_cpu_time_ms,
    };
    let catalog = Arc::new(Catalog::with_config(&config.image_overrides, &ceilings));
    let driver: Arc<dyn SandboxDriver> =
        Arc::new(DockerSandboxDriver::new(config.enable_network, config.compilation_timeout_ms));
    let dispatcher = Dispatcher::spawn(config.max_workers, store.clone(), catalog.clone(), driver);

    let state = AppState {
        store,
        catalog,
        dispatcher,
        worker_capacity: config.max_workers,
    };

    let endpoint = HttpEndpoint::start(&config.api_host, config.api_port, state)
        .await
        .with_context(|| format!("binding {}:{}", config.api_host, config.api_port))?;
    tracing::info!(addr = %endpoint.addr, "judge-server listening");

    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    tracing::info!("shutdown signal received, draining in-flight requests");
    endpoint.shutdown().await;

    Ok(())
}
