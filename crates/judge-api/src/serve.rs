//! Wires the route table to an `axum::serve` task with graceful shutdown.
//! Generalized from the teacher's SSE/MCP `HttpEndpoint` (bind → serve →
//! cancel-token shutdown) to a plain JSON REST endpoint.

use std::net::SocketAddr;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{AppState, health, routes};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/submissions", post(routes::submit).get(routes::list_jobs))
        .route("/submissions/{id}", get(routes::get_job))
        .route("/languages", get(routes::languages))
        .route("/health", get(health::health))
        .with_state(state)
}

pub struct HttpEndpoint {
    pub addr: SocketAddr,
    shutdown: CancellationToken,
    server_task: tokio::task::JoinHandle<()>,
}

impl HttpEndpoint {
    pub async fn start(host: &str, port: u16, state: AppState) -> std::io::Result<Self> {
        let bind_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("invalid bind address: {e}")))?;

        let listener = TcpListener::bind(bind_addr).await?;
        let local_addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let app = build_router(state);
        let server_shutdown = shutdown.clone();

        let server_task = tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    server_shutdown.cancelled().await;
                })
                .await
            {
                warn!(error = %error, "judge-api HTTP server stopped with error");
            }
        });

        Ok(Self { addr: local_addr, shutdown, server_task })
    }

    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(error) = self.server_task.await {
            tracing::debug!(error = %error, "judge-api HTTP server join failed");
        }
    }
}
