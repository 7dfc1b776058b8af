//! `GET /health`: store reachability, active-job count, worker capacity.
//! Grounded on the original system's health handler, which combines a
//! trivial database ping with the background executor's active-job
//! count.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub store_reachable: bool,
    pub active_jobs: usize,
    pub worker_capacity: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    let store_reachable = state.store.ping().await.is_ok();
    Json(HealthReport {
        healthy: store_reachable,
        store_reachable,
        active_jobs: state.dispatcher.active_job_count(),
        worker_capacity: state.worker_capacity,
    })
}
