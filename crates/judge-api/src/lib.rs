//! HTTP submission gateway: validates and accepts submissions, exposes
//! status lookup and listing, and reports health/introspection data.

mod error;
mod health;
mod routes;
mod serve;

use std::sync::Arc;

use judge_catalog::Catalog;
use judge_dispatcher::Dispatcher;
use judge_store::JobStore;

pub use serve::{HttpEndpoint, build_router};

/// Shared state behind every handler. Cheap to clone: every field is
/// itself a handle (`Arc`/connection pool/channel sender).
#[derive(Clone)]
pub struct AppState {
    pub store: JobStore,
    pub catalog: Arc<Catalog>,
    pub dispatcher: Dispatcher,
    pub worker_capacity: usize,
}
