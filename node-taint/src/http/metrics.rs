use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use node_taint_controller::metrics;

use crate::http::readiness::{State, readyz};

pub(crate) fn router(state: Arc<State>) -> Router {
    Router::new()
        .route("/metrics", get(serve_metrics))
        .route("/readyz", get(readyz))
        .with_state(state)
}

async fn serve_metrics() -> String {
    metrics::encode()
}
