//! Axum router wiring for the ops endpoints.

use axum::{routing::get, Router};

use crate::{lifecycle::App, ops};

pub fn build_router(app: App) -> Router {
    Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .route("/status", get(ops::status))
        .with_state(app)
}
