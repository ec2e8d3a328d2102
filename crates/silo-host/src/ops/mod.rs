//! Operational HTTP endpoints.
//!
//! - `/healthz` : liveness
//! - `/readyz`  : readiness (503 unless the app is started)
//! - `/metrics` : job metrics, text format
//! - `/status`  : phase and job counters as JSON

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::lifecycle::App;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn readyz(State(app): State<App>) -> impl IntoResponse {
    if app.is_ready() {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, app.phase().as_str())
    }
}

pub async fn metrics(State(app): State<App>) -> Response {
    let jobs = match app.background_job_manager() {
        Ok(j) => j,
        Err(e) => return (StatusCode::SERVICE_UNAVAILABLE, e.code().as_str()).into_response(),
    };

    let stats = jobs.stats();
    let info = format!(
        "silo_app_info{{app=\"{}\"}}",
        app.application_name().unwrap_or_default().replace('"', "")
    );
    let extra = [
        (info.as_str(), 1),
        ("silo_app_ready", i64::from(app.is_ready())),
        ("silo_jobs_queued", stats.queued as i64),
        ("silo_jobs_scheduled", stats.scheduled as i64),
    ];
    let body = jobs.metrics().render(&extra);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}

pub async fn status(State(app): State<App>) -> Response {
    let jobs = app.background_job_manager().ok().map(|j| j.stats());
    let now = app.date_time_provider().ok().map(|c| c.now().to_rfc3339());

    Json(json!({
        "app": app.application_name().ok(),
        "phase": app.phase().as_str(),
        "now": now,
        "jobs": jobs.map(|s| json!({
            "submitted": s.submitted,
            "succeeded": s.succeeded,
            "failed": s.failed,
            "retried": s.retried,
            "dropped": s.dropped,
            "rejected": s.rejected,
            "in_flight": s.in_flight,
            "queued": s.queued,
            "scheduled": s.scheduled,
        })),
    }))
    .into_response()
}
