#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use axum::body::to_bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use silo_host::config::AppConfig;
use silo_host::{bootstrap, ops, shutdown};

async fn body_text(resp: axum::response::Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn readyz_tracks_lifecycle_phase() {
    let app = bootstrap::bootstrap(AppConfig::named("billing")).unwrap().build();

    let resp = ops::readyz(State(app.clone())).await.into_response();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_text(resp).await, "configured");

    app.started().unwrap();
    let resp = ops::readyz(State(app.clone())).await.into_response();
    assert_eq!(resp.status(), StatusCode::OK);

    shutdown(&app).await.unwrap();
    let resp = ops::readyz(State(app)).await.into_response();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn metrics_include_app_tag_and_job_counters() {
    let app = bootstrap::bootstrap(AppConfig::named("billing")).unwrap().build();
    app.started().unwrap();

    let jobs = app.background_job_manager().unwrap();
    jobs.submit_fn("noop", |_ctx| async { Ok::<(), silo_core::SiloError>(()) })
        .unwrap();
    jobs.drain(std::time::Duration::from_secs(1)).await;

    let resp = ops::metrics(State(app)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let text = body_text(resp).await;
    assert!(text.contains("silo_app_info{app=\"billing\"} 1"));
    assert!(text.contains("silo_jobs_submitted_total{job=\"noop\"} 1"));
    assert!(text.contains("silo_jobs_completed_total{job=\"noop\",outcome=\"ok\"} 1"));
}

#[tokio::test]
async fn status_reports_phase_and_jobs() {
    let app = bootstrap::bootstrap(AppConfig::named("billing")).unwrap().build();
    app.started().unwrap();

    let resp = ops::status(State(app)).await;
    let v: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(v["app"], "billing");
    assert_eq!(v["phase"], "started");
    assert_eq!(v["jobs"]["submitted"], 0);
    assert!(v["now"].is_string());
}
