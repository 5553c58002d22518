use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use storage_quota_monitor::{
    create_router, ApiState, ClassifiedError, ErrorCode, ManualClock, QuotaMonitor,
    QuotaMonitorConfig,
};
use tower::ServiceExt;

fn app() -> (Router, QuotaMonitor, Arc<ManualClock>) {
    let config = QuotaMonitorConfig {
        per_caller_limit: 10,
        global_limit: 100,
        ..QuotaMonitorConfig::default()
    };
    let clock = Arc::new(ManualClock::default());
    let monitor = QuotaMonitor::new(config.policy()).with_clock(clock.clone());
    let state = Arc::new(ApiState::new(monitor.clone(), config));
    (create_router(state), monitor, clock)
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).expect("request should build"))
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_stats_endpoint_reports_caller_and_global() {
    let (router, monitor, _clock) = app();
    for _ in 0..3 {
        monitor.track_usage("u1", "files.list");
    }

    let (status, body) = send(&router, Method::GET, "/api/quota/stats?caller_id=u1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["rate_limit"], 10);

    let (status, body) = send(&router, Method::GET, "/api/quota/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["rate_limit"], 100);
}

#[tokio::test]
async fn test_empty_caller_id_is_rejected() {
    let (router, _monitor, _clock) = app();

    let (status, body) = send(&router, Method::GET, "/api/quota/stats?caller_id=", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid_caller_id");
}

#[tokio::test]
async fn test_alerts_endpoint() {
    let (router, monitor, _clock) = app();

    let (_, body) = send(&router, Method::GET, "/api/quota/alerts?caller_id=u1", None).await;
    assert_eq!(body["alert"], Value::Null);

    for _ in 0..9 {
        monitor.track_usage("u1", "files.list");
    }
    let (status, body) = send(&router, Method::GET, "/api/quota/alerts?caller_id=u1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alert"]["level"], "warning");
    assert_eq!(body["alert"]["message"], "High quota usage: 90%");
}

#[tokio::test]
async fn test_recent_errors_endpoint() {
    let (router, monitor, _clock) = app();
    for i in 0..3 {
        monitor.track_error(
            &ClassifiedError::new(ErrorCode::RateLimitExceeded, format!("error-{i}")),
            Some("u1"),
        );
    }

    let (status, body) = send(&router, Method::GET, "/api/quota/errors?limit=2", None).await;
    assert_eq!(status, StatusCode::OK);
    let errors = body.as_array().expect("array of errors");
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["message"], "error-1");
    assert_eq!(errors[1]["error_code"], "rate-limit-exceeded");
}

#[tokio::test]
async fn test_reset_endpoint() {
    let (router, monitor, _clock) = app();
    monitor.track_usage("u1", "files.list");
    monitor.track_usage("u2", "files.list");

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/quota/reset",
        Some(json!({ "caller_id": "u1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(monitor.stats(Some("u1")).total, 0);
    assert_eq!(monitor.stats(Some("u2")).total, 1);

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/quota/reset",
        Some(json!({ "all": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(monitor.stats(None).total, 0);
}

async fn send_raw(router: &Router, content_type: Option<&str>, body: &str) -> StatusCode {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/quota/reset");
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }

    router
        .clone()
        .oneshot(
            builder
                .body(Body::from(body.to_string()))
                .expect("request should build"),
        )
        .await
        .expect("router should respond")
        .status()
}

fn seeded_app() -> (Router, QuotaMonitor) {
    let (router, monitor, _clock) = app();
    monitor.track_usage("u1", "files.list");
    monitor.track_usage("u2", "files.list");
    monitor.track_error(
        &ClassifiedError::new(ErrorCode::RateLimitExceeded, "slow down"),
        Some("u2"),
    );
    (router, monitor)
}

fn assert_untouched(monitor: &QuotaMonitor) {
    assert_eq!(monitor.stats(Some("u1")).total, 1);
    assert_eq!(monitor.stats(Some("u2")).total, 1);
    assert_eq!(monitor.stats(None).total, 2);
    assert_eq!(monitor.recent_errors(20).len(), 1);
}

#[tokio::test]
async fn test_reset_rejects_unreadable_bodies_without_touching_state() {
    let cases = [
        (None, r#"{"caller_id":"u1"}"#),
        (Some("application/json"), r#"{"caller_id":"u1""#),
        (Some("application/json"), r#"{"callerId":"u1"}"#),
    ];

    for (content_type, body) in cases {
        let (router, monitor) = seeded_app();
        let status = send_raw(&router, content_type, body).await;
        assert!(status.is_client_error(), "{body} answered {status}");
        assert_untouched(&monitor);
    }
}

#[tokio::test]
async fn test_reset_requires_exactly_one_target() {
    for body in [
        json!({}),
        json!({ "all": false }),
        json!({ "caller_id": "u1", "all": true }),
    ] {
        let (router, monitor) = seeded_app();
        let (status, response) =
            send(&router, Method::POST, "/api/quota/reset", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["code"], "invalid_reset_request");
        assert_untouched(&monitor);
    }

    let (router, monitor) = seeded_app();
    let (status, response) = send(
        &router,
        Method::POST,
        "/api/quota/reset",
        Some(json!({ "caller_id": " " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["code"], "invalid_caller_id");
    assert_untouched(&monitor);
}

#[tokio::test]
async fn test_cleanup_and_listing_endpoints() {
    let (router, monitor, clock) = app();
    monitor.track_usage("u1", "files.list");

    let (_, body) = send(&router, Method::GET, "/api/quota", None).await;
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    clock.advance(chrono::Duration::seconds(100));
    let (status, body) = send(&router, Method::POST, "/api/quota/cleanup", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 2);

    let (_, body) = send(&router, Method::GET, "/api/quota", None).await;
    assert_eq!(body.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_health_check() {
    let (router, _monitor, _clock) = app();
    let (status, body) = send(&router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["per_caller_limit"], 10);
}
