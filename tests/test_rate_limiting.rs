//! Tests for per-client fixed-window rate limiting.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chat_gateway::{
    build_router, AppState, Gateway, GatewayConfig, GatewayError, InboundRequest, RateLimiter,
};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceExt;

fn mock_gateway(max_requests: u32, window_secs: u64) -> Gateway {
    let mut config = GatewayConfig::default();
    config.mock_mode = true;
    config.rate_limit.max_requests = max_requests;
    config.rate_limit.window_secs = window_secs;
    Gateway::new(config).expect("Failed to build gateway")
}

fn app(gateway: Gateway) -> Router {
    build_router(Arc::new(AppState::new(gateway)))
}

fn request_from(headers: &[(&str, &str)]) -> Request<Body> {
    let mut builder = Request::builder()
        .uri("/completions")
        .method("POST")
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder
        .body(Body::from(
            json!({"messages": [{"role": "user", "content": "hi"}]}).to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn test_101st_request_in_window_is_rejected() {
    let app = app(mock_gateway(100, 60));

    for i in 0..100 {
        let response = app
            .clone()
            .oneshot(request_from(&[("x-forwarded-for", "198.51.100.7")]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "request {} should pass", i + 1);
    }

    let response = app
        .oneshot(request_from(&[("x-forwarded-for", "198.51.100.7")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["type"], "rate_limit_error");
    assert_eq!(json["error"]["message"], "Too many requests");
}

#[tokio::test]
async fn test_rate_limit_precedes_validation() {
    let app = app(mock_gateway(1, 60));
    let ip = [("x-real-ip", "198.51.100.8")];

    let response = app.clone().oneshot(request_from(&ip)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Second request is malformed, but quota is checked first
    let malformed = Request::builder()
        .uri("/completions")
        .method("POST")
        .header("x-real-ip", "198.51.100.8")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.oneshot(malformed).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_forwarded_and_real_ip_buckets_are_separate() {
    let app = app(mock_gateway(1, 60));

    let first = app
        .clone()
        .oneshot(request_from(&[("x-forwarded-for", "203.0.113.1")]))
        .await
        .unwrap();
    let second = app
        .clone()
        .oneshot(request_from(&[("x-forwarded-for", "203.0.113.2")]))
        .await
        .unwrap();
    let repeat = app
        .oneshot(request_from(&[("x-forwarded-for", "203.0.113.1, 10.0.0.1")]))
        .await
        .unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(repeat.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_unidentified_clients_share_unknown_bucket() {
    let gateway = mock_gateway(2, 60);
    let state = Arc::new(AppState::new(gateway));
    let app = build_router(state.clone());

    for _ in 0..2 {
        let response = app.clone().oneshot(request_from(&[])).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let response = app.oneshot(request_from(&[])).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let record = state.gateway.rate_limiter().record("unknown").unwrap();
    assert_eq!(record.count, 2);
}

#[tokio::test]
async fn test_window_expiry_readmits_client() {
    let limiter = RateLimiter::new(2, Duration::from_secs(60));
    let start = Instant::now();

    assert!(limiter.admit_at("k", start).is_allowed());
    assert!(limiter.admit_at("k", start).is_allowed());
    assert!(!limiter.admit_at("k", start + Duration::from_secs(30)).is_allowed());
    assert!(limiter
        .admit_at("k", start + Duration::from_secs(61))
        .is_allowed());
}

#[tokio::test]
async fn test_short_window_expires_in_real_time() {
    let mut config = GatewayConfig::default();
    config.mock_mode = true;
    config.rate_limit.max_requests = 1;
    config.rate_limit.window_secs = 1;
    let gateway = Gateway::new(config).unwrap();
    let inbound = InboundRequest::new("sleepy");
    let body = json!({"messages": [{"role": "user", "content": "hi"}]}).to_string();

    assert!(gateway.handle_bytes(&inbound, body.clone()).await.is_ok());
    assert!(matches!(
        gateway.handle_bytes(&inbound, body.clone()).await,
        Err(GatewayError::RateLimited { .. })
    ));

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(gateway.handle_bytes(&inbound, body).await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_respect_capacity() {
    let gateway = Arc::new(mock_gateway(50, 60));
    let body = json!({"messages": [{"role": "user", "content": "hi"}]}).to_string();

    let tasks: Vec<_> = (0..200)
        .map(|_| {
            let gateway = gateway.clone();
            let body = body.clone();
            tokio::spawn(async move {
                gateway
                    .handle_bytes(&InboundRequest::new("burst"), body)
                    .await
                    .is_ok()
            })
        })
        .collect();

    let mut allowed = 0;
    for task in tasks {
        if task.await.unwrap() {
            allowed += 1;
        }
    }

    assert_eq!(allowed, 50);
}
