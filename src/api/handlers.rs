//! HTTP handlers and router for the gateway.
//!
//! Handlers here only translate between HTTP and [`Gateway`]; all pipeline
//! decisions happen in [`Gateway::handle`].

use crate::api::auth::authorization_header;
use crate::api::gateway::{Gateway, InboundRequest};
use crate::api::models::{HealthResponse, HealthStatus};
use crate::core::metrics::render;
use crate::core::middleware::{extract_client_key, request_id_middleware, MetricsMiddleware};
use crate::core::{GatewayError, Result};
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, Method},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

/// Shared application state.
pub struct AppState {
    pub gateway: Gateway,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway,
            started_at: Instant::now(),
        }
    }
}

/// Handle chat completion requests.
///
/// The body is handed to the gateway unread so that rate limiting happens
/// before any bytes are buffered. If the client disconnects, this future is
/// dropped and the in-flight upstream call with it.
pub async fn completions(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<Value>> {
    let peer = connect_info.map(|ConnectInfo(addr)| addr.ip());
    let mut inbound = InboundRequest::new(extract_client_key(&headers, peer));
    inbound.authorization = authorization_header(&headers).map(str::to_string);

    let limit = state.gateway.config().server.max_body_bytes;
    let read_body = async move {
        axum::body::to_bytes(body, limit).await.map_err(|e| {
            tracing::debug!(error = %e, "Failed to read request body");
            GatewayError::InvalidRequest(format!(
                "Failed to read request body (limit {} bytes)",
                limit
            ))
        })
    };

    state.gateway.handle(&inbound, read_body).await.map(Json)
}

/// Health check endpoint.
///
/// Neither route is rate-limited or authenticated; only completions count
/// against a client's quota.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        uptime_ms: state.started_at.elapsed().as_millis() as u64,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        render(),
    )
}

/// CORS policy: the configured origin, or any origin when none is set.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let allow_origin = match origin {
        None => AllowOrigin::any(),
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Invalid CORS_ORIGIN, cross-origin requests disabled");
                AllowOrigin::list(Vec::<HeaderValue>::new())
            }
        },
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(86400))
}

/// Build router with all endpoints.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.gateway.config().server.cors_origin.as_deref());

    Router::new()
        .route("/completions", post(completions))
        .route("/api/v1/chat/completions", post(completions))
        .route("/health", get(health))
        .route("/api/v1/chat/health", get(health))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(MetricsMiddleware::track_metrics))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GatewayConfig;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app(configure: impl FnOnce(&mut GatewayConfig)) -> Router {
        let mut config = GatewayConfig::default();
        configure(&mut config);
        let gateway = Gateway::new(config).unwrap();
        build_router(Arc::new(AppState::new(gateway)))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_fields() {
        let response = app(|_| {})
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert!(json["uptime_ms"].is_u64());
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
        let ts = json["timestamp"].as_str().unwrap();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }

    #[tokio::test]
    async fn test_security_headers_present() {
        let response = app(|_| {})
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(response.headers()["x-frame-options"], "SAMEORIGIN");
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_body_over_limit_is_invalid_request() {
        let response = app(|c| {
            c.mock_mode = true;
            c.server.max_body_bytes = 16;
        })
        .oneshot(
            Request::post("/completions")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"messages":[{"role":"user","content":"this is far too long"}]}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["type"], "invalid_request_error");
    }

    #[tokio::test]
    async fn test_cors_preflight_uses_configured_origin() {
        let response = app(|c| c.server.cors_origin = Some("https://chat.example".to_string()))
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/completions")
                    .header("origin", "https://chat.example")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "https://chat.example"
        );
        assert_eq!(response.headers()["access-control-max-age"], "86400");
    }

    fn endpoint_labels(family_name: &str) -> Vec<String> {
        prometheus::gather()
            .iter()
            .filter(|family| family.get_name() == family_name)
            .flat_map(|family| family.get_metric().to_vec())
            .flat_map(|metric| metric.get_label().to_vec())
            .filter(|label| label.get_name() == "endpoint")
            .map(|label| label.get_value().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_unknown_paths_share_one_metrics_series() {
        let router = app(|_| {});
        for path in ["/junk-one", "/junk-two"] {
            let response = router
                .clone()
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }

        let unmatched = crate::core::get_metrics()
            .request_count
            .with_label_values(&["unmatched", "404"])
            .get();
        assert!(unmatched >= 2);

        for family in [
            "chat_gateway_requests_total",
            "chat_gateway_request_duration_seconds",
        ] {
            let labels = endpoint_labels(family);
            assert!(!labels.iter().any(|l| l.starts_with("/junk-")), "{:?}", labels);
        }
    }

    #[tokio::test]
    async fn test_metrics_use_route_template() {
        let router = app(|_| {});
        router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let labels = endpoint_labels("chat_gateway_requests_total");
        assert!(labels.iter().any(|l| l == "/health"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let response = app(|_| {})
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
