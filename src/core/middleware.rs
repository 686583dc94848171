//! HTTP middleware for request ids, metrics, and client identification.

use crate::core::logging::{generate_request_id, REQUEST_ID};
use crate::core::metrics::get_metrics;
use axum::{
    extract::{MatchedPath, Request},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::net::IpAddr;
use std::time::Instant;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Metrics label for requests that matched no route.
pub const UNMATCHED_ENDPOINT: &str = "unmatched";

/// Rate-limit bucket shared by every caller whose identity cannot be resolved.
pub const UNKNOWN_CLIENT: &str = "unknown";

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Resolve the rate-limit key for a caller.
///
/// Order: first hop of `X-Forwarded-For`, then `X-Real-IP`, then the TCP peer
/// address, then [`UNKNOWN_CLIENT`]. Forwarded headers are taken at face value,
/// so the gateway must sit behind a proxy that overwrites them.
pub fn extract_client_key(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    if let Some(first_hop) = header_value(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first_hop.to_string();
    }

    if let Some(real_ip) = header_value(headers, "x-real-ip") {
        return real_ip.to_string();
    }

    match peer {
        Some(ip) => ip.to_string(),
        None => UNKNOWN_CLIENT.to_string(),
    }
}

/// Assign a request id, run the request inside its scope, and echo it back.
///
/// A well-formed inbound `x-request-id` is reused so ids can be correlated
/// across hops.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = header_value(request.headers(), REQUEST_ID_HEADER)
        .filter(|v| v.len() <= 128)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let mut response = REQUEST_ID
        .scope(request_id.clone(), next.run(request))
        .await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Middleware for tracking request metrics.
pub struct MetricsMiddleware;

impl MetricsMiddleware {
    /// Record request count and duration, and log one line per request.
    ///
    /// Series are labelled by route template, never by the raw path, so the
    /// label set stays bounded by the router.
    pub async fn track_metrics(request: Request, next: Next) -> Response {
        let endpoint = request
            .extensions()
            .get::<MatchedPath>()
            .map(|p| p.as_str().to_string())
            .unwrap_or_else(|| UNMATCHED_ENDPOINT.to_string());
        let path = request.uri().path().to_string();
        let method = request.method().to_string();

        // Skip metrics endpoint itself to avoid recursion
        if endpoint == "/metrics" {
            return next.run(request).await;
        }

        let start = Instant::now();
        let response = next.run(request).await;
        let duration = start.elapsed().as_secs_f64();
        let status_code = response.status().as_u16().to_string();

        let metrics = get_metrics();
        metrics
            .request_count
            .with_label_values(&[&endpoint, &status_code])
            .inc();
        metrics
            .request_duration
            .with_label_values(&[&endpoint])
            .observe(duration);

        tracing::info!(
            "{} {} - status={} duration={:.3}s",
            method,
            path,
            status_code,
            duration
        );

        response
    }
}
