//! Error types and handling for the chat gateway.
//!
//! This module provides a unified error type [`GatewayError`] covering every
//! way a completion request can be rejected, and implements HTTP response
//! conversion with the OpenAI-style `{"error": {...}}` envelope.

use crate::core::error_types::{ErrorKind, MAX_ERROR_MESSAGE_LEN};
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the gateway.
///
/// Every variant is terminal for the current request: nothing is retried.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The request body is missing, malformed or structurally invalid
    #[error("{0}")]
    InvalidRequest(String),

    /// A gateway token is configured and the caller did not present it
    #[error("Invalid or missing API token")]
    InvalidApiKey,

    /// The caller exhausted its fixed-window quota
    #[error("Too many requests")]
    RateLimited {
        /// Time until the caller's window resets
        retry_after: Duration,
    },

    /// Local misconfiguration, e.g. no upstream key
    #[error("{0}")]
    Server(String),

    /// The upstream answered with a non-success status
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// The upstream could not be reached or its answer could not be read
    #[error("{0}")]
    Network(String),
}

impl GatewayError {
    /// Build an upstream error, coercing statuses outside 400..600 to 500.
    pub fn upstream(status: u16, body: &str) -> Self {
        let status = if (400..600).contains(&status) {
            status
        } else {
            500
        };
        let detail = if body.is_empty() {
            status.to_string()
        } else {
            truncate(body, MAX_ERROR_MESSAGE_LEN)
        };
        GatewayError::Upstream {
            status,
            message: format!("Upstream provider failed: {}", detail),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            GatewayError::InvalidApiKey => ErrorKind::InvalidApiKey,
            GatewayError::RateLimited { .. } => ErrorKind::RateLimit,
            GatewayError::Server(_) => ErrorKind::ServerError,
            GatewayError::Upstream { .. } => ErrorKind::UpstreamError,
            GatewayError::Network(_) => ErrorKind::NetworkError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            GatewayError::Network(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// The `{"error": {...}}` envelope sent to clients.
    pub fn to_body(&self) -> serde_json::Value {
        let kind = self.kind().as_str();
        json!({
            "error": {
                "message": self.to_string(),
                "type": kind,
                "code": kind
            }
        })
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Network(format!("Upstream request timed out: {}", e))
        } else {
            GatewayError::Network(format!("Failed to reach upstream provider: {}", e))
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(self.to_body());
        let mut response = (status, body).into_response();

        if let GatewayError::RateLimited { retry_after } = &self {
            let secs = retry_after.as_secs_f64().ceil().max(1.0) as u64;
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

/// Truncate to at most `max` characters without splitting a code point.
fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Convenience type alias for Results using [`GatewayError`].
pub type Result<T> = std::result::Result<T, GatewayError>;
