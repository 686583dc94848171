//! Gateway bearer-token authorization.
//!
//! Auth is opt-in: when no token is configured every request is allowed.
//! Otherwise the caller must send `Authorization: Bearer <token>` with the
//! exact configured token.

use axum::http::HeaderMap;

use crate::core::error::Result;
use crate::core::GatewayError;

/// Extract Bearer token from an `Authorization` header value.
fn extract_bearer(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ")
}

/// Raw `Authorization` header, if present and valid UTF-8.
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers.get("authorization").and_then(|v| v.to_str().ok())
}

/// Check a provided `Authorization` header against the configured token.
///
/// # Returns
///
/// * `Ok(())` - No token configured, or the bearer token matches exactly
/// * `Err(GatewayError::InvalidApiKey)` - Missing header, wrong scheme, or mismatch
pub fn authorize(configured_secret: Option<&str>, provided_header: Option<&str>) -> Result<()> {
    let Some(secret) = configured_secret else {
        return Ok(());
    };

    match provided_header.and_then(extract_bearer) {
        Some(token) if token == secret => {
            tracing::debug!("Authentication successful");
            Ok(())
        }
        Some(_) => {
            tracing::debug!("Bearer token mismatch");
            Err(GatewayError::InvalidApiKey)
        }
        None => {
            tracing::debug!("Missing or malformed Authorization header");
            Err(GatewayError::InvalidApiKey)
        }
    }
}
