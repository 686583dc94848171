//! Core functionality for the chat gateway.
//!
//! This module contains the pieces every request path depends on:
//! - Configuration management
//! - Error handling
//! - Rate limiting
//! - Logging and metrics
//! - HTTP middleware

pub mod config;
pub mod error;
pub mod error_types;
pub mod logging;
pub mod metrics;
pub mod middleware;
pub mod rate_limiter;

// Re-export commonly used types
pub use config::{AuthConfig, GatewayConfig, RateLimitConfig, ServerConfig, UpstreamConfig};
pub use error::{GatewayError, Result};
pub use error_types::ErrorKind;
pub use logging::{generate_request_id, get_request_id, init_logging, REQUEST_ID};
pub use metrics::{get_metrics, init_metrics, Metrics};
pub use middleware::{extract_client_key, request_id_middleware, MetricsMiddleware};
pub use rate_limiter::{Admission, RateLimitRecord, RateLimiter};
