//! Chat Gateway - an OpenAI-compatible chat completions gateway
//!
//! The gateway accepts `POST /completions` requests in the OpenAI chat format
//! and forwards them to a single upstream provider, with:
//!
//! - **Fixed-window rate limiting** per client key (forwarded IP, real IP, or peer address)
//! - **Structural validation** of the request body before anything else touches it
//! - **Optional bearer-token auth** against a configured gateway token
//! - **Mock mode** that answers locally for development and tests
//! - **Normalized errors** in a single `{"error": {message, type, code}}` envelope
//!
//! # Architecture
//!
//! - [`core`]: Configuration, errors, rate limiting, logging, metrics, middleware
//! - [`api`]: The completion pipeline ([`api::Gateway`]), its components, and HTTP handlers
//!
//! # Configuration
//!
//! All settings come from environment variables; see [`core::config::GatewayConfig::from_env`].
//! The most relevant are:
//! - `GROK_KEY`: Upstream provider API key
//! - `API_TOKEN`: Gateway bearer token (auth disabled when unset)
//! - `OPENROUTER_MOCK`: Answer locally instead of calling the upstream
//! - `PORT`: Server port (default: 3001)

pub mod api;
pub mod core;

// Re-export commonly used types for convenience
pub use api::{build_router, AppState, Gateway, InboundRequest};
pub use core::{GatewayConfig, GatewayError, RateLimiter, Result};
