//! API layer for the chat gateway.
//!
//! This module contains the completion pipeline and its components, the
//! request/response models, and the HTTP handlers that expose them.

pub mod auth;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod upstream;
pub mod validator;

// Re-export commonly used types
pub use auth::authorize;
pub use gateway::{Gateway, InboundRequest, Stage};
pub use handlers::{build_router, completions, health, metrics_handler, AppState};
pub use models::{
    ChatMessage, CompletionRequest, CompletionResponse, HealthResponse, Role, DEFAULT_MODEL,
};
pub use upstream::UpstreamClient;
pub use validator::validate;
