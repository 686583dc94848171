//! Shared constants for structured API errors.

use std::fmt;

pub const ERROR_TYPE_INVALID_REQUEST: &str = "invalid_request_error";
pub const ERROR_TYPE_INVALID_API_KEY: &str = "invalid_api_key";
pub const ERROR_TYPE_RATE_LIMIT: &str = "rate_limit_error";
pub const ERROR_TYPE_SERVER: &str = "server_error";
pub const ERROR_TYPE_UPSTREAM: &str = "upstream_error";
pub const ERROR_TYPE_NETWORK: &str = "network_error";

/// Upper bound on how much of an upstream error body is echoed to clients.
pub const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Classification of every failure the gateway can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRequest,
    InvalidApiKey,
    RateLimit,
    ServerError,
    UpstreamError,
    NetworkError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 6] = [
        Self::InvalidRequest,
        Self::InvalidApiKey,
        Self::RateLimit,
        Self::ServerError,
        Self::UpstreamError,
        Self::NetworkError,
    ];

    /// Wire string used for both `error.type` and `error.code`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidRequest => ERROR_TYPE_INVALID_REQUEST,
            Self::InvalidApiKey => ERROR_TYPE_INVALID_API_KEY,
            Self::RateLimit => ERROR_TYPE_RATE_LIMIT,
            Self::ServerError => ERROR_TYPE_SERVER,
            Self::UpstreamError => ERROR_TYPE_UPSTREAM,
            Self::NetworkError => ERROR_TYPE_NETWORK,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
