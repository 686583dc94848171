//! Configuration management for the chat gateway.
//!
//! Configuration is read from environment variables (optionally seeded from a
//! `.env` file). Every setting has a default, so an empty environment yields a
//! gateway that listens on port 3001 with auth disabled and no upstream key.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Upstream endpoint used when `UPSTREAM_URL` is not set.
pub const DEFAULT_UPSTREAM_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Longest accepted rate-limit window (one day).
pub const MAX_WINDOW_SECS: u64 = 86_400;

/// Longest accepted upstream timeout (one hour).
pub const MAX_TIMEOUT_SECS: u64 = 3_600;

/// Main gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Server configuration (bind address, CORS, body limit)
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream provider configuration
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Gateway-side bearer token check
    #[serde(default)]
    pub auth: AuthConfig,

    /// Fixed-window rate limiting
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Answer completions locally instead of calling the upstream
    #[serde(default)]
    pub mock_mode: bool,
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origin; any origin when unset
    #[serde(default)]
    pub cors_origin: Option<String>,

    /// Maximum accepted request body size in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Upstream provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Full chat completions URL of the provider
    #[serde(default = "default_upstream_url")]
    pub url: String,

    /// Provider API key; non-mock requests fail with `server_error` when absent
    #[serde(default)]
    pub api_key: Option<String>,

    /// Total timeout for one upstream call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Optional `HTTP-Referer` header sent upstream
    #[serde(default)]
    pub referer: Option<String>,

    /// Optional `X-Title` header sent upstream
    #[serde(default)]
    pub title: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            referer: None,
            title: None,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Gateway bearer token configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Token clients must present as `Authorization: Bearer <token>`
    #[serde(default)]
    pub api_token: Option<String>,
}

/// Fixed-window rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests admitted per client per window
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_upstream_url() -> String {
    DEFAULT_UPSTREAM_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_requests() -> u32 {
    100
}

fn default_window_secs() -> u64 {
    60
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// Empty values count as unset. Numeric variables that fail to parse are
    /// an error rather than being silently replaced by the default.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use chat_gateway::core::config::GatewayConfig;
    ///
    /// let config = GatewayConfig::from_env().expect("Failed to load config");
    /// ```
    pub fn from_env() -> Result<Self> {
        let mut config = GatewayConfig::default();

        if let Some(host) = env_string("HOST") {
            config.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("PORT")? {
            config.server.port = port;
        }
        config.server.cors_origin = env_string("CORS_ORIGIN");
        if let Some(max_body) = env_parse::<usize>("MAX_BODY_BYTES")? {
            config.server.max_body_bytes = max_body;
        }

        config.upstream.api_key = env_string("GROK_KEY");
        if let Some(url) = env_string("UPSTREAM_URL") {
            config.upstream.url = url;
        }
        if let Some(timeout) = env_parse::<u64>("UPSTREAM_TIMEOUT_SECS")? {
            config.upstream.timeout_secs = timeout;
        }
        config.upstream.referer = env_string("OPENROUTER_REFERER");
        config.upstream.title = env_string("OPENROUTER_TITLE");

        config.auth.api_token = env_string("API_TOKEN");
        config.mock_mode = env_string("OPENROUTER_MOCK")
            .map(|v| str_to_bool(&v))
            .unwrap_or(false);

        if let Some(max_requests) = env_parse::<u32>("RATE_LIMIT_MAX_REQUESTS")? {
            config.rate_limit.max_requests = max_requests;
        }
        if let Some(window) = env_parse::<u64>("RATE_LIMIT_WINDOW_SECS")? {
            config.rate_limit.window_secs = window;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the gateway cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.rate_limit.max_requests == 0 {
            bail!("RATE_LIMIT_MAX_REQUESTS must be greater than zero");
        }
        if self.rate_limit.window_secs == 0 {
            bail!("RATE_LIMIT_WINDOW_SECS must be greater than zero");
        }
        if self.rate_limit.window_secs > MAX_WINDOW_SECS {
            bail!(
                "RATE_LIMIT_WINDOW_SECS must be at most {} (got {})",
                MAX_WINDOW_SECS,
                self.rate_limit.window_secs
            );
        }
        if self.upstream.timeout_secs == 0 {
            bail!("UPSTREAM_TIMEOUT_SECS must be greater than zero");
        }
        if self.upstream.timeout_secs > MAX_TIMEOUT_SECS {
            bail!(
                "UPSTREAM_TIMEOUT_SECS must be at most {} (got {})",
                MAX_TIMEOUT_SECS,
                self.upstream.timeout_secs
            );
        }
        Ok(())
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_string(name)
        .map(|raw| {
            raw.parse::<T>()
                .with_context(|| format!("Invalid value for {}: {:?}", name, raw))
        })
        .transpose()
}

/// Convert string to boolean.
fn str_to_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
