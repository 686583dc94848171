//! Upstream provider client.
//!
//! Builds the outbound chat completion call, sends it to the single configured
//! provider endpoint, and classifies the outcome into a passthrough JSON body
//! or a [`GatewayError`].

use anyhow::Context;
use serde_json::Value;
use std::error::Error;
use std::time::{Duration, Instant};

use crate::api::models::CompletionRequest;
use crate::core::config::UpstreamConfig;
use crate::core::metrics::get_metrics;
use crate::core::{GatewayError, Result};

/// Client for the configured upstream provider.
#[derive(Clone)]
pub struct UpstreamClient {
    http_client: reqwest::Client,
    url: String,
    referer: Option<String>,
    title: Option<String>,
}

/// Create HTTP client with connection pooling and an explicit total timeout.
pub fn create_http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(32)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .context("Failed to build HTTP client")
}

impl UpstreamClient {
    /// Build a client with its own connection pool from configuration.
    pub fn new(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let http_client = create_http_client(config.timeout())?;
        Ok(Self::with_client(config, http_client))
    }

    /// Build a client around an existing `reqwest::Client`.
    pub fn with_client(config: &UpstreamConfig, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            url: config.url.clone(),
            referer: config.referer.clone(),
            title: config.title.clone(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Build the provider request: bearer auth, JSON body, optional
    /// `HTTP-Referer`/`X-Title` headers.
    pub fn build_request(&self, payload: &Value, api_key: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .http_client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", api_key));

        if let Some(referer) = &self.referer {
            request = request.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.title {
            request = request.header("X-Title", title);
        }

        // .json() also sets Content-Type: application/json
        request.json(payload)
    }

    /// Forward a validated request and classify the provider's answer.
    ///
    /// * transport failure or timeout → `network_error` (502)
    /// * non-2xx status → `upstream_error`, status mirrored when 4xx/5xx
    /// * 2xx with a body that is not JSON → `network_error` (502)
    /// * 2xx JSON → returned unmodified
    pub async fn forward(&self, request: &CompletionRequest, api_key: &str) -> Result<Value> {
        let payload = request.to_upstream_payload();
        let model = request.effective_model();
        let start = Instant::now();

        tracing::debug!(url = %self.url, model = %model, "Forwarding completion request upstream");

        let result = self.send(&payload, api_key).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind().as_str(),
        };
        get_metrics()
            .upstream_duration
            .with_label_values(&[outcome])
            .observe(start.elapsed().as_secs_f64());

        result
    }

    async fn send(&self, payload: &Value, api_key: &str) -> Result<Value> {
        let response = self
            .build_request(payload, api_key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    url = %self.url,
                    error = %e,
                    error_source = ?e.source(),
                    is_timeout = e.is_timeout(),
                    is_connect = e.is_connect(),
                    "HTTP request failed to upstream"
                );
                GatewayError::from(e)
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            tracing::error!(url = %self.url, error = %e, "Failed to read upstream response body");
            GatewayError::from(e)
        })?;

        if !status.is_success() {
            tracing::warn!(
                url = %self.url,
                status = status.as_u16(),
                "Upstream returned error status"
            );
            return Err(GatewayError::upstream(status.as_u16(), &text));
        }

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(url = %self.url, error = %e, "Upstream returned invalid JSON");
            GatewayError::Network(format!("Failed to parse upstream response: {}", e))
        })
    }
}
