//! The completion pipeline.
//!
//! Every completion request, whether it arrives over HTTP or from an
//! in-process caller, runs through [`Gateway::handle`]:
//!
//! ```text
//! received -> rate_checked -> validated -> mock short-circuit
//!                                       \-> authorized -> forwarded
//! ```
//!
//! Any rejection ends the request immediately; nothing is retried.

use bytes::Bytes;
use serde_json::Value;
use std::fmt;
use std::future::Future;

use crate::api::auth::authorize;
use crate::api::models::CompletionResponse;
use crate::api::upstream::UpstreamClient;
use crate::api::validator::validate;
use crate::core::metrics::record_rejection;
use crate::core::{GatewayConfig, GatewayError, RateLimiter, Result};

/// Caller identity and credentials, independent of the transport.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    /// Rate-limit bucket for the caller
    pub client_key: String,
    /// Raw `Authorization` header value, if any
    pub authorization: Option<String>,
}

impl InboundRequest {
    pub fn new(client_key: impl Into<String>) -> Self {
        Self {
            client_key: client_key.into(),
            authorization: None,
        }
    }

    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }
}

/// Last pipeline stage a request reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    RateChecked,
    Validated,
    MockShortCircuit,
    Authorized,
    Forwarded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::RateChecked => "rate_checked",
            Stage::Validated => "validated",
            Stage::MockShortCircuit => "mock_short_circuit",
            Stage::Authorized => "authorized",
            Stage::Forwarded => "forwarded",
        };
        f.write_str(name)
    }
}

/// Owns the rate-limit table and the upstream client for one process.
pub struct Gateway {
    config: GatewayConfig,
    rate_limiter: RateLimiter,
    upstream: UpstreamClient,
}

impl Gateway {
    /// Build a gateway with a fresh rate-limit table and HTTP client.
    pub fn new(config: GatewayConfig) -> anyhow::Result<Self> {
        let rate_limiter = RateLimiter::from_config(&config.rate_limit);
        let upstream = UpstreamClient::new(&config.upstream)?;
        Ok(Self::with_parts(config, rate_limiter, upstream))
    }

    pub fn with_parts(
        config: GatewayConfig,
        rate_limiter: RateLimiter,
        upstream: UpstreamClient,
    ) -> Self {
        Self {
            config,
            rate_limiter,
            upstream,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Run one completion request through the pipeline.
    ///
    /// `body` is only awaited after the caller has been admitted by the rate
    /// limiter, so rejected callers never cost a body read.
    pub async fn handle<F>(&self, inbound: &InboundRequest, body: F) -> Result<Value>
    where
        F: Future<Output = Result<Bytes>>,
    {
        let mut stage = Stage::Received;
        let result = self.run(inbound, body, &mut stage).await;

        match &result {
            Ok(_) => tracing::debug!(
                client_key = %inbound.client_key,
                stage = %stage,
                "Completion request served"
            ),
            Err(e) => {
                record_rejection(e.kind());
                tracing::info!(
                    client_key = %inbound.client_key,
                    stage = %stage,
                    kind = %e.kind(),
                    status = e.status().as_u16(),
                    error = %e,
                    "Completion request rejected"
                );
            }
        }

        result
    }

    /// [`Gateway::handle`] for a body that is already in memory.
    pub async fn handle_bytes(
        &self,
        inbound: &InboundRequest,
        body: impl Into<Bytes>,
    ) -> Result<Value> {
        let body = body.into();
        self.handle(inbound, async move { Ok::<_, GatewayError>(body) })
            .await
    }

    async fn run<F>(&self, inbound: &InboundRequest, body: F, stage: &mut Stage) -> Result<Value>
    where
        F: Future<Output = Result<Bytes>>,
    {
        self.rate_limiter.admit(&inbound.client_key).into_result()?;
        *stage = Stage::RateChecked;

        let raw = body.await?;
        let request = validate(&raw)?;
        *stage = Stage::Validated;

        if self.config.mock_mode {
            *stage = Stage::MockShortCircuit;
            let response = CompletionResponse::mock(request.effective_model());
            return serde_json::to_value(response).map_err(|e| {
                GatewayError::Server(format!("Failed to serialize mock response: {}", e))
            });
        }

        authorize(
            self.config.auth.api_token.as_deref(),
            inbound.authorization.as_deref(),
        )?;
        *stage = Stage::Authorized;

        let api_key = self
            .config
            .upstream
            .api_key
            .as_deref()
            .ok_or_else(|| GatewayError::Server("Missing GROK_KEY.".to_string()))?;

        let response = self.upstream.forward(&request, api_key).await?;
        *stage = Stage::Forwarded;
        Ok(response)
    }
}
