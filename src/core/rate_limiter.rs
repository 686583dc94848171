//! Fixed-window rate limiting keyed by client identity.
//!
//! Each client key owns one [`RateLimitRecord`]. A record is created on the
//! first request from a key, counts requests until its window ends, and is
//! overwritten (never deleted) by the first request after expiry. Records are
//! not evicted in the background, so the table grows with the number of
//! distinct keys seen during the process lifetime.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

use crate::core::config::RateLimitConfig;
use crate::core::error::GatewayError;

/// Reset horizon used when `now + window` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Counter state for a single client key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    /// Requests admitted in the current window
    pub count: u32,
    /// Instant after which the window is considered expired
    pub window_reset_at: Instant,
}

impl RateLimitRecord {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.window_reset_at
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allow,
    Deny {
        /// Time remaining until the caller's window resets
        retry_after: Duration,
    },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allow)
    }

    /// Convert a denial into the gateway's `rate_limit` error.
    pub fn into_result(self) -> Result<(), GatewayError> {
        match self {
            Admission::Allow => Ok(()),
            Admission::Deny { retry_after } => Err(GatewayError::RateLimited { retry_after }),
        }
    }
}

/// Per-client fixed-window rate limiter.
///
/// Admission for a key runs while holding that key's map entry, so two
/// concurrent requests from the same client cannot both observe a count
/// below capacity and both increment past it.
pub struct RateLimiter {
    records: DashMap<String, RateLimitRecord>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    /// Create a limiter admitting `max_requests` per `window` for each key.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            records: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.window())
    }

    /// Admit or deny one request from `client_key` at the current time.
    pub fn admit(&self, client_key: &str) -> Admission {
        self.admit_at(client_key, Instant::now())
    }

    /// Admit or deny one request from `client_key` as of `now`.
    pub fn admit_at(&self, client_key: &str, now: Instant) -> Admission {
        let window_reset_at = now
            .checked_add(self.window)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        let fresh = RateLimitRecord {
            count: 1,
            window_reset_at,
        };

        match self.records.entry(client_key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(fresh);
                Admission::Allow
            }
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                if record.is_expired(now) {
                    *record = fresh;
                    Admission::Allow
                } else if record.count < self.max_requests {
                    record.count += 1;
                    Admission::Allow
                } else {
                    let retry_after = record.window_reset_at.saturating_duration_since(now);
                    tracing::warn!(
                        client_key = %client_key,
                        count = record.count,
                        retry_after_ms = retry_after.as_millis() as u64,
                        "Rate limit exceeded"
                    );
                    Admission::Deny { retry_after }
                }
            }
        }
    }

    /// Snapshot of the record for `client_key`, expired or not.
    pub fn record(&self, client_key: &str) -> Option<RateLimitRecord> {
        self.records.get(client_key).map(|r| *r)
    }

    /// Number of records held, including expired ones.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}
