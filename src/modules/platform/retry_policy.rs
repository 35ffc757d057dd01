//! Retry policy for calls against the admin API.
//!
//! Classifies each outcome and sizes the delay before the next attempt:
//! a 429 honors the server's Retry-After verbatim, server and network errors
//! back off exponentially with bounded jitter, other 4xx never retry.
use rand::Rng;
use std::time::Duration;

/// Configuration for outbound retry behavior
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retry attempts on top of the initial call
    pub max_retries: u32,
    /// Base delay for the first backoff
    pub base_delay: Duration,
    /// Ceiling for any computed or server-advertised delay
    pub max_delay: Duration,
    /// Multiplier applied per attempt (2.0 doubles each time)
    pub backoff_multiplier: f64,
    /// Upper bound of the random jitter added to backoff delays
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            max_jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based).
    ///
    /// A server-advertised delay wins verbatim, capped at `max_delay`;
    /// otherwise exponential backoff plus random jitter.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(server_delay) = retry_after {
            return server_delay.min(self.max_delay);
        }

        let multiplier = self.backoff_multiplier.powi(attempt as i32);
        let backoff =
            Duration::from_millis((self.base_delay.as_millis() as f64 * multiplier) as u64);
        let jitter = if self.max_jitter.is_zero() {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=self.max_jitter.as_millis() as u64))
        };

        (backoff + jitter).min(self.max_delay)
    }
}

/// Rate-limit directives extracted from a 429 response.
#[derive(Debug, Clone, Default)]
pub struct RateLimitInfo {
    /// Parsed Retry-After value, a duration rather than a raw header string.
    pub retry_after: Option<Duration>,
}

impl RateLimitInfo {
    pub fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        // The platform sends Retry-After as fractional seconds, e.g. "2.0".
        let retry_after = headers
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|secs| *secs >= 0.0)
            .map(Duration::from_secs_f64);

        Self { retry_after }
    }
}

/// Classification of one call attempt's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retryability {
    /// Retry after the advertised or computed delay.
    RateLimited,
    /// Retry with backoff (5xx, timeouts, connection failures).
    Transient,
    /// Surface immediately (validation/auth 4xx).
    Fatal,
}

pub fn classify_status(status: reqwest::StatusCode) -> Retryability {
    match status.as_u16() {
        429 => Retryability::RateLimited,
        500..=599 => Retryability::Transient,
        408 => Retryability::Transient,
        _ => Retryability::Fatal,
    }
}

pub fn is_retryable_transport(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}
