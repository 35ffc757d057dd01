//! Environment-driven tunables for the bulk-operation core.
//!
//! Values are read once at startup from the process environment (with an
//! optional `.env` file via dotenvy). Defaults match the platform's published
//! throughput ceiling of 4 calls/second.
use std::time::Duration;

/// Knobs for the processor, the outbound client, and the throttle instances.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Items per batch inside a bulk job.
    pub batch_size: usize,
    /// Sustained outbound calls per second against the admin API.
    pub outbound_calls_per_second: f64,
    /// Retry attempts per outbound call, on top of the initial attempt.
    pub max_retries: u32,
    /// Inbound requests admitted per key per window.
    pub inbound_max_requests: u32,
    /// Bulk-job creations admitted per tenant per window.
    pub bulk_creation_max_requests: u32,
    /// Export requests admitted per tenant per window.
    pub export_max_requests: u32,
    /// Outbound admin-API calls admitted per tenant per window.
    pub outbound_max_requests: u32,
    /// Window length shared by the throttle instances.
    pub throttle_window: Duration,
    /// How often the background sweep drops elapsed windows.
    pub sweep_interval: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            outbound_calls_per_second: 4.0,
            max_retries: 3,
            inbound_max_requests: 60,
            bulk_creation_max_requests: 10,
            export_max_requests: 5,
            outbound_max_requests: 240,
            throttle_window: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl CoreConfig {
    /// Build from the environment, falling back to defaults for anything
    /// unset or unparsable.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Self {
            batch_size: env_parse("REPRICER_BATCH_SIZE", defaults.batch_size),
            outbound_calls_per_second: env_parse(
                "REPRICER_OUTBOUND_CALLS_PER_SECOND",
                defaults.outbound_calls_per_second,
            ),
            max_retries: env_parse("REPRICER_MAX_RETRIES", defaults.max_retries),
            inbound_max_requests: env_parse(
                "REPRICER_INBOUND_MAX_REQUESTS",
                defaults.inbound_max_requests,
            ),
            bulk_creation_max_requests: env_parse(
                "REPRICER_BULK_CREATION_MAX_REQUESTS",
                defaults.bulk_creation_max_requests,
            ),
            export_max_requests: env_parse(
                "REPRICER_EXPORT_MAX_REQUESTS",
                defaults.export_max_requests,
            ),
            outbound_max_requests: env_parse(
                "REPRICER_OUTBOUND_MAX_REQUESTS",
                defaults.outbound_max_requests,
            ),
            throttle_window: Duration::from_secs(env_parse(
                "REPRICER_THROTTLE_WINDOW_SECS",
                defaults.throttle_window.as_secs(),
            )),
            sweep_interval: Duration::from_secs(env_parse(
                "REPRICER_SWEEP_INTERVAL_SECS",
                defaults.sweep_interval.as_secs(),
            )),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
