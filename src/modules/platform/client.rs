//! Admin API client with pacing, throttling, and retry logic.
//!
//! One client per tenant, bound to one set of credentials. The platform has
//! no bulk-mutation primitive, so `bulk_update` is N sequential single-item
//! mutations; the inter-call pacing is what keeps the whole pipeline under
//! the platform's throughput ceiling, so it must never be parallelized away.
use crate::modules::jobs::domain::entities::BatchResult;
use crate::modules::platform::credentials::TenantCredentials;
use crate::modules::platform::dto::GraphQlResponse;
use crate::modules::platform::graphql::AdminQueries;
use crate::modules::platform::retry_policy::{
    classify_status, is_retryable_transport, RateLimitInfo, RetryPolicy, Retryability,
};
use crate::modules::platform::traits::{GatewayFactory, PlatformGateway};
use crate::modules::throttle::FixedWindowThrottle;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::events::{CoreEvent, EventSink};
use async_trait::async_trait;
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use reqwest::{Client, Response};
use serde_json::json;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const API_VERSION: &str = "2024-01";
const USER_AGENT: &str = "repricer/1.0";

type Pacer = GovernorRateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
    governor::middleware::NoOpMiddleware,
>;

/// How a single item's update failed, keeping transport, rate-limit, and
/// application-level validation outcomes apart for the batch aggregation.
#[derive(Debug, Clone)]
enum ItemFailure {
    Validation {
        field: Option<String>,
        message: String,
    },
    Transport {
        message: String,
    },
    RateLimited {
        retry_after: Duration,
    },
}

/// What one dispatched attempt came back with, before any retry handling.
#[derive(Debug, Clone)]
enum AttemptOutcome {
    /// 2xx with a clean payload.
    Delivered,
    /// 2xx carrying userErrors; caller-fixable, never retried.
    Rejected {
        field: Option<String>,
        message: String,
    },
    /// Non-2xx status, with any advertised Retry-After already parsed.
    Http {
        status: reqwest::StatusCode,
        retry_after: Option<Duration>,
    },
    /// The request never produced a usable response.
    Network {
        message: String,
        retryable: bool,
    },
    /// 2xx whose body could not be understood; fatal, not worth retrying.
    Malformed {
        message: String,
    },
}

pub struct AdminApiClient {
    http: Client,
    credentials: TenantCredentials,
    endpoint: String,
    retry_policy: RetryPolicy,
    pacer: Pacer,
    outbound_throttle: Arc<FixedWindowThrottle>,
    events: Arc<dyn EventSink>,
}

impl AdminApiClient {
    pub fn new(
        credentials: TenantCredentials,
        retry_policy: RetryPolicy,
        calls_per_second: f64,
        outbound_throttle: Arc<FixedWindowThrottle>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let endpoint = format!(
            "https://{}/admin/api/{}/graphql.json",
            credentials.shop_domain, API_VERSION
        );

        Self {
            http: Client::new(),
            credentials,
            endpoint,
            retry_policy,
            pacer: Self::create_pacer(calls_per_second),
            outbound_throttle,
            events,
        }
    }

    /// One-permit-per-period limiter enforcing the fixed inter-call delay
    /// (4 calls/second means a 250ms period, no burst).
    fn create_pacer(calls_per_second: f64) -> Pacer {
        let period = if calls_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / calls_per_second).max(Duration::from_millis(1))
        } else {
            Duration::from_secs(3600)
        };

        let burst = NonZeroU32::new(1).unwrap();
        // `with_period` only rejects a zero period, which the clamp rules out.
        let quota = Quota::with_period(period).unwrap().allow_burst(burst);
        GovernorRateLimiter::direct(quota)
    }

    /// Update one variant, retrying per policy. Validation failures from the
    /// API surface as `ValidationError` and are never retried.
    pub async fn update_variant(&self, item_id: &str, value: &str) -> AppResult<()> {
        self.try_update(item_id, value)
            .await
            .map_err(|failure| match failure {
                ItemFailure::Validation { field, message } => match field {
                    Some(field) => AppError::ValidationError(format!("{}: {}", field, message)),
                    None => AppError::ValidationError(message),
                },
                ItemFailure::Transport { message } => AppError::TransportError(message),
                ItemFailure::RateLimited { retry_after } => {
                    AppError::RateLimited { retry_after }
                }
            })
    }

    async fn try_update(&self, item_id: &str, value: &str) -> Result<(), ItemFailure> {
        self.drive_attempts(item_id, || self.attempt(item_id, value))
            .await
    }

    /// One dispatch plus response interpretation, no retry handling.
    async fn attempt(&self, item_id: &str, value: &str) -> AttemptOutcome {
        match self.dispatch(item_id, value).await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return self.interpret(response).await;
                }
                let info = RateLimitInfo::from_headers(response.headers());
                AttemptOutcome::Http {
                    status,
                    retry_after: info.retry_after,
                }
            }
            Err(e) => AttemptOutcome::Network {
                retryable: is_retryable_transport(&e),
                message: e.to_string(),
            },
        }
    }

    /// The retry loop, fed attempt outcomes so the policy composition is
    /// testable without a live endpoint.
    async fn drive_attempts<F, Fut>(
        &self,
        item_id: &str,
        mut attempt: F,
    ) -> Result<(), ItemFailure>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = AttemptOutcome>,
    {
        let mut last_failure = ItemFailure::Transport {
            message: "request was never dispatched".to_string(),
        };

        for attempt_index in 0..=self.retry_policy.max_retries {
            // Pacing and the shared outbound throttle apply to every attempt;
            // retries never bypass them.
            self.admit().await;

            match attempt().await {
                AttemptOutcome::Delivered => return Ok(()),
                AttemptOutcome::Rejected { field, message } => {
                    return Err(ItemFailure::Validation { field, message });
                }
                AttemptOutcome::Malformed { message } => {
                    return Err(ItemFailure::Transport { message });
                }
                AttemptOutcome::Http {
                    status,
                    retry_after,
                } => match classify_status(status) {
                    Retryability::RateLimited => {
                        let delay = self.retry_policy.delay_for(attempt_index, retry_after);
                        last_failure = ItemFailure::RateLimited { retry_after: delay };
                        if attempt_index < self.retry_policy.max_retries {
                            self.events.emit(CoreEvent::RetryScheduled {
                                item_id: item_id.to_string(),
                                attempt: attempt_index + 1,
                                delay,
                            });
                            sleep(delay).await;
                        }
                    }
                    Retryability::Transient => {
                        last_failure = ItemFailure::Transport {
                            message: format!("admin API returned HTTP {}", status),
                        };
                        if attempt_index < self.retry_policy.max_retries {
                            let delay = self.retry_policy.delay_for(attempt_index, None);
                            self.events.emit(CoreEvent::RetryScheduled {
                                item_id: item_id.to_string(),
                                attempt: attempt_index + 1,
                                delay,
                            });
                            sleep(delay).await;
                        }
                    }
                    Retryability::Fatal => {
                        // 4xx other than 429: caller-fixable, single attempt.
                        return Err(ItemFailure::Transport {
                            message: format!("admin API rejected the request (HTTP {})", status),
                        });
                    }
                },
                AttemptOutcome::Network { message, retryable } => {
                    if !retryable {
                        return Err(ItemFailure::Transport { message });
                    }
                    last_failure = ItemFailure::Transport { message };
                    if attempt_index < self.retry_policy.max_retries {
                        let delay = self.retry_policy.delay_for(attempt_index, None);
                        self.events.emit(CoreEvent::RetryScheduled {
                            item_id: item_id.to_string(),
                            attempt: attempt_index + 1,
                            delay,
                        });
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_failure)
    }

    /// Wait for the pacer, then loop on the outbound throttle until admitted.
    async fn admit(&self) {
        self.pacer.until_ready().await;

        loop {
            match self.outbound_throttle.check(&self.credentials.shop_domain) {
                Ok(_) => return,
                Err(AppError::RateLimited { retry_after }) => {
                    self.events.emit(CoreEvent::ThrottleRejected {
                        throttle: self.outbound_throttle.name(),
                        key: self.credentials.shop_domain.clone(),
                        retry_after,
                    });
                    sleep(retry_after.max(Duration::from_millis(5))).await;
                }
                Err(_) => return,
            }
        }
    }

    async fn dispatch(&self, item_id: &str, value: &str) -> Result<Response, reqwest::Error> {
        let body = json!({
            "query": AdminQueries::variant_update(),
            "variables": AdminQueries::variant_update_variables(item_id, value),
        });

        self.http
            .post(&self.endpoint)
            .header("X-Shopify-Access-Token", &self.credentials.access_token)
            .header("User-Agent", USER_AGENT)
            .json(&body)
            .send()
            .await
    }

    async fn interpret(&self, response: Response) -> AttemptOutcome {
        let body: GraphQlResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                return AttemptOutcome::Malformed {
                    message: format!("failed to read admin API response: {}", e),
                }
            }
        };

        if let Some(errors) = body.errors {
            if !errors.is_empty() {
                let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
                return AttemptOutcome::Malformed {
                    message: format!("GraphQL errors: {}", messages.join("; ")),
                };
            }
        }

        let payload = match body.data.and_then(|data| data.product_variant_update) {
            Some(payload) => payload,
            None => {
                return AttemptOutcome::Malformed {
                    message: "admin API response missing productVariantUpdate payload".to_string(),
                }
            }
        };

        if let Some(user_error) = payload.user_errors.first() {
            return AttemptOutcome::Rejected {
                field: user_error.field_path(),
                message: user_error.message.clone(),
            };
        }

        AttemptOutcome::Delivered
    }

    pub fn shop_domain(&self) -> &str {
        &self.credentials.shop_domain
    }

    /// Whether the pacer would admit a call right now (for monitoring).
    pub fn can_dispatch_now(&self) -> bool {
        self.pacer.check().is_ok()
    }
}

#[async_trait]
impl PlatformGateway for AdminApiClient {
    /// Strictly sequential per-item updates; per-item outcomes are folded into
    /// the returned `BatchResult` and never abort the batch.
    async fn bulk_update(&self, item_ids: &[String], value: &str) -> AppResult<BatchResult> {
        let mut result = BatchResult::default();

        for item_id in item_ids {
            match self.try_update(item_id, value).await {
                Ok(()) => result.record_success(),
                Err(ItemFailure::Validation { field, message }) => {
                    result.record_validation_failure(item_id, field, message)
                }
                Err(ItemFailure::Transport { message }) => {
                    result.record_transport_failure(item_id, message)
                }
                Err(ItemFailure::RateLimited { retry_after }) => result.record_transport_failure(
                    item_id,
                    format!(
                        "admin API rate limit exceeded (retry after {:?})",
                        retry_after
                    ),
                ),
            }
        }

        Ok(result)
    }
}

/// Default factory: yields an `AdminApiClient` per tenant, all sharing the
/// outbound throttle's counter space.
pub struct AdminGatewayFactory {
    retry_policy: RetryPolicy,
    calls_per_second: f64,
    outbound_throttle: Arc<FixedWindowThrottle>,
    events: Arc<dyn EventSink>,
}

impl AdminGatewayFactory {
    pub fn new(
        retry_policy: RetryPolicy,
        calls_per_second: f64,
        outbound_throttle: Arc<FixedWindowThrottle>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            retry_policy,
            calls_per_second,
            outbound_throttle,
            events,
        }
    }
}

impl GatewayFactory for AdminGatewayFactory {
    fn gateway_for(&self, credentials: TenantCredentials) -> Arc<dyn PlatformGateway> {
        Arc::new(AdminApiClient::new(
            credentials,
            self.retry_policy.clone(),
            self.calls_per_second,
            Arc::clone(&self.outbound_throttle),
            Arc::clone(&self.events),
        ))
    }
}
