//! Fixed-window request throttle keyed by caller identity.
//!
//! Each key gets an independent counter that is replaced wholesale once its
//! window elapses (hard reset, not a sliding or leaky model). Separate named
//! instances give independent counter spaces for the different call classes:
//! general inbound traffic, bulk-job creation, export requests, and outbound
//! calls to the admin API.
use crate::shared::{AppError, AppResult, CoreConfig};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Counter state for one key within the current window.
#[derive(Debug, Clone, Copy)]
struct ThrottleWindow {
    count: u32,
    reset_at: Instant,
}

/// Metadata returned on admission, for upstream rate-limit headers.
#[derive(Debug, Clone, Copy)]
pub struct ThrottleDecision {
    pub remaining: u32,
    pub reset_after: Duration,
}

pub struct FixedWindowThrottle {
    name: &'static str,
    window: Duration,
    max_requests: u32,
    windows: DashMap<String, ThrottleWindow>,
}

impl FixedWindowThrottle {
    pub fn new(name: &'static str, window: Duration, max_requests: u32) -> Self {
        Self {
            name,
            window,
            max_requests,
            windows: DashMap::new(),
        }
    }

    /// General inbound traffic, keyed by tenant or network address.
    pub fn inbound(config: &CoreConfig) -> Self {
        Self::new("inbound", config.throttle_window, config.inbound_max_requests)
    }

    /// Bulk-job creation requests, keyed by tenant.
    pub fn bulk_creation(config: &CoreConfig) -> Self {
        Self::new(
            "bulk_creation",
            config.throttle_window,
            config.bulk_creation_max_requests,
        )
    }

    /// CSV export requests, keyed by tenant.
    pub fn export(config: &CoreConfig) -> Self {
        Self::new("export", config.throttle_window, config.export_max_requests)
    }

    /// Outbound calls against the admin API, keyed by tenant.
    pub fn outbound(config: &CoreConfig) -> Self {
        Self::new(
            "outbound",
            config.throttle_window,
            config.outbound_max_requests,
        )
    }

    /// Admit or reject one call for `key`.
    ///
    /// Rejection carries the time until the key's window resets, suitable for
    /// a Retry-After header upstream.
    pub fn check(&self, key: &str) -> AppResult<ThrottleDecision> {
        let now = Instant::now();
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(ThrottleWindow {
                count: 0,
                reset_at: now + self.window,
            });

        if entry.reset_at <= now {
            // Previous window fully elapsed: hard reset.
            *entry = ThrottleWindow {
                count: 0,
                reset_at: now + self.window,
            };
        }

        entry.count += 1;
        let reset_after = entry.reset_at.saturating_duration_since(now);

        if entry.count > self.max_requests {
            return Err(AppError::RateLimited {
                retry_after: reset_after,
            });
        }

        Ok(ThrottleDecision {
            remaining: self.max_requests - entry.count,
            reset_after,
        })
    }

    /// Drop windows whose reset time has passed. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, window| window.reset_at > now);
        before - self.windows.len()
    }

    /// Run `sweep` every `interval` until the token is cancelled.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let throttle = self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = throttle.sweep();
                        if removed > 0 {
                            crate::log_debug!(
                                "Throttle '{}' swept {} elapsed windows",
                                throttle.name,
                                removed
                            );
                        }
                    }
                }
            }
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of keys currently holding a window (for monitoring).
    pub fn active_keys(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn throttle(window_ms: u64, max: u32) -> FixedWindowThrottle {
        FixedWindowThrottle::new("test", Duration::from_millis(window_ms), max)
    }

    #[test]
    fn admits_up_to_max_then_rejects() {
        let throttle = throttle(1000, 2);

        assert!(throttle.check("shop-a").is_ok());
        assert!(throttle.check("shop-a").is_ok());

        match throttle.check("shop-a") {
            Err(AppError::RateLimited { retry_after }) => {
                assert!(retry_after > Duration::ZERO);
                assert!(retry_after <= Duration::from_millis(1000));
            }
            other => panic!("expected rate limit rejection, got {:?}", other),
        }
    }

    #[test]
    fn keys_are_independent_counter_spaces() {
        let throttle = throttle(1000, 1);

        assert!(throttle.check("shop-a").is_ok());
        assert!(throttle.check("shop-b").is_ok());
        assert!(throttle.check("shop-a").is_err());
        assert!(throttle.check("shop-b").is_err());
    }

    #[test]
    fn remaining_quota_counts_down() {
        let throttle = throttle(1000, 3);

        let first = throttle.check("shop-a").unwrap();
        assert_eq!(first.remaining, 2);
        let second = throttle.check("shop-a").unwrap();
        assert_eq!(second.remaining, 1);
        let third = throttle.check("shop-a").unwrap();
        assert_eq!(third.remaining, 0);
    }

    #[test]
    fn elapsed_window_resets_to_count_one() {
        let throttle = throttle(20, 1);

        assert!(throttle.check("shop-a").is_ok());
        assert!(throttle.check("shop-a").is_err());

        std::thread::sleep(Duration::from_millis(30));

        let decision = throttle.check("shop-a").unwrap();
        assert_eq!(decision.remaining, 0); // fresh window, count back to 1
    }

    #[test]
    fn sweep_drops_only_elapsed_windows() {
        let throttle = throttle(20, 5);

        throttle.check("old").unwrap();
        std::thread::sleep(Duration::from_millis(30));
        throttle.check("fresh").unwrap();

        let removed = throttle.sweep();
        assert_eq!(removed, 1);
        assert_eq!(throttle.active_keys(), 1);
    }
}
