//! Fixed-window request limiting keyed by client identity

pub mod clock;
pub mod middleware;
pub mod store;

use axum::http::{Extensions, HeaderMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use clock::{Clock, ManualClock, SystemClock};
pub use middleware::enforce_rate_limit;
pub use store::{Decision, MemoryStore, RateLimitStore};

use crate::api::middleware::client::client_ip;
use crate::config::WindowLimit;

/// Derives the counting key from request headers and extensions
pub type KeyExtractor = Arc<dyn Fn(&HeaderMap, &Extensions) -> String + Send + Sync>;

#[derive(Clone)]
pub struct RateLimitPolicy {
    /// Label used in logs and metrics
    pub name: String,
    pub window: Duration,
    pub max: u64,
    pub key_extractor: KeyExtractor,
}

impl fmt::Debug for RateLimitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitPolicy")
            .field("name", &self.name)
            .field("window", &self.window)
            .field("max", &self.max)
            .finish_non_exhaustive()
    }
}

impl RateLimitPolicy {
    pub fn new(name: impl Into<String>, window: Duration, max: u64) -> Self {
        Self {
            name: name.into(),
            window,
            max,
            key_extractor: Arc::new(client_ip),
        }
    }

    pub fn key_extractor<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&HeaderMap, &Extensions) -> String + Send + Sync + 'static,
    {
        self.key_extractor = Arc::new(extractor);
        self
    }
}

/// A policy bound to a counter store and a clock
#[derive(Clone)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    store: Arc<dyn RateLimitStore>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            store: Arc::new(MemoryStore::new()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn RateLimitStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub fn key_for(&self, headers: &HeaderMap, extensions: &Extensions) -> String {
        (self.policy.key_extractor)(headers, extensions)
    }

    /// Count one request for `key`
    pub fn check(&self, key: &str) -> Decision {
        self.store.hit(
            key,
            self.clock.now_millis(),
            self.policy.window.as_millis() as u64,
            self.policy.max,
        )
    }

    /// Whole seconds until `decision`'s window closes, rounded up
    pub fn seconds_until_reset(&self, decision: &Decision) -> u64 {
        let remaining_ms = decision.reset_at_ms.saturating_sub(self.clock.now_millis());
        remaining_ms.div_ceil(1000)
    }

    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired(self.clock.now_millis())
    }
}

/// Limiter keyed by client address with its own in-memory store
pub fn create_limiter(window: Duration, max: u64) -> RateLimiter {
    RateLimiter::new(RateLimitPolicy::new("custom", window, max))
}

/// Wide-window limiter applied to every route
pub fn general_limiter(limit: &WindowLimit) -> RateLimiter {
    RateLimiter::new(RateLimitPolicy::new("general", limit.window, limit.max))
}

/// Short-window limiter for credential endpoints
pub fn credential_limiter(limit: &WindowLimit) -> RateLimiter {
    RateLimiter::new(RateLimitPolicy::new("credentials", limit.window, limit.max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_sixth_request_rejected() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = create_limiter(Duration::from_millis(60_000), 5).with_clock(clock.clone());

        for _ in 0..5 {
            assert!(limiter.check("10.0.0.1").allowed);
        }
        let sixth = limiter.check("10.0.0.1");
        assert!(!sixth.allowed);
        assert_eq!(limiter.seconds_until_reset(&sixth), 60);

        clock.advance(Duration::from_millis(59_500));
        assert_eq!(limiter.seconds_until_reset(&sixth), 1);

        clock.advance(Duration::from_millis(500));
        assert!(limiter.check("10.0.0.1").allowed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_exceeds_max_under_concurrency() {
        let limiter = Arc::new(create_limiter(Duration::from_secs(60), 5));
        let admitted = Arc::new(AtomicU64::new(0));

        let tasks: Vec<_> = (0..64)
            .map(|_| {
                let limiter = limiter.clone();
                let admitted = admitted.clone();
                tokio::spawn(async move {
                    if limiter.check("shared").allowed {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_custom_key_extractor() {
        let limiter = RateLimiter::new(
            RateLimitPolicy::new("per-key", Duration::from_secs(1), 1).key_extractor(
                |headers, _| {
                    headers
                        .get("x-api-key")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("anonymous")
                        .to_string()
                },
            ),
        );

        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", "abc".parse().unwrap());
        assert_eq!(limiter.key_for(&headers, &Extensions::new()), "abc");
        assert_eq!(limiter.key_for(&HeaderMap::new(), &Extensions::new()), "anonymous");
    }

    #[test]
    fn test_named_policies() {
        let limit = WindowLimit {
            window: Duration::from_secs(60),
            max: 5,
        };
        assert_eq!(general_limiter(&limit).policy().name, "general");
        assert_eq!(credential_limiter(&limit).policy().name, "credentials");
    }
}
