use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, info};

use crate::rate_limit::RateLimiter;

/// Start the background job dropping closed rate-limit windows
///
/// Without it the in-memory stores keep one entry per client ever seen.
///
/// # Returns
/// tokio::task::JoinHandle that can be awaited or aborted
pub fn start_window_purge_job(
    limiters: Vec<Arc<RateLimiter>>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    if every.is_zero() || limiters.is_empty() {
        info!("Rate limit window purge job is disabled");
        return tokio::spawn(async {});
    }

    info!(
        "Starting rate limit window purge job: every {}s across {} limiter(s)",
        every.as_secs(),
        limiters.len()
    );

    tokio::spawn(async move {
        let mut ticker = interval(every);

        // Skip the first tick (happens immediately)
        ticker.tick().await;

        loop {
            ticker.tick().await;
            for limiter in &limiters {
                let purged = limiter.purge_expired();
                if purged > 0 {
                    debug!(
                        policy = %limiter.policy().name,
                        purged,
                        "Purged expired rate limit windows"
                    );
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::{create_limiter, ManualClock};

    #[tokio::test(start_paused = true)]
    async fn test_purges_closed_windows() {
        let clock = Arc::new(ManualClock::new(0));
        let limiter = Arc::new(create_limiter(Duration::from_secs(1), 1).with_clock(clock.clone()));
        limiter.check("stale");
        clock.advance(Duration::from_secs(2));

        let handle = start_window_purge_job(vec![limiter.clone()], Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(11)).await;

        // An already-purged store reports nothing left to drop.
        assert_eq!(limiter.purge_expired(), 0);
        assert!(limiter.check("stale").allowed);
        handle.abort();
    }

    #[tokio::test]
    async fn test_zero_interval_disables_job() {
        let limiter = Arc::new(create_limiter(Duration::from_secs(1), 1));
        let handle = start_window_purge_job(vec![limiter], Duration::ZERO);
        handle.await.unwrap();
    }
}
