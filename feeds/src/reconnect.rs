//! Caller-side reconnect policy around connect/run cycles
//!
//! The adapter itself never retries; this wrapper owns bounded attempts
//! with exponential backoff and jitter.

use crate::error::FeedError;
use crate::event::BookEvent;
use crate::okx::websocket::OkxWebSocketFeed;
use lob::OrderBook;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Bounded exponential backoff with jitter
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Consecutive failed attempts tolerated before giving up
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (1-based)
    ///
    /// Doubles per attempt, jittered uniformly in [0.5, 1.5) of the
    /// computed value, and never exceeds `max_delay`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let raw = self
            .base_delay
            .saturating_mul(2_u32.saturating_pow(exponent));
        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        raw.mul_f64(jitter).min(self.max_delay)
    }
}

/// Drive connect/run cycles under the given policy
///
/// The attempt counter resets after any session that applied at least one
/// frame. Sessions ending in a fault or without ever applying a frame count
/// as failures.
///
/// # Errors
///
/// Returns [`FeedError::RetriesExhausted`] once `max_attempts` consecutive
/// failures accumulate.
pub async fn run_with_reconnect<F>(
    feed: &mut OkxWebSocketFeed,
    policy: &ReconnectPolicy,
    mut handler: F,
) -> Result<(), FeedError>
where
    F: FnMut(&OrderBook, &BookEvent) -> anyhow::Result<()>,
{
    let mut failures = 0_u32;
    loop {
        let session = match feed.connect().await {
            Ok(()) => feed.run(&mut handler).await,
            Err(e) => Err(e),
        };

        match session {
            Ok(applied) if applied > 0 => {
                failures = 0;
                info!(applied, "stream ended, reconnecting");
            }
            Ok(_) => {
                failures += 1;
                warn!(failures, "stream ended before any frame was applied");
            }
            Err(e) => {
                failures += 1;
                warn!(failures, error = %e, "stream attempt failed");
            }
        }

        if failures >= policy.max_attempts {
            return Err(FeedError::RetriesExhausted { attempts: failures });
        }
        let delay = policy.delay_for(failures.max(1));
        info!(?delay, "backing off before reconnect");
        tokio::time::sleep(delay).await;
    }
}
