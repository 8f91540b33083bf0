use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Politeness throttle shared by every lookup in a batch.
///
/// One permit per `min_delay`, burst of one: successive external calls are
/// at least `min_delay` apart no matter how many workers issue them. A zero
/// delay disables throttling.
#[derive(Clone)]
pub struct PoliteThrottle {
    limiter: Option<Arc<DirectRateLimiter>>,
    min_delay: Duration,
}

impl PoliteThrottle {
    pub fn new(min_delay: Duration) -> Self {
        let limiter = Quota::with_period(min_delay)
            .map(|quota| Arc::new(RateLimiter::direct(quota.allow_burst(NonZeroU32::MIN))));
        Self { limiter, min_delay }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub const fn min_delay(&self) -> Duration {
        self.min_delay
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Waits until the next external call may be issued.
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

impl std::fmt::Debug for PoliteThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoliteThrottle")
            .field("min_delay", &self.min_delay)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
