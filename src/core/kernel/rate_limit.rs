use crate::core::errors::ExchangeError;
use governor::{
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorRateLimiter,
};
use nonzero_ext::nonzero;
use std::collections::VecDeque;
use std::num::NonZeroU32;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Sliding-window request budget: at most `max_requests` admissions in
/// any trailing `window`. Denials never sleep.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_requests: u32,
    window: Duration,
    admitted: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            admitted: Mutex::new(VecDeque::with_capacity(max_requests as usize)),
        }
    }

    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    fn evict(&self, admitted: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = admitted.front() {
            if now.duration_since(*oldest) >= self.window {
                admitted.pop_front();
            } else {
                break;
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Instant>> {
        // A poisoned lock only means another task panicked mid-update;
        // the queue of instants is still usable.
        self.admitted
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Admit one request if the window has room
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let mut admitted = self.lock();
        self.evict(&mut admitted, now);

        if admitted.len() < self.max_requests as usize {
            admitted.push_back(now);
            true
        } else {
            false
        }
    }

    /// How long until the oldest admission leaves the window
    pub fn wait_time(&self) -> Duration {
        let now = Instant::now();
        let mut admitted = self.lock();
        self.evict(&mut admitted, now);

        if admitted.len() < self.max_requests as usize {
            return Duration::ZERO;
        }
        admitted
            .front()
            .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
            .unwrap_or_default()
    }

    pub fn remaining(&self) -> u32 {
        let now = Instant::now();
        let mut admitted = self.lock();
        self.evict(&mut admitted, now);
        self.max_requests
            .saturating_sub(admitted.len() as u32)
    }

    pub const fn max_requests(&self) -> u32 {
        self.max_requests
    }
}

type Limiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Per-second order quota for placement and cancellation
pub struct OrderThrottle {
    limiter: Limiter,
    per_second: NonZeroU32,
}

impl std::fmt::Debug for OrderThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderThrottle")
            .field("per_second", &self.per_second)
            .finish_non_exhaustive()
    }
}

impl OrderThrottle {
    pub fn per_second(orders: u32) -> Self {
        let per_second = NonZeroU32::new(orders).unwrap_or(nonzero!(1u32));
        Self {
            limiter: GovernorRateLimiter::direct(Quota::per_second(per_second)),
            per_second,
        }
    }

    /// Fail fast with the time until the next order slot
    pub fn check(&self, exchange: &str) -> Result<(), ExchangeError> {
        match self.limiter.check() {
            Ok(()) => Ok(()),
            Err(not_until) => {
                let retry_after = not_until.wait_time_from(DefaultClock::default().now());
                warn!(exchange, ?retry_after, "Order rate limit exceeded");
                Err(ExchangeError::RateLimited { retry_after })
            }
        }
    }
}
