//! Launch-rate limiting.
//!
//! The [`RateGate`] bounds how fast new lookups may be started: over any
//! window of the configured length, at most `limit` acquisitions complete.
//! Each permit is replenished exactly one window after it was handed out, so
//! the steady refill rate is `limit / window` and bursts never exceed `limit`.

use crate::error::BulkDnsError;
use std::collections::VecDeque;
use std::future::{self, Future};
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Future returned by [`Clock::sleep_until`].
pub type Sleeping<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Time source for rate bookkeeping and the waits it schedules.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Resolve once `now()` has reached `deadline`.
    fn sleep_until(&self, deadline: Instant) -> Sleeping<'_>;
}

/// Clock backed by tokio's time source.
///
/// Follows tokio's paused clock in tests, so gate schedules and the sleeps
/// that enforce them agree with each other.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn sleep_until(&self, deadline: Instant) -> Sleeping<'_> {
        Box::pin(tokio::time::sleep_until(tokio::time::Instant::from_std(
            deadline,
        )))
    }
}

/// Manually driven clock.
///
/// All clones share the same time value, so advancing one advances all.
/// Sleeping jumps the clock forward to the deadline and returns at once.
#[derive(Debug, Clone)]
pub struct MockClock {
    current_time: Arc<Mutex<Instant>>,
}

impl MockClock {
    pub fn new(start: Instant) -> Self {
        Self {
            current_time: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        let mut time = self
            .current_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *time += duration;
    }

    /// Move the clock to `instant` unless it is already past it.
    fn advance_to(&self, instant: Instant) {
        let mut time = self
            .current_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if instant > *time {
            *time = instant;
        }
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self
            .current_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn sleep_until(&self, deadline: Instant) -> Sleeping<'_> {
        self.advance_to(deadline);
        Box::pin(future::ready(()))
    }
}

/// Bookkeeping for the last `limit` grants.
///
/// Pure and clock-free: callers pass the current instant in. A booked slot
/// is never earlier than the previous one, so grants leave in arrival order.
#[derive(Debug, Clone)]
pub struct WindowLimiter {
    limit: usize,
    window: Duration,
    grants: VecDeque<Instant>,
}

impl WindowLimiter {
    /// Create a limiter allowing `limit` grants per `window`.
    pub fn new(limit: usize, window: Duration) -> Result<Self, BulkDnsError> {
        if limit == 0 {
            return Err(BulkDnsError::config("Rate limit must be at least 1"));
        }
        if window.is_zero() {
            return Err(BulkDnsError::config("Rate duration must be greater than zero"));
        }
        Ok(Self {
            limit,
            window,
            grants: VecDeque::with_capacity(limit),
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Book the earliest slot at or after `now` that keeps the window bound.
    ///
    /// Returns the instant at which the caller may proceed. Equal to `now`
    /// when a permit is available immediately.
    pub fn reserve(&mut self, now: Instant) -> Instant {
        let replenished_at = if self.grants.len() >= self.limit {
            self.grants.pop_front().map(|oldest| oldest + self.window)
        } else {
            None
        };

        let mut slot = replenished_at.map_or(now, |at| at.max(now));
        if let Some(&last) = self.grants.back() {
            slot = slot.max(last);
        }

        self.grants.push_back(slot);
        slot
    }

    /// Number of permits that could be handed out at `now` without waiting.
    pub fn available(&self, now: Instant) -> usize {
        let live = self
            .grants
            .iter()
            .filter(|&&granted| granted + self.window > now)
            .count();
        self.limit.saturating_sub(live)
    }
}

/// Async launch gate shared by the dispatch loop.
///
/// `acquire` books a slot under a short lock, releases the lock and only then
/// sleeps, so any number of callers can wait concurrently.
pub struct RateGate {
    limiter: Mutex<WindowLimiter>,
    clock: Arc<dyn Clock>,
}

impl RateGate {
    /// Create a gate allowing `limit` launches per `window`, on tokio time.
    pub fn new(limit: usize, window: Duration) -> Result<Self, BulkDnsError> {
        Self::with_clock(limit, window, Arc::new(TokioClock))
    }

    /// Create a gate that reads and waits on a custom clock.
    pub fn with_clock(
        limit: usize,
        window: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, BulkDnsError> {
        Ok(Self {
            limiter: Mutex::new(WindowLimiter::new(limit, window)?),
            clock,
        })
    }

    /// Wait until a launch is allowed.
    ///
    /// Never fails and always eventually returns.
    pub async fn acquire(&self) {
        let now = self.clock.now();
        let slot = self.reserve(now);
        if slot > now {
            self.clock.sleep_until(slot).await;
        }
    }

    /// Book a slot without waiting for it.
    pub fn reserve(&self, now: Instant) -> Instant {
        self.limiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reserve(now)
    }

    /// Permits available right now.
    pub fn available(&self) -> usize {
        let now = self.clock.now();
        self.limiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .available(now)
    }
}

impl std::fmt::Debug for RateGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let limiter = self.limiter.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("RateGate")
            .field("limit", &limiter.limit())
            .field("window", &limiter.window())
            .finish()
    }
}
