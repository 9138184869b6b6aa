//! Provider-reported rate-limit tracking.
//!
//! SauceNao reports how many requests remain in two windows with every
//! successful response. [`RateLimitTracker`] records those counters and
//! decides, before the next request, whether to proceed, wait out the short
//! window, or refuse until the long window closes.
//!
//! ```text
//!            short_remaining == 0          long_remaining == 0
//! Proceed ─────────────────────► WaitFor ─────────────────────► CoolingDown
//!    ▲  (elapsed >= short window)   │     (elapsed >= long window)   │
//!    └──────────────────────────────┴────────────────────────────────┘
//! ```

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Length of the short window. Slightly above SauceNao's 30 s to be safe.
pub const SHORT_WINDOW: Duration = Duration::from_secs(35);

/// Length of the long window.
pub const LONG_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// What the caller should do before issuing the next request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Send the request now.
    Proceed,
    /// Sleep for the given duration, then send.
    WaitFor(Duration),
    /// Do not send; the provider refuses requests for the given duration.
    CoolingDown(Duration),
}

#[derive(Debug, Clone, Copy, Default)]
struct Window {
    short_remaining: Option<u32>,
    long_remaining: Option<u32>,
    last_request: Option<Instant>,
}

/// Thread-safe record of the most recent rate-limit counters.
///
/// Counters start unknown, so the first request always proceeds. A window
/// counts as exhausted only once the provider reports zero remaining; the
/// reported counts already include the request that produced them.
#[derive(Debug, Default)]
pub struct RateLimitTracker {
    window: Mutex<Window>,
}

impl RateLimitTracker {
    /// Create a tracker with unknown counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether a request may be sent at `now`.
    pub fn check(&self, now: Instant) -> RateLimitDecision {
        let window = *self.lock();
        let Some(last) = window.last_request else {
            return RateLimitDecision::Proceed;
        };
        let elapsed = now.saturating_duration_since(last);

        if window.long_remaining == Some(0) && elapsed < LONG_WINDOW {
            return RateLimitDecision::CoolingDown(LONG_WINDOW - elapsed);
        }
        if window.short_remaining == Some(0) && elapsed < SHORT_WINDOW {
            return RateLimitDecision::WaitFor(SHORT_WINDOW - elapsed);
        }
        RateLimitDecision::Proceed
    }

    /// Record the counters reported by a successful response.
    pub fn record(&self, short_remaining: u32, long_remaining: u32, now: Instant) {
        let mut window = self.lock();
        window.short_remaining = Some(short_remaining);
        window.long_remaining = Some(long_remaining);
        window.last_request = Some(now);
    }

    /// Record a throttled (HTTP 429) response: the short window is exhausted.
    pub fn record_throttled(&self, now: Instant) {
        let mut window = self.lock();
        window.short_remaining = Some(0);
        window.last_request = Some(now);
    }

    /// Most recently reported `(short, long)` counters, if any.
    pub fn remaining(&self) -> (Option<u32>, Option<u32>) {
        let window = self.lock();
        (window.short_remaining, window.long_remaining)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Window> {
        // Counters stay meaningful even if a holder panicked mid-update.
        self.window
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
