//! Process-wide sliding-window rate limiting
//!
//! A single window is shared by every caller; there is no per-client key.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Requests admitted per window
pub const RATE_LIMIT: usize = 10;
/// Window length in milliseconds
pub const WINDOW_MS: i64 = 60_000;

/// Source of wall-clock time in milliseconds since the Unix epoch
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Admission gate consulted before any provider call
pub trait RateLimiter: Send + Sync {
    /// Returns `true` and records `now_ms` if the request may proceed
    fn admit(&self, now_ms: i64) -> bool;
}

/// In-memory sliding window of admitted request timestamps
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    limit: usize,
    window_ms: i64,
    admitted: Mutex<VecDeque<i64>>,
}

impl SlidingWindowLimiter {
    pub fn new(limit: usize, window_ms: i64) -> Self {
        Self {
            limit,
            window_ms,
            admitted: Mutex::new(VecDeque::new()),
        }
    }
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new(RATE_LIMIT, WINDOW_MS)
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn admit(&self, now_ms: i64) -> bool {
        // Eviction, check and append happen under one lock
        let mut admitted = self
            .admitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let cutoff = now_ms - self.window_ms;
        admitted.retain(|&t| t >= cutoff);

        if admitted.len() >= self.limit {
            return false;
        }
        admitted.push_back(now_ms);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_admits_up_to_limit() {
        let limiter = SlidingWindowLimiter::default();
        for i in 0..10 {
            assert!(limiter.admit(1_000 + i * 100), "request {i} should pass");
        }
        assert!(!limiter.admit(2_000));
    }

    #[test]
    fn test_rejection_does_not_record() {
        let limiter = SlidingWindowLimiter::new(1, WINDOW_MS);
        assert!(limiter.admit(0));
        assert!(!limiter.admit(10));
        assert!(!limiter.admit(20));
        // only t=0 was recorded, so it alone has to age out
        assert!(limiter.admit(60_001));
    }

    #[test]
    fn test_window_slides() {
        let limiter = SlidingWindowLimiter::default();
        // oldest at t=0, the rest at t=30s
        assert!(limiter.admit(0));
        for _ in 0..9 {
            assert!(limiter.admit(30_000));
        }
        assert!(!limiter.admit(59_999));
        // exactly 60s old is still inside the window
        assert!(!limiter.admit(60_000));
        // the t=0 entry has aged out, one slot frees up
        assert!(limiter.admit(60_001));
        assert!(!limiter.admit(60_002));
        // everything from t=30s ages out together
        for _ in 0..9 {
            assert!(limiter.admit(90_001));
        }
    }

    #[test]
    fn test_no_fixed_bucket_reset() {
        let limiter = SlidingWindowLimiter::default();
        for _ in 0..10 {
            assert!(limiter.admit(55_000));
        }
        // a calendar-minute bucket would reset here
        assert!(!limiter.admit(61_000));
        assert!(limiter.admit(115_001));
    }

    #[test]
    fn test_concurrent_admission_never_exceeds_limit() {
        let limiter = Arc::new(SlidingWindowLimiter::default());
        let handles: Vec<_> = (0..32)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || limiter.admit(5_000))
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&ok| ok)
            .count();
        assert_eq!(admitted, RATE_LIMIT);
    }

    #[test]
    fn test_huge_limit_allocates_lazily() {
        let limiter = SlidingWindowLimiter::new(usize::MAX, WINDOW_MS);
        assert!(limiter.admit(0));
        assert!(limiter.admit(1));
    }

    #[test]
    fn test_system_clock_is_epoch_millis() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }
}
