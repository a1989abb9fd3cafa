//! Wall-clock rate limiting for diagnostic output

use std::time::{Duration, Instant};

/// Allows an action at most once per interval, measured against the
/// monotonic clock. Used only to throttle diagnostics, never control.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use driftlock_core::util::RateLimiter;
///
/// let mut limiter = RateLimiter::new(Duration::from_secs(5));
/// assert!(limiter.allow());
/// assert!(!limiter.allow());
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_allowed: Option<Instant>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_allowed: None,
        }
    }

    /// True at most once per interval; the first call always passes.
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        match self.last_allowed {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last_allowed = Some(now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_call_is_allowed() {
        let mut limiter = RateLimiter::new(Duration::from_secs(3600));
        assert!(limiter.allow());
    }

    #[test]
    fn test_second_call_within_interval_is_denied() {
        let mut limiter = RateLimiter::new(Duration::from_secs(3600));
        assert!(limiter.allow());
        assert!(!limiter.allow(), "two calls within the interval");
        assert!(!limiter.allow());
    }

    #[test]
    fn test_allows_again_after_interval() {
        let mut limiter = RateLimiter::new(Duration::from_millis(20));
        assert!(limiter.allow());
        assert!(!limiter.allow());

        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.allow(), "interval elapsed, next call must pass");
    }
}
