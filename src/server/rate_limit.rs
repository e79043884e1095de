//! Token-bucket rate limiting for the chat endpoint
//!
//! Every chat request can fan out into several model calls, so the endpoint
//! is the one place worth guarding. The bucket allows short bursts (a teacher
//! pasting, fixing, regenerating) while capping the sustained rate.
//!
//! ```text
//!   ┌─────────────┐
//!   │   Bucket    │ ← holds up to `capacity` tokens
//!   │  ● ● ● ●    │ ← refills at `refill_rate` tokens per second
//!   └─────────────┘
//!         │
//!   request: token available → take one, allow
//!            bucket empty    → 429 with Retry-After
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

// Tokens are stored scaled so fractional refills accumulate
const SCALE: u64 = 1000;

/// Thread-safe token bucket
pub struct RateLimiter {
    capacity: u64,
    refill_rate: f64,
    tokens_scaled: AtomicU64,
    last_refill: Mutex<Instant>,
}

impl RateLimiter {
    /// `capacity` is the burst size, `refill_rate` the sustained requests/sec.
    pub fn new(capacity: u64, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            tokens_scaled: AtomicU64::new(capacity.saturating_mul(SCALE)),
            last_refill: Mutex::new(Instant::now()),
        }
    }

    /// Take one token, or say how long until one is available.
    pub fn try_acquire(&self) -> Result<(), RateLimitError> {
        self.refill();

        loop {
            let current = self.tokens_scaled.load(Ordering::Relaxed);
            if current < SCALE {
                return Err(RateLimitError::new(self.refill_rate, SCALE - current));
            }
            if self
                .tokens_scaled
                .compare_exchange(current, current - SCALE, Ordering::SeqCst, Ordering::Relaxed)
                .is_ok()
            {
                return Ok(());
            }
        }
    }

    fn refill(&self) {
        let now = Instant::now();

        // A poisoned lock still holds a valid Instant
        let mut last = self.last_refill.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let elapsed = now.duration_since(*last);
        let tokens_to_add = (elapsed.as_secs_f64() * self.refill_rate * SCALE as f64) as u64;
        if tokens_to_add == 0 {
            return;
        }
        *last = now;

        let max_scaled = self.capacity.saturating_mul(SCALE);
        loop {
            let current = self.tokens_scaled.load(Ordering::Relaxed);
            let new = std::cmp::min(current.saturating_add(tokens_to_add), max_scaled);
            if self
                .tokens_scaled
                .compare_exchange(current, new, Ordering::SeqCst, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }
        }
    }

    /// Whole tokens currently available
    pub fn available_tokens(&self) -> u64 {
        self.tokens_scaled.load(Ordering::Relaxed) / SCALE
    }
}

/// Returned when the bucket is empty
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitError {
    /// How long until the next token arrives
    pub retry_after: Duration,
}

impl RateLimitError {
    fn new(refill_rate: f64, missing_scaled: u64) -> Self {
        let secs = if refill_rate > 0.0 {
            missing_scaled as f64 / SCALE as f64 / refill_rate
        } else {
            1.0
        };
        // A tiny refill rate can push the wait past what Duration holds
        Self {
            retry_after: Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX),
        }
    }

    /// Whole seconds for a `Retry-After` header, at least 1
    pub fn retry_after_secs(&self) -> u64 {
        self.retry_after.as_secs_f64().ceil().max(1.0) as u64
    }
}

impl std::fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Too many requests. Retry after {} seconds", self.retry_after_secs())
    }
}

impl std::error::Error for RateLimitError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_then_limited() {
        let limiter = RateLimiter::new(3, 0.5);
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_ok());

        let err = limiter.try_acquire().unwrap_err();
        // one full token at 0.5/sec takes two seconds
        assert_eq!(err.retry_after_secs(), 2);
        assert_eq!(err.to_string(), "Too many requests. Retry after 2 seconds");
    }

    #[test]
    fn test_refill() {
        let limiter = RateLimiter::new(2, 100.0);
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_err());

        // 10ms is one token at 100/sec
        std::thread::sleep(Duration::from_millis(15));
        assert!(limiter.try_acquire().is_ok());
    }

    #[test]
    fn test_available_tokens_never_exceed_capacity() {
        let limiter = RateLimiter::new(5, 1000.0);
        assert_eq!(limiter.available_tokens(), 5);
        limiter.try_acquire().unwrap();
        assert_eq!(limiter.available_tokens(), 4);

        std::thread::sleep(Duration::from_millis(20));
        limiter.try_acquire().unwrap();
        assert_eq!(limiter.available_tokens(), 4);
    }

    #[test]
    fn test_tiny_rate_retry_after_does_not_overflow() {
        let limiter = RateLimiter::new(1, 1e-20);
        limiter.try_acquire().unwrap();
        let err = limiter.try_acquire().unwrap_err();
        assert_eq!(err.retry_after, Duration::MAX);
        assert!(err.retry_after_secs() >= 1);
        assert!(err.to_string().starts_with("Too many requests. Retry after"));
    }

    #[test]
    fn test_zero_rate_retry_after() {
        let limiter = RateLimiter::new(0, 0.0);
        let err = limiter.try_acquire().unwrap_err();
        assert_eq!(err.retry_after_secs(), 1);
    }
}
