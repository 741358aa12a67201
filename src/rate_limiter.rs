//! Token bucket rate limiter shared by every Gmail API call
//!
//! Gmail enforces a per-user quota defined as an average rate. A token bucket
//! matches that model better than a fixed minimum interval between calls:
//! - Tokens accumulate at `rate` per second while the client is idle
//! - The bucket never holds more than `capacity` tokens (burst size)
//! - Each logical API call consumes exactly one token
//! - Callers wait when the bucket is empty
//!
//! One limiter is built from the configuration and cloned into every
//! executor; clones share the same bucket.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Token bucket limiter
///
/// The bucket state lives behind an async mutex that stays locked for the
/// whole refill/debit step, including any wait for a missing fraction of a
/// token. Waiters therefore queue in arrival order and a token can never be
/// handed to two callers.
#[derive(Debug)]
pub struct RateLimiter {
    inner: Arc<Mutex<BucketState>>,
}

#[derive(Debug)]
struct BucketState {
    /// Current token balance, 0 <= tokens <= capacity
    tokens: f64,
    /// Maximum tokens that can be stored (burst capacity)
    capacity: f64,
    /// Tokens added per second
    rate: f64,
    /// Last time we refilled the bucket
    last_refill: Instant,
    /// Total tokens handed out (for stats)
    total_acquired: u64,
    /// Acquisitions that had to wait for a refill (for stats)
    total_waits: u64,
}

impl BucketState {
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_refill = now;
    }
}

impl RateLimiter {
    /// Create a limiter whose burst capacity equals its rate
    pub fn new(rate: f64) -> Self {
        Self::with_capacity(rate, rate)
    }

    /// Create a limiter with custom burst capacity
    ///
    /// # Arguments
    /// * `rate` - Tokens added per second (must be positive)
    /// * `capacity` - Maximum burst size (must be at least 1)
    pub fn with_capacity(rate: f64, capacity: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BucketState {
                tokens: capacity, // Start with full bucket
                capacity,
                rate,
                last_refill: Instant::now(),
                total_acquired: 0,
                total_waits: 0,
            })),
        }
    }

    /// Wait until a token is available, then consume it
    ///
    /// If the balance is below one token the caller sleeps for the time the
    /// bucket needs to refill the missing fraction, and the balance is then
    /// left at zero.
    pub async fn acquire(&self) {
        let mut state = self.inner.lock().await;
        state.refill();

        trace!(
            "Rate limiter: {:.2}/{:.0} tokens available",
            state.tokens,
            state.capacity
        );

        state.total_acquired += 1;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            return;
        }

        let wait = Duration::from_secs_f64((1.0 - state.tokens) / state.rate);
        state.total_waits += 1;
        debug!("Rate limit reached, waiting {:.3}s for a token", wait.as_secs_f64());

        // Still holding the lock: later callers queue behind this one.
        tokio::time::sleep(wait).await;
        state.tokens = 0.0;
        state.last_refill = Instant::now();
    }

    /// Try to take a token without waiting
    ///
    /// Returns `true` if a token was consumed
    pub async fn try_acquire(&self) -> bool {
        let mut state = self.inner.lock().await;
        state.refill();

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            state.total_acquired += 1;
            true
        } else {
            false
        }
    }

    /// Check the current balance without consuming anything
    pub async fn available(&self) -> f64 {
        let mut state = self.inner.lock().await;
        state.refill();
        state.tokens
    }

    /// Get current statistics about limiter usage
    pub async fn stats(&self) -> RateLimiterStats {
        let state = self.inner.lock().await;
        RateLimiterStats {
            available: state.tokens,
            capacity: state.capacity,
            rate: state.rate,
            total_acquired: state.total_acquired,
            total_waits: state.total_waits,
        }
    }
}

impl Clone for RateLimiter {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Statistics about limiter usage
#[derive(Debug, Clone)]
pub struct RateLimiterStats {
    /// Token balance at the last refill
    pub available: f64,
    /// Maximum burst capacity
    pub capacity: f64,
    /// Refill rate (tokens per second)
    pub rate: f64,
    /// Total tokens handed out since creation
    pub total_acquired: u64,
    /// How many acquisitions had to wait
    pub total_waits: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_up_to_capacity_is_immediate() {
        let limiter = RateLimiter::new(10.0);

        let start = Instant::now();
        for _ in 0..10 {
            limiter.acquire().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        let stats = limiter.stats().await;
        assert_eq!(stats.total_acquired, 10);
        assert_eq!(stats.total_waits, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sustained_rate_is_bounded() {
        let limiter = RateLimiter::new(10.0);

        // Drain the initial burst
        for _ in 0..10 {
            limiter.acquire().await;
        }

        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        let elapsed = start.elapsed();

        // Five tokens at 10/s need at least half a second
        assert!(
            elapsed >= Duration::from_millis(499),
            "Expected >= 500ms, got {:?}",
            elapsed
        );
        assert_eq!(limiter.stats().await.total_waits, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_after_idle_restores_burst() {
        let limiter = RateLimiter::with_capacity(5.0, 5.0);
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert!(!limiter.try_acquire().await);

        tokio::time::sleep(Duration::from_secs(10)).await;

        // Capped at capacity, not 50 tokens
        let available = limiter.available().await;
        assert!((available - 5.0).abs() < 1e-9, "got {}", available);

        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_refill() {
        let limiter = RateLimiter::with_capacity(100.0, 100.0);
        for _ in 0..100 {
            limiter.acquire().await;
        }

        tokio::time::sleep(Duration::from_millis(500)).await;

        let available = limiter.available().await;
        assert!(
            (available - 50.0).abs() < 0.5,
            "Should have refilled ~50 tokens, got {}",
            available
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_acquire_never_waits() {
        let limiter = RateLimiter::with_capacity(1.0, 1.0);

        assert!(limiter.try_acquire().await);
        assert!(!limiter.try_acquire().await);
        assert_eq!(limiter.stats().await.total_acquired, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_acquirers_share_one_bucket() {
        let limiter = RateLimiter::with_capacity(10.0, 1.0);
        let start = Instant::now();

        let handles: Vec<_> = (0..11)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.acquire().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        // One token up front, the other ten at 10/s
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(999),
            "Expected >= 1s, got {:?}",
            elapsed
        );
        assert_eq!(limiter.stats().await.total_acquired, 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clone_shares_state() {
        let limiter1 = RateLimiter::new(100.0);
        let limiter2 = limiter1.clone();

        limiter1.acquire().await;

        let stats = limiter2.stats().await;
        assert_eq!(stats.total_acquired, 1);
        assert_eq!(stats.rate, 100.0);
        assert_eq!(stats.capacity, 100.0);
    }
}
