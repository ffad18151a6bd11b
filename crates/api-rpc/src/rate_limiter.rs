//! Rate Limiter (Token Bucket)
//!
//! Guards the mutating RPC methods. Lock-free: token count and last refill
//! time share one atomic word.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Token bucket over a single packed `AtomicU64`
///
/// Upper 32 bits hold the token count, lower 32 bits the last refill time
/// in milliseconds since the limiter was created.
pub struct RateLimiter {
    packed: AtomicU64,
    created: Instant,
    burst: u32,
    per_second: u32,
}

fn pack(tokens: u32, at_ms: u32) -> u64 {
    ((tokens as u64) << 32) | at_ms as u64
}

fn unpack(packed: u64) -> (u32, u32) {
    ((packed >> 32) as u32, (packed & 0xFFFF_FFFF) as u32)
}

impl RateLimiter {
    /// `burst` requests may arrive at once; `per_second` tokens come back
    /// every second after that
    pub fn new(burst: u32, per_second: u32) -> Self {
        Self {
            packed: AtomicU64::new(pack(burst, 0)),
            created: Instant::now(),
            burst,
            per_second,
        }
    }

    /// Take one token; false when the bucket is empty
    pub fn try_acquire(&self) -> bool {
        // Truncation wraps every ~49.7 days; elapsed time is taken modulo 2^32
        self.acquire_at(self.created.elapsed().as_millis() as u32)
    }

    fn acquire_at(&self, now_ms: u32) -> bool {
        loop {
            let current = self.packed.load(Ordering::Acquire);
            let (tokens, last_ms) = unpack(current);

            // A stamp ahead of `now_ms` came from a racing caller, not a wrap
            let elapsed_ms = match now_ms.wrapping_sub(last_ms) {
                ms if ms > u32::MAX / 2 => 0,
                ms => ms,
            };
            let refill = (elapsed_ms as u64 * self.per_second as u64) / 1000;
            let available = (tokens as u64 + refill).min(self.burst as u64) as u32;

            if available == 0 {
                return false;
            }

            // Only advance the refill clock when at least one token was
            // credited, or slow trickles would never add up.
            let stamp = if refill > 0 { now_ms } else { last_ms };
            if self
                .packed
                .compare_exchange(
                    current,
                    pack(available - 1, stamp),
                    Ordering::Release,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                return true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::time::{sleep, Duration};

    #[test]
    fn test_allows_burst_then_denies() {
        let limiter = RateLimiter::new(10, 10);

        for _ in 0..10 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_zero_rate_never_refills() {
        let limiter = RateLimiter::new(1, 0);
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn test_refills_across_clock_wrap() {
        let limiter = RateLimiter::new(50, 100);
        limiter.packed.store(pack(0, u32::MAX - 5), Ordering::Release);

        // 1.5s after the last refill, counted across the wrap
        let allowed = (0..50).filter(|_| limiter.acquire_at(1_494)).count();
        assert_eq!(allowed, 50);
        assert!(!limiter.acquire_at(1_494));

        // The next refill is measured from the post-wrap stamp
        assert!(limiter.acquire_at(1_504));
    }

    #[test]
    fn test_stale_reading_behind_stamp_refills_nothing() {
        let limiter = RateLimiter::new(5, 100);
        limiter.packed.store(pack(0, 10_000), Ordering::Release);

        assert!(!limiter.acquire_at(9_990));
        assert!(limiter.acquire_at(10_010));
    }

    #[tokio::test]
    async fn test_refills_over_time() {
        let limiter = RateLimiter::new(5, 10);

        for _ in 0..5 {
            assert!(limiter.try_acquire());
        }
        assert!(!limiter.try_acquire());

        sleep(Duration::from_millis(500)).await;

        assert!(limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_the_burst() {
        let limiter = Arc::new(RateLimiter::new(100, 1));

        let mut handles = vec![];
        for _ in 0..10 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                (0..20).filter(|_| limiter.try_acquire()).count()
            }));
        }

        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap();
        }

        assert!(total <= 101, "allowed {} of 200", total);
        assert!(total >= 100, "allowed {} of 200", total);
    }
}
