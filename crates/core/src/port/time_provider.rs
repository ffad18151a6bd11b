// Time Provider Port (for testability)

use chrono::{Datelike, Local, Timelike};

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Get current time in milliseconds since epoch
    fn now_millis(&self) -> i64;

    /// Local hour of day (0-23), fed to the prediction service
    fn current_hour(&self) -> u32;

    /// Local day of week (0 = Sunday)
    fn day_of_week(&self) -> u32;
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn current_hour(&self) -> u32 {
        Local::now().hour()
    }

    fn day_of_week(&self) -> u32 {
        Local::now().weekday().num_days_from_sunday()
    }
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

    /// Manually driven clock
    pub struct MockTimeProvider {
        now: AtomicI64,
        hour: AtomicU32,
    }

    impl MockTimeProvider {
        pub fn new(now_millis: i64) -> Self {
            Self {
                now: AtomicI64::new(now_millis),
                hour: AtomicU32::new(12),
            }
        }

        pub fn set(&self, now_millis: i64) {
            self.now.store(now_millis, Ordering::SeqCst);
        }

        pub fn advance_millis(&self, delta: i64) {
            self.now.fetch_add(delta, Ordering::SeqCst);
        }

        pub fn set_hour(&self, hour: u32) {
            self.hour.store(hour, Ordering::SeqCst);
        }
    }

    impl TimeProvider for MockTimeProvider {
        fn now_millis(&self) -> i64 {
            self.now.load(Ordering::SeqCst)
        }

        fn current_hour(&self) -> u32 {
            self.hour.load(Ordering::SeqCst)
        }

        fn day_of_week(&self) -> u32 {
            // 1970-01-01 was a Thursday
            (((self.now_millis() / 86_400_000) + 4).rem_euclid(7)) as u32
        }
    }
}
