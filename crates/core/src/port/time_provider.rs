// Time Provider Port (for testability)

use chrono::{DateTime, Utc};

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Milliseconds since epoch
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Clock that only moves when told to
    pub struct FixedTimeProvider {
        now: Mutex<DateTime<Utc>>,
    }

    impl FixedTimeProvider {
        pub fn new(now: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(now),
            }
        }

        pub fn advance_millis(&self, millis: i64) {
            let mut now = self.now.lock().unwrap();
            *now += chrono::Duration::milliseconds(millis);
        }
    }

    impl TimeProvider for FixedTimeProvider {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }
}
