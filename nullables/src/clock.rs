//! Deterministic clock for tests.

use corechain_types::{Clock, Timestamp};
use std::sync::atomic::{AtomicU64, Ordering};

/// A deterministic clock for testing.
///
/// Time only advances when you tell it to, or by a fixed step on every read
/// when built with [`NullClock::auto_advancing`].
#[derive(Debug)]
pub struct NullClock {
    current: AtomicU64,
    step: u64,
}

impl NullClock {
    pub fn new(initial_millis: u64) -> Self {
        Self {
            current: AtomicU64::new(initial_millis),
            step: 0,
        }
    }

    /// Each call to `now` returns a value `step_millis` later than the previous one.
    pub fn auto_advancing(initial_millis: u64, step_millis: u64) -> Self {
        Self {
            current: AtomicU64::new(initial_millis),
            step: step_millis,
        }
    }

    /// Advance time by a number of milliseconds.
    pub fn advance(&self, millis: u64) {
        self.current.fetch_add(millis, Ordering::SeqCst);
    }

    /// Set the time to a specific value.
    pub fn set(&self, millis: u64) {
        self.current.store(millis, Ordering::SeqCst);
    }
}

impl Clock for NullClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.current.fetch_add(self.step, Ordering::SeqCst))
    }
}
