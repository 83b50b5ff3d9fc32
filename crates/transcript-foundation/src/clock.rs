//! Clock abstraction for test determinism.
//!
//! The accumulator only ever needs one thing from time: a monotonically
//! non-decreasing number of seconds. Modeling it as a single-method trait
//! (rather than threading `Instant` through the reconciler) keeps the core
//! state machine free of `std::time` and lets tests drive the clock by hand.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Yields monotonic seconds. Implementations must never go backwards;
/// callers that detect regression should clamp rather than trust it blindly
/// (see `Accumulator`'s `now = max(now, last_now)` guard).
pub trait Clock: Send + Sync {
    /// Current time in seconds, monotonically non-decreasing.
    fn now_s(&self) -> f64;
}

/// Wall-clock implementation backed by `std::time::Instant`.
pub struct RealClock {
    epoch: Instant,
}

impl Default for RealClock {
    fn default() -> Self {
        Self::new()
    }
}

impl RealClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Clock for RealClock {
    fn now_s(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}

/// Virtual clock for deterministic tests. Seconds are stored as bits of an
/// `AtomicU64` so `advance`/`set` need no interior-mutability lock and the
/// clock can be shared across a test without `&mut`.
pub struct TestClock {
    seconds_bits: AtomicU64,
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TestClock {
    pub fn new() -> Self {
        Self::new_at(0.0)
    }

    pub fn new_at(start_s: f64) -> Self {
        Self {
            seconds_bits: AtomicU64::new(start_s.to_bits()),
        }
    }

    /// Advance the virtual clock by `delta_s` seconds.
    pub fn advance(&self, delta_s: f64) {
        let current = f64::from_bits(self.seconds_bits.load(Ordering::Relaxed));
        self.set(current + delta_s);
    }

    /// Set the virtual clock to an absolute number of seconds.
    pub fn set(&self, seconds: f64) {
        self.seconds_bits.store(seconds.to_bits(), Ordering::Relaxed);
    }
}

impl Clock for TestClock {
    fn now_s(&self) -> f64 {
        f64::from_bits(self.seconds_bits.load(Ordering::Relaxed))
    }
}

/// Shareable clock handle, the form the accumulator stores.
pub type SharedClock = Arc<dyn Clock>;

/// Construct the default real-time clock.
pub fn real_clock() -> SharedClock {
    Arc::new(RealClock::new())
}

/// Construct a test clock starting at t=0.
pub fn test_clock() -> SharedClock {
    Arc::new(TestClock::new())
}

/// Construct a test clock starting at a specific time.
pub fn test_clock_at(start_s: f64) -> SharedClock {
    Arc::new(TestClock::new_at(start_s))
}
