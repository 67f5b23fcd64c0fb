//! Time source for the fader's paced loops.
//!
//! The sampler, the calibration procedures and the raw monitor all pace
//! themselves with `Clock::sleep` and timestamp samples with `Clock::now`.
//! Production code uses [`MonotonicClock`]; tests inject
//! `test_clock::TestClock`, whose sleeps only move simulated time forward.
use std::thread;
use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Instant;
    /// Block for one sampling period (or any other pause).
    fn sleep(&self, d: Duration);
}

/// Wall-clock time from `std::time::Instant`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if !d.is_zero() {
            thread::sleep(d);
        }
    }
}

#[cfg(any(test, feature = "test-clock"))]
pub mod test_clock {
    use super::{Clock, Duration, Instant};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct Simulated {
        elapsed: Duration,
        sleeps: usize,
    }

    /// Simulated time shared between a test and the code under test.
    ///
    /// Clones observe the same timeline, so a test can hand one clone to a
    /// sampler or `Calibrator` and inspect the pacing through another.
    #[derive(Debug, Clone)]
    pub struct TestClock {
        origin: Instant,
        sim: Arc<Mutex<Simulated>>,
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TestClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                sim: Arc::new(Mutex::new(Simulated::default())),
            }
        }

        /// Move simulated time forward without counting a sleep, e.g. to let
        /// a controller cooldown expire between steps.
        pub fn advance(&self, d: Duration) {
            if let Ok(mut sim) = self.sim.lock() {
                sim.elapsed = sim.elapsed.saturating_add(d);
            }
        }

        /// Simulated time since the clock was created.
        pub fn elapsed(&self) -> Duration {
            self.sim.lock().map(|s| s.elapsed).unwrap_or_default()
        }

        /// Number of `Clock::sleep` calls made so far.
        pub fn sleeps(&self) -> usize {
            self.sim.lock().map(|s| s.sleeps).unwrap_or_default()
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.origin + self.elapsed()
        }

        fn sleep(&self, d: Duration) {
            if let Ok(mut sim) = self.sim.lock() {
                sim.elapsed = sim.elapsed.saturating_add(d);
                sim.sleeps += 1;
            }
        }
    }
}
