//! Fixed-cadence position sampling.
//!
//! `PositionSampler` is a lazy, infinite iterator: every step sleeps one
//! period on the injected clock, reads the ADC, quantizes the reading and
//! passes it through the idle noise filter. It ends when the shutdown flag
//! is raised, which is checked before and after each sleep.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use fader_traits::{Adc, Clock};

use crate::error::Result;
use crate::goal::GoalHandle;
use crate::hw_error::report;

/// Quantized ADC sample, 0..=1023.
pub type RawTick = u16;

/// Drop the six noise bits of a left-aligned 16-bit sample.
#[inline]
pub fn quantize(raw: u16) -> RawTick {
    raw >> 6
}

/// Read one quantized tick, mapping trait-boundary errors.
pub fn read_tick<A: Adc + ?Sized>(adc: &mut A) -> Result<RawTick> {
    adc.read()
        .map(quantize)
        .map_err(|e| report(e.as_ref()))
}

/// One emitted position sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub tick: RawTick,
    pub at: Instant,
}

/// Noise-tolerance filter for idle readings.
///
/// A tick is admitted when it differs from the last admitted tick by more
/// than `tolerance`, or unconditionally when `forced`.
#[derive(Debug, Clone)]
pub struct DebounceFilter {
    last_read: RawTick,
    tolerance: u16,
}

impl DebounceFilter {
    pub fn new(tolerance: u16) -> Self {
        Self {
            last_read: 0,
            tolerance,
        }
    }

    pub fn last_read(&self) -> RawTick {
        self.last_read
    }

    pub fn admit(&mut self, tick: RawTick, forced: bool) -> bool {
        if forced || tick.abs_diff(self.last_read) > self.tolerance {
            self.last_read = tick;
            true
        } else {
            false
        }
    }
}

pub struct PositionSampler<A> {
    adc: A,
    clock: Arc<dyn Clock + Send + Sync>,
    period: Duration,
    filter: DebounceFilter,
    goal: GoalHandle,
    shutdown: Arc<AtomicBool>,
    forced: bool,
    failed: bool,
}

impl<A: Adc> PositionSampler<A> {
    pub fn new(
        adc: A,
        clock: Arc<dyn Clock + Send + Sync>,
        period: Duration,
        tolerance: u16,
        goal: GoalHandle,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            adc,
            clock,
            period,
            filter: DebounceFilter::new(tolerance),
            goal,
            shutdown,
            forced: false,
            failed: false,
        }
    }

    /// Emit every sample regardless of the noise filter (e.g. while the motor
    /// is still being driven after the goal was withdrawn).
    pub fn force(&mut self, on: bool) {
        self.forced = on;
    }

    fn stopped(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

impl<A: Adc> Iterator for PositionSampler<A> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if self.stopped() {
                tracing::debug!("sampler received shutdown signal");
                return None;
            }
            self.clock.sleep(self.period);
            if self.stopped() {
                tracing::debug!("sampler received shutdown signal");
                return None;
            }
            let tick = match read_tick(&mut self.adc) {
                Ok(t) => t,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            };
            let forced = self.forced || self.goal.is_set();
            if self.filter.admit(tick, forced) {
                tracing::trace!(tick, forced, "sample");
                return Some(Ok(Sample {
                    tick,
                    at: self.clock.now(),
                }));
            }
        }
    }
}

/// Raw diagnostic stream: yields a tick only when it differs from the last one.
pub struct RawMonitor<A> {
    adc: A,
    clock: Arc<dyn Clock + Send + Sync>,
    period: Duration,
    last: Option<RawTick>,
    shutdown: Arc<AtomicBool>,
}

impl<A: Adc> RawMonitor<A> {
    pub fn new(
        adc: A,
        clock: Arc<dyn Clock + Send + Sync>,
        period: Duration,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            adc,
            clock,
            period,
            last: None,
            shutdown,
        }
    }
}

impl<A: Adc> Iterator for RawMonitor<A> {
    type Item = Result<RawTick>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return None;
            }
            // One read per period whether or not the value changed.
            self.clock.sleep(self.period);
            if self.shutdown.load(Ordering::Relaxed) {
                return None;
            }
            let tick = match read_tick(&mut self.adc) {
                Ok(t) => t,
                Err(e) => return Some(Err(e)),
            };
            if self.last != Some(tick) {
                self.last = Some(tick);
                return Some(Ok(tick));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::ScriptedAdc;
    use fader_traits::clock::test_clock::TestClock;

    fn sampler(adc: ScriptedAdc, goal: GoalHandle) -> (PositionSampler<ScriptedAdc>, TestClock) {
        let clock = TestClock::new();
        let s = PositionSampler::new(
            adc,
            Arc::new(clock.clone()),
            Duration::from_micros(15_625),
            4,
            goal,
            Arc::new(AtomicBool::new(false)),
        );
        (s, clock)
    }

    #[test]
    fn quantize_drops_low_bits() {
        assert_eq!(quantize(0xFFFF), 1023);
        assert_eq!(quantize(63), 0);
        assert_eq!(quantize(64), 1);
    }

    #[test]
    fn debounce_gates_small_idle_changes() {
        let mut f = DebounceFilter::new(4);
        assert!(f.admit(600, false));
        assert!(!f.admit(604, false));
        assert!(f.admit(605, false));
        assert!(f.admit(605, true));
        assert_eq!(f.last_read(), 605);
    }

    #[test]
    fn idle_noise_is_swallowed() {
        let adc = ScriptedAdc::new([600, 602, 598, 603, 620]);
        let (mut s, clock) = sampler(adc.clone(), GoalHandle::new());
        let first = s.next().unwrap().unwrap();
        assert_eq!(first.tick, 600);
        let next = s.next().unwrap().unwrap();
        assert_eq!(next.tick, 620);
        assert_eq!(adc.reads(), 5);
        assert_eq!(clock.elapsed(), Duration::from_micros(15_625 * 5));
    }

    #[test]
    fn goal_forces_emission() {
        let goal = GoalHandle::new();
        goal.set(Some(50.0));
        let (mut s, _) = sampler(ScriptedAdc::new([600, 601, 601]), goal);
        let ticks: Vec<_> = s.by_ref().take(3).map(|r| r.unwrap().tick).collect();
        assert_eq!(ticks, vec![600, 601, 601]);
    }

    #[test]
    fn shutdown_ends_iteration() {
        let adc = ScriptedAdc::new([600]);
        let flag = Arc::new(AtomicBool::new(true));
        let mut s = PositionSampler::new(
            adc.clone(),
            Arc::new(TestClock::new()),
            Duration::from_millis(1),
            4,
            GoalHandle::new(),
            flag,
        );
        assert!(s.next().is_none());
        assert_eq!(adc.reads(), 0);
    }

    #[test]
    fn read_error_is_yielded_once() {
        let adc = ScriptedAdc::new([600]).fail_after(1);
        let (mut s, _) = sampler(adc, GoalHandle::new());
        assert!(s.next().unwrap().is_ok());
        assert!(s.next().unwrap().is_err());
        assert!(s.next().is_none());
    }

    #[test]
    fn raw_monitor_reports_changes_only() {
        let adc = ScriptedAdc::new([10, 10, 11, 11, 11, 9]);
        let mut m = RawMonitor::new(
            adc,
            Arc::new(TestClock::new()),
            Duration::from_millis(1),
            Arc::new(AtomicBool::new(false)),
        );
        let got: Vec<_> = m.by_ref().take(3).map(|r| r.unwrap()).collect();
        assert_eq!(got, vec![10, 11, 9]);
    }

    #[test]
    fn raw_monitor_paces_every_read() {
        let adc = ScriptedAdc::new([10, 11, 12, 13, 14, 15]);
        let clock = TestClock::new();
        let m = RawMonitor::new(
            adc.clone(),
            Arc::new(clock.clone()),
            Duration::from_millis(15),
            Arc::new(AtomicBool::new(false)),
        );
        let got: Vec<_> = m.take(6).map(|r| r.unwrap()).collect();
        assert_eq!(got, vec![10, 11, 12, 13, 14, 15]);
        assert_eq!(adc.reads(), 6);
        assert_eq!(clock.sleeps(), 6);
        assert_eq!(clock.elapsed(), Duration::from_millis(15 * 6));
    }
}
