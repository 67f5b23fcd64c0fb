//! Calibration procedures: end-stop search, table regeneration, timed sweeps
//! and a slow resolution crawl.
//!
//! The procedures take ownership of the ADC and motor for their duration and
//! must not run while a control loop is active. Each one wakes the motor
//! through a [`MotorGuard`], so the driver is disabled on every exit path.
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::WrapErr;
use fader_traits::{Adc, Clock, Motor};

use crate::actuator::{Direction, MotorGuard};
use crate::calibration::{CalibrationTable, POINTS};
use crate::config::{BoundsCfg, CrawlCfg, SweepCfg};
use crate::error::{FaderError, Result};
use crate::sampler::{RawTick, read_tick};
use crate::util::span;

/// Travel direction of a timed sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepDirection {
    /// Bottom to top, crossing 0%, 10%, ..., 100%.
    Forward,
    /// Top to bottom, crossing 100%, 90%, ..., 0%.
    Backward,
}

/// A break-point reached during a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    pub percent: u8,
    pub tick: RawTick,
    /// Time since the sweep started.
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub direction: SweepDirection,
    pub crossings: Vec<Crossing>,
    /// The knob stopped moving before every break-point was crossed.
    pub stalled: bool,
}

/// One reading taken during a crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlStep {
    pub tick: RawTick,
    /// Change since the previous reading.
    pub delta: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlReport {
    /// Reading taken before the motor started.
    pub start: RawTick,
    pub steps: Vec<CrawlStep>,
}

pub struct Calibrator<A, M> {
    adc: A,
    motor: M,
    clock: Arc<dyn Clock + Send + Sync>,
    bounds: BoundsCfg,
    sweep: SweepCfg,
    crawl: CrawlCfg,
    cancel: Arc<AtomicBool>,
}

impl<A: Adc, M: Motor> Calibrator<A, M> {
    pub fn new(
        adc: A,
        motor: M,
        clock: Arc<dyn Clock + Send + Sync>,
        bounds: BoundsCfg,
        sweep: SweepCfg,
    ) -> Self {
        Self {
            adc,
            motor,
            clock,
            bounds,
            sweep,
            crawl: CrawlCfg::default(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_crawl(mut self, crawl: CrawlCfg) -> Self {
        self.crawl = crawl;
        self
    }

    /// Abort procedures with [`FaderError::Cancelled`] once `flag` is raised.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    pub fn into_parts(self) -> (A, M) {
        (self.adc, self.motor)
    }

    fn check_cancel(&self) -> Result<()> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(eyre::Report::new(FaderError::Cancelled));
        }
        Ok(())
    }

    /// Drive to the bottom end stop and return the tick it rests at.
    pub fn bounds_test(&mut self) -> Result<RawTick> {
        let cfg = self.bounds.clone();
        let mut guard = MotorGuard::wake(&mut self.motor)?;
        guard.drive(Direction::Backward)?;
        guard.set_speed(100)?;

        let mut window = VecDeque::with_capacity(cfg.window);
        for _ in 0..cfg.max_samples {
            if self.cancel.load(Ordering::Relaxed) {
                tracing::info!("bounds test cancelled");
                return Err(eyre::Report::new(FaderError::Cancelled));
            }
            let tick = read_tick(&mut self.adc).wrap_err("bounds test read")?;
            if window.len() == cfg.window {
                window.pop_front();
            }
            window.push_back(tick);
            if window.len() == cfg.window
                && let Some((lo, hi)) = span(window.iter().copied())
                && hi - lo < cfg.span_ticks
            {
                guard.halt()?;
                tracing::info!(test_min = tick, "bottom end stop found");
                return Ok(tick);
            }
            self.clock.sleep(cfg.period);
        }
        tracing::warn!(samples = cfg.max_samples, "bounds test did not converge");
        Err(eyre::Report::new(FaderError::CalibrationTimeout {
            samples: cfg.max_samples,
        }))
    }

    /// Measure the bottom end stop and derive a new table from `table`.
    ///
    /// `table` is never modified; on failure the caller keeps using it.
    pub fn interp_shift(&mut self, table: &CalibrationTable) -> Result<CalibrationTable> {
        let test_min = self.bounds_test()?;
        let shifted = table
            .shift_minimum(test_min)
            .map_err(eyre::Report::new)
            .wrap_err_with(|| format!("regenerate table from test_min {test_min}"))?;
        tracing::info!(
            test_min,
            delta = i32::from(test_min) - i32::from(table.nominal()[0]),
            points = ?shifted.points(),
            "calibration table regenerated"
        );
        Ok(shifted)
    }

    /// Drive across the whole travel at full speed, timing each break-point.
    pub fn sweep(
        &mut self,
        table: &CalibrationTable,
        direction: SweepDirection,
    ) -> Result<SweepReport> {
        self.check_cancel()?;
        let cfg = self.sweep.clone();
        let points = *table.points();
        let mut guard = MotorGuard::wake(&mut self.motor)?;
        guard.drive(match direction {
            SweepDirection::Forward => Direction::Forward,
            SweepDirection::Backward => Direction::Backward,
        })?;
        guard.set_speed(100)?;

        // Break-point indices in crossing order.
        let order: Vec<usize> = match direction {
            SweepDirection::Forward => (0..POINTS).collect(),
            SweepDirection::Backward => (0..POINTS).rev().collect(),
        };
        let mut next = 0usize;
        let mut crossings = Vec::with_capacity(POINTS);
        let mut window = VecDeque::with_capacity(cfg.window);
        let start = self.clock.now();

        for _ in 0..cfg.max_samples {
            if self.cancel.load(Ordering::Relaxed) {
                tracing::info!(?direction, "sweep cancelled");
                return Err(eyre::Report::new(FaderError::Cancelled));
            }
            let tick = read_tick(&mut self.adc).wrap_err("sweep read")?;
            let elapsed = self.clock.now().saturating_duration_since(start);
            while let Some(&k) = order.get(next) {
                let crossed = match direction {
                    SweepDirection::Forward => tick >= points[k],
                    SweepDirection::Backward => tick <= points[k],
                };
                if !crossed {
                    break;
                }
                let percent = u8::try_from(k * 10).unwrap_or(u8::MAX);
                tracing::info!(percent, tick, elapsed_ms = elapsed.as_secs_f64() * 1e3, "crossed");
                crossings.push(Crossing {
                    percent,
                    tick,
                    elapsed,
                });
                next += 1;
            }
            if next == order.len() {
                guard.halt()?;
                return Ok(SweepReport {
                    direction,
                    crossings,
                    stalled: false,
                });
            }
            tracing::trace!(tick, next = order[next] * 10, "sweep sample");

            if window.len() == cfg.window {
                window.pop_front();
            }
            window.push_back(tick);
            if window.len() == cfg.window
                && let Some((lo, hi)) = span(window.iter().copied())
                && hi - lo < cfg.span_ticks
            {
                guard.halt()?;
                tracing::warn!(?direction, tick, crossed = crossings.len(), "sweep stalled");
                return Ok(SweepReport {
                    direction,
                    crossings,
                    stalled: true,
                });
            }
            self.clock.sleep(cfg.period);
        }
        Err(eyre::Report::new(FaderError::CalibrationTimeout {
            samples: cfg.max_samples,
        }))
    }

    /// Creep forward at low duty until `until` is reached, recording how far
    /// the reading moves between samples.
    pub fn crawl(&mut self) -> Result<CrawlReport> {
        self.check_cancel()?;
        let cfg = self.crawl.clone();
        let start = read_tick(&mut self.adc).wrap_err("crawl read")?;
        if start >= cfg.until {
            tracing::info!(start, until = cfg.until, "already past crawl target");
            return Ok(CrawlReport {
                start,
                steps: Vec::new(),
            });
        }
        let mut guard = MotorGuard::wake(&mut self.motor)?;
        guard.drive(Direction::Forward)?;
        guard.set_speed(cfg.speed)?;

        let mut prev = start;
        let mut steps = Vec::new();
        for _ in 0..cfg.max_samples {
            self.clock.sleep(cfg.period);
            if self.cancel.load(Ordering::Relaxed) {
                tracing::info!(samples = steps.len(), "crawl cancelled");
                return Err(eyre::Report::new(FaderError::Cancelled));
            }
            let tick = read_tick(&mut self.adc).wrap_err("crawl read")?;
            let delta = i32::from(tick) - i32::from(prev);
            tracing::debug!(tick, delta, "crawl step");
            steps.push(CrawlStep { tick, delta });
            prev = tick;
            if tick >= cfg.until {
                guard.halt()?;
                tracing::info!(start, end = tick, samples = steps.len(), "crawl finished");
                return Ok(CrawlReport { start, steps });
            }
        }
        tracing::warn!(samples = cfg.max_samples, until = cfg.until, "crawl did not reach target");
        Err(eyre::Report::new(FaderError::CalibrationTimeout {
            samples: cfg.max_samples,
        }))
    }
}
