//! Type-state builder for `FaderLoop`.
//!
//! The builder enforces at compile time that an ADC and a motor are provided
//! before `spawn()` is available. `try_spawn()` is always available for
//! dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use fader_traits::{Adc, Clock, Motor, MonotonicClock};

use crate::calibration::CalibrationTable;
use crate::config::{ControlCfg, SafetyCfg, SamplerCfg};
use crate::error::{BuildError, Result};
use crate::runner::{FaderLoop, LoopConfig};

pub type BoxedAdc = Box<dyn Adc + Send>;
pub type BoxedMotor = Box<dyn Motor + Send>;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for a running control loop. Unset parts fall back to defaults.
pub struct FaderBuilder<A, M> {
    adc: Option<BoxedAdc>,
    motor: Option<BoxedMotor>,
    table: Option<CalibrationTable>,
    cfg: LoopConfig,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    _a: PhantomData<A>,
    _m: PhantomData<M>,
}

impl Default for FaderBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            adc: None,
            motor: None,
            table: None,
            cfg: LoopConfig::default(),
            clock: None,
            _a: PhantomData,
            _m: PhantomData,
        }
    }
}

impl FaderBuilder<Missing, Missing> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<A, M> FaderBuilder<A, M> {
    /// Fallible spawn available in any type-state; reports missing pieces.
    pub fn try_spawn(self) -> Result<FaderLoop> {
        let adc = self
            .adc
            .ok_or_else(|| eyre::Report::new(BuildError::MissingAdc))?;
        let motor = self
            .motor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingMotor))?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        FaderLoop::spawn(adc, motor, self.table.unwrap_or_default(), self.cfg, clock)
    }

    pub fn with_table(mut self, table: CalibrationTable) -> Self {
        self.table = Some(table);
        self
    }
    pub fn with_sampler(mut self, sampler: SamplerCfg) -> Self {
        self.cfg.sampler = sampler;
        self
    }
    pub fn with_control(mut self, control: ControlCfg) -> Self {
        self.cfg.control = control;
        self
    }
    pub fn with_safety(mut self, safety: SafetyCfg) -> Self {
        self.cfg.safety = safety;
        self
    }
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.cfg.event_capacity = capacity;
        self
    }
    pub fn with_loop_config(mut self, cfg: LoopConfig) -> Self {
        self.cfg = cfg;
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

impl<M> FaderBuilder<Missing, M> {
    pub fn with_adc(self, adc: impl Adc + Send + 'static) -> FaderBuilder<Set, M> {
        FaderBuilder {
            adc: Some(Box::new(adc)),
            motor: self.motor,
            table: self.table,
            cfg: self.cfg,
            clock: self.clock,
            _a: PhantomData,
            _m: PhantomData,
        }
    }
}

impl<A> FaderBuilder<A, Missing> {
    pub fn with_motor(self, motor: impl Motor + Send + 'static) -> FaderBuilder<A, Set> {
        FaderBuilder {
            adc: self.adc,
            motor: Some(Box::new(motor)),
            table: self.table,
            cfg: self.cfg,
            clock: self.clock,
            _a: PhantomData,
            _m: PhantomData,
        }
    }
}

impl FaderBuilder<Set, Set> {
    /// Validate and start the loop. Only available when ADC and motor are set.
    pub fn spawn(self) -> Result<FaderLoop> {
        self.try_spawn()
    }
}
