pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod hbridge;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod mcp3008;

use fader_traits::{Adc, HwResult, Motor};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::HwError;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use hbridge::HBridgeMotor;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use mcp3008::Mcp3008;

/// Physical parameters of the simulated fader, in raw ticks (0..=1023).
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Knob position when the simulation starts.
    pub start_tick: f32,
    /// Mechanical end stop at the bottom of travel.
    pub min_stop: f32,
    /// Mechanical end stop at the top of travel.
    pub max_stop: f32,
    /// Distance covered per ADC read at 100% duty.
    pub ticks_per_read: f32,
    /// Knob jammed: the motor draws current but nothing moves.
    pub stuck: bool,
    /// Fail every read after this many successful ones.
    pub fail_after: Option<usize>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            start_tick: 520.0,
            min_stop: 480.0,
            max_stop: 1023.0,
            ticks_per_read: 4.0,
            stuck: false,
            fail_after: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drive {
    Coast,
    Forward,
    Backward,
    Brake,
}

#[derive(Debug)]
struct SimState {
    tick: f32,
    enabled: bool,
    drive: Drive,
    speed: u8,
    reads: usize,
}

/// Simulated motorized fader: one shared physical model behind an ADC and a motor.
///
/// The model advances on every ADC read, so the simulation runs at whatever
/// cadence the caller samples at.
#[derive(Debug, Clone)]
pub struct SimulatedFader {
    state: Arc<Mutex<SimState>>,
    cfg: SimConfig,
}

impl Default for SimulatedFader {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl SimulatedFader {
    pub fn new(cfg: SimConfig) -> Self {
        let tick = cfg.start_tick.clamp(cfg.min_stop, cfg.max_stop);
        Self {
            state: Arc::new(Mutex::new(SimState {
                tick,
                enabled: false,
                drive: Drive::Coast,
                speed: 0,
                reads: 0,
            })),
            cfg,
        }
    }

    pub fn adc(&self) -> SimulatedAdc {
        SimulatedAdc {
            fader: self.clone(),
        }
    }

    pub fn motor(&self) -> SimulatedMotor {
        SimulatedMotor {
            fader: self.clone(),
        }
    }

    /// Current knob position in raw ticks.
    pub fn tick(&self) -> f32 {
        self.state.lock().map(|s| s.tick).unwrap_or(f32::NAN)
    }

    /// Whether the driver is currently awake.
    pub fn is_enabled(&self) -> bool {
        self.state.lock().map(|s| s.enabled).unwrap_or(false)
    }

    /// Move the knob by hand.
    pub fn nudge_to(&self, tick: f32) {
        if let Ok(mut s) = self.state.lock() {
            s.tick = tick.clamp(self.cfg.min_stop, self.cfg.max_stop);
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SimState>, HwError> {
        self.state.lock().map_err(|_| HwError::Poisoned)
    }

    fn sample(&self) -> Result<u16, HwError> {
        let mut s = self.lock()?;
        if let Some(limit) = self.cfg.fail_after
            && s.reads >= limit
        {
            return Err(HwError::Timeout);
        }
        s.reads += 1;
        if s.enabled && !self.cfg.stuck {
            let step = self.cfg.ticks_per_read * f32::from(s.speed.min(100)) / 100.0;
            let delta = match s.drive {
                Drive::Forward => step,
                Drive::Backward => -step,
                Drive::Coast | Drive::Brake => 0.0,
            };
            s.tick = (s.tick + delta).clamp(self.cfg.min_stop, self.cfg.max_stop);
        }
        let tick = s.tick.round().clamp(0.0, 1023.0) as u16;
        tracing::trace!(tick, "simulated adc sample");
        // Left-align the 10-bit reading like a 16-bit converter would.
        Ok(tick << 6)
    }

    fn update(&self, f: impl FnOnce(&mut SimState)) -> Result<(), HwError> {
        let mut s = self.lock()?;
        f(&mut s);
        Ok(())
    }
}

/// ADC side of [`SimulatedFader`].
#[derive(Debug, Clone)]
pub struct SimulatedAdc {
    fader: SimulatedFader,
}

impl Adc for SimulatedAdc {
    fn read(&mut self) -> HwResult<u16> {
        Ok(self.fader.sample()?)
    }
}

/// Motor side of [`SimulatedFader`].
#[derive(Debug, Clone)]
pub struct SimulatedMotor {
    fader: SimulatedFader,
}

impl Motor for SimulatedMotor {
    fn enable(&mut self, on: bool) -> HwResult<()> {
        tracing::debug!(on, "simulated motor enable");
        Ok(self.fader.update(|s| {
            s.enabled = on;
            if !on {
                s.drive = Drive::Coast;
            }
        })?)
    }
    fn forward(&mut self) -> HwResult<()> {
        Ok(self.fader.update(|s| s.drive = Drive::Forward)?)
    }
    fn backward(&mut self) -> HwResult<()> {
        Ok(self.fader.update(|s| s.drive = Drive::Backward)?)
    }
    fn brake(&mut self) -> HwResult<()> {
        Ok(self.fader.update(|s| s.drive = Drive::Brake)?)
    }
    fn set_speed(&mut self, percent: u8) -> HwResult<()> {
        Ok(self.fader.update(|s| s.speed = percent.min(100))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_drive_moves_knob_up() {
        let sim = SimulatedFader::default();
        let mut adc = sim.adc();
        let mut motor = sim.motor();
        motor.enable(true).unwrap();
        motor.forward().unwrap();
        motor.set_speed(100).unwrap();
        let a = adc.read().unwrap();
        let b = adc.read().unwrap();
        assert!(b > a);
    }

    #[test]
    fn sleeping_motor_does_not_move() {
        let sim = SimulatedFader::default();
        let mut adc = sim.adc();
        let mut motor = sim.motor();
        motor.forward().unwrap();
        motor.set_speed(100).unwrap();
        let a = adc.read().unwrap();
        let b = adc.read().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn end_stop_holds_position() {
        let sim = SimulatedFader::new(SimConfig {
            start_tick: 482.0,
            ..SimConfig::default()
        });
        let mut adc = sim.adc();
        let mut motor = sim.motor();
        motor.enable(true).unwrap();
        motor.backward().unwrap();
        motor.set_speed(100).unwrap();
        for _ in 0..5 {
            adc.read().unwrap();
        }
        assert_eq!(adc.read().unwrap() >> 6, 480);
    }

    #[test]
    fn fail_after_reports_timeout() {
        let sim = SimulatedFader::new(SimConfig {
            fail_after: Some(1),
            ..SimConfig::default()
        });
        let mut adc = sim.adc();
        assert!(adc.read().is_ok());
        let err = adc.read().unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }
}
