//! Closed-loop seek controller.
//!
//! Fed one calibrated position per sample. While a goal is set it picks a
//! direction and a speed tier, stops once within the settle threshold, and
//! brakes if the knob stops moving while driven. Actuator commands are only
//! issued when they differ from the last one sent.
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use fader_traits::Motor;

use crate::actuator::{Direction, MotorGuard};
use crate::config::{ControlCfg, SafetyCfg};
use crate::error::{BuildError, Result};
use crate::goal::GoalHandle;
use crate::status::{ControllerState, FaderEvent};

#[derive(Debug)]
pub struct SeekController {
    /// `(min_distance, speed)`, sorted descending by distance.
    bands: Vec<(f32, u8)>,
    settle: f32,
    cooldown: Duration,
    safety: SafetyCfg,
    window: VecDeque<f32>,
    state: ControllerState,
    /// Goal value being sought, as read from the handle.
    active: Option<f32>,
    last_speed: Option<u8>,
    last_dir: Option<Direction>,
    stopped_at: Option<Instant>,
}

impl SeekController {
    pub fn new(control: &ControlCfg, safety: &SafetyCfg) -> std::result::Result<Self, BuildError> {
        if control.speed_bands.is_empty() {
            return Err(BuildError::InvalidConfig("speed_bands must not be empty"));
        }
        if control
            .speed_bands
            .iter()
            .any(|&(thr, speed)| !thr.is_finite() || thr <= 0.0 || speed == 0 || speed > 100)
        {
            return Err(BuildError::InvalidConfig(
                "speed_bands entries must have threshold > 0 and speed in 1..=100",
            ));
        }
        let mut bands = control.speed_bands.clone();
        bands.sort_by(|a, b| b.0.total_cmp(&a.0));
        if bands.windows(2).any(|w| w[1].1 > w[0].1) {
            return Err(BuildError::InvalidConfig(
                "speed_bands must not speed up closer to the goal",
            ));
        }
        if safety.window < 2 {
            return Err(BuildError::InvalidConfig("safety window must be >= 2"));
        }
        if !safety.min_span.is_finite() || safety.min_span <= 0.0 {
            return Err(BuildError::InvalidConfig("safety min_span must be > 0"));
        }
        let settle = bands.last().map_or(1.0, |b| b.0);
        Ok(Self {
            bands,
            settle,
            cooldown: control.cooldown,
            safety: safety.clone(),
            window: VecDeque::with_capacity(safety.window),
            state: ControllerState::Idle,
            active: None,
            last_speed: None,
            last_dir: None,
            stopped_at: None,
        })
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Whether the motor is currently being driven toward a goal.
    pub fn is_seeking(&self) -> bool {
        self.state == ControllerState::Seeking
    }

    /// Distance below which the goal counts as reached.
    pub fn settle_threshold(&self) -> f32 {
        self.settle
    }

    /// Speed tier for a distance to goal; 0 means arrived.
    pub fn speed_for(&self, distance: f32) -> u8 {
        self.bands
            .iter()
            .find(|(thr, _)| distance >= *thr)
            .map_or(0, |&(_, speed)| speed)
    }

    /// Process one position sample.
    pub fn step<M: Motor>(
        &mut self,
        motor: &mut MotorGuard<M>,
        position: f32,
        goal: &GoalHandle,
        now: Instant,
    ) -> Result<Option<FaderEvent>> {
        if matches!(
            self.state,
            ControllerState::Settling | ControllerState::SafetyStopped
        ) && self.cooldown_elapsed(now)
        {
            tracing::debug!(from = ?self.state, "cooldown elapsed");
            self.state = ControllerState::Idle;
        }

        let Some(target) = goal.get() else {
            if self.state == ControllerState::Seeking {
                self.command(motor, 0, Direction::Brake)?;
                self.stop(ControllerState::Settling, now);
                tracing::info!(position, "seek cancelled");
                return Ok(Some(FaderEvent::Cancelled { position }));
            }
            if self.state == ControllerState::Idle {
                return Ok(Some(FaderEvent::Position(position)));
            }
            return Ok(None);
        };

        if self.state != ControllerState::Seeking || self.active != Some(target) {
            self.window.clear();
            self.active = Some(target);
            self.state = ControllerState::Seeking;
            tracing::info!(goal = target, position, "seek start");
        }

        let clamped = target.clamp(0.0, 100.0);
        let distance = (clamped - position).abs();
        let speed = self.speed_for(distance);
        if speed == 0 {
            self.command(motor, 0, Direction::Brake)?;
            if !goal.clear_if(target) {
                tracing::debug!("goal replaced during arrival; keeping new goal");
            }
            self.stop(ControllerState::Settling, now);
            tracing::info!(goal = clamped, position, "arrived");
            return Ok(Some(FaderEvent::Arrived {
                goal: clamped,
                position,
            }));
        }

        if self.window.len() == self.safety.window {
            self.window.pop_front();
        }
        self.window.push_back(position);
        if self.window.len() == self.safety.window
            && let Some((lo, hi)) = crate::util::span(self.window.iter().copied())
            && hi - lo < self.safety.min_span
        {
            self.command(motor, 0, Direction::Brake)?;
            goal.clear_if(target);
            self.stop(ControllerState::SafetyStopped, now);
            tracing::warn!(goal = clamped, position, span = hi - lo, "safety stop: fader not moving");
            return Ok(Some(FaderEvent::SafetyStop {
                goal: clamped,
                position,
            }));
        }

        let dir = if clamped > position {
            Direction::Forward
        } else {
            Direction::Backward
        };
        tracing::trace!(position, goal = clamped, distance, speed, ?dir, "seek step");
        self.command(motor, speed, dir)?;
        Ok(None)
    }

    fn cooldown_elapsed(&self, now: Instant) -> bool {
        self.stopped_at
            .is_none_or(|t| now.saturating_duration_since(t) >= self.cooldown)
    }

    fn stop(&mut self, state: ControllerState, now: Instant) {
        self.state = state;
        self.active = None;
        self.window.clear();
        self.stopped_at = Some(now);
    }

    /// Speed first, then direction; each only when it changed.
    fn command<M: Motor>(
        &mut self,
        motor: &mut MotorGuard<M>,
        speed: u8,
        dir: Direction,
    ) -> Result<()> {
        if self.last_speed != Some(speed) {
            motor.set_speed(speed)?;
            self.last_speed = Some(speed);
        }
        if self.last_dir != Some(dir) {
            motor.drive(dir)?;
            self.last_dir = Some(dir);
        }
        Ok(())
    }
}
