//! Motor direction dispatch and the scoped enable guard.

use fader_traits::Motor;

use crate::error::Result;
use crate::hw_error::report;

/// Drive command for the H-bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    Brake,
}

/// Issue `dir` on `motor`.
pub fn drive<M: Motor + ?Sized>(motor: &mut M, dir: Direction) -> Result<()> {
    let r = match dir {
        Direction::Forward => motor.forward(),
        Direction::Backward => motor.backward(),
        Direction::Brake => motor.brake(),
    };
    r.map_err(|e| report(e.as_ref()))
}

/// Keeps the motor driver awake for its lifetime.
///
/// `wake` enables the driver; dropping the guard brakes and disables it, on
/// every exit path including `?` returns and unwinding panics.
#[derive(Debug)]
pub struct MotorGuard<M: Motor> {
    motor: M,
}

impl<M: Motor> MotorGuard<M> {
    pub fn wake(mut motor: M) -> Result<Self> {
        motor.enable(true).map_err(|e| report(e.as_ref()))?;
        tracing::debug!("motor enabled");
        Ok(Self { motor })
    }

    pub fn set_speed(&mut self, percent: u8) -> Result<()> {
        self.motor
            .set_speed(percent.min(100))
            .map_err(|e| report(e.as_ref()))
    }

    pub fn drive(&mut self, dir: Direction) -> Result<()> {
        drive(&mut self.motor, dir)
    }

    /// Speed 0 and brake, in that order.
    pub fn halt(&mut self) -> Result<()> {
        self.set_speed(0)?;
        self.drive(Direction::Brake)
    }
}

impl<M: Motor> Drop for MotorGuard<M> {
    fn drop(&mut self) {
        if let Err(e) = self.motor.set_speed(0) {
            tracing::warn!(error = %e, "motor speed reset failed during cleanup");
        }
        match self.motor.enable(false) {
            Ok(()) => tracing::debug!("motor disabled"),
            Err(e) => tracing::warn!(error = %e, "motor disable failed during cleanup"),
        }
    }
}
