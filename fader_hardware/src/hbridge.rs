//! Dual H-bridge driver (TB6612FNG style) for the fader motor.
//!
//! | IN1 | IN2 | STBY | Motor state   |
//! |-----|-----|------|---------------|
//! | 1   | 0   | 1    | Forward       |
//! | 0   | 1   | 1    | Backward      |
//! | 1   | 1   | 1    | Short brake   |
//! | x   | x   | 0    | Standby/sleep |
//!
//! Speed is a software PWM duty cycle on the PWM input.
use rppal::gpio::{Gpio, OutputPin};

use crate::error::{HwError, Result};

pub struct HBridgeMotor {
    in1: OutputPin,
    in2: OutputPin,
    pwm: OutputPin,
    standby: OutputPin,
    pwm_frequency_hz: f64,
}

impl HBridgeMotor {
    pub fn new(in1: u8, in2: u8, pwm: u8, standby: u8, pwm_frequency_hz: f64) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))?;
        let out = |pin: u8| -> Result<OutputPin> {
            Ok(gpio
                .get(pin)
                .map_err(|e| HwError::Gpio(format!("open motor pin {pin}: {e}")))?
                .into_output_low())
        };
        Ok(Self {
            in1: out(in1)?,
            in2: out(in2)?,
            pwm: out(pwm)?,
            standby: out(standby)?,
            pwm_frequency_hz,
        })
    }
}

impl fader_traits::Motor for HBridgeMotor {
    fn enable(&mut self, on: bool) -> fader_traits::HwResult<()> {
        if on {
            self.standby.set_high();
        } else {
            self.pwm
                .clear_pwm()
                .map_err(|e| HwError::Gpio(e.to_string()))?;
            self.pwm.set_low();
            self.standby.set_low();
        }
        tracing::debug!(on, "h-bridge standby");
        Ok(())
    }

    fn forward(&mut self) -> fader_traits::HwResult<()> {
        self.in1.set_high();
        self.in2.set_low();
        Ok(())
    }

    fn backward(&mut self) -> fader_traits::HwResult<()> {
        self.in1.set_low();
        self.in2.set_high();
        Ok(())
    }

    fn brake(&mut self) -> fader_traits::HwResult<()> {
        self.in1.set_high();
        self.in2.set_high();
        Ok(())
    }

    fn set_speed(&mut self, percent: u8) -> fader_traits::HwResult<()> {
        let duty = f64::from(percent.min(100)) / 100.0;
        self.pwm
            .set_pwm_frequency(self.pwm_frequency_hz, duty)
            .map_err(|e| HwError::Gpio(e.to_string()))?;
        Ok(())
    }
}
