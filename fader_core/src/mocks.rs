//! Test and helper mocks for fader_core.
//!
//! `ScriptedAdc` replays raw ticks; `RecordingMotor` logs every command so
//! tests can assert on actuator traffic. Both are cheap to clone and clones
//! share state.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use fader_traits::{Adc, HwResult, Motor};

use crate::sampler::RawTick;

/// ADC that replays a fixed sequence of raw ticks, then repeats the last one.
#[derive(Debug, Clone)]
pub struct ScriptedAdc {
    inner: Arc<Mutex<AdcScript>>,
}

#[derive(Debug)]
struct AdcScript {
    queue: VecDeque<RawTick>,
    last: RawTick,
    reads: usize,
    fail_after: Option<usize>,
}

impl ScriptedAdc {
    pub fn new<I: IntoIterator<Item = RawTick>>(ticks: I) -> Self {
        let queue: VecDeque<RawTick> = ticks.into_iter().collect();
        let last = queue.front().copied().unwrap_or(0);
        Self {
            inner: Arc::new(Mutex::new(AdcScript {
                queue,
                last,
                reads: 0,
                fail_after: None,
            })),
        }
    }

    /// Fail every read after `n` successful ones.
    pub fn fail_after(self, n: usize) -> Self {
        if let Ok(mut s) = self.inner.lock() {
            s.fail_after = Some(n);
        }
        self
    }

    /// Append ticks to the script.
    pub fn push<I: IntoIterator<Item = RawTick>>(&self, ticks: I) {
        if let Ok(mut s) = self.inner.lock() {
            s.queue.extend(ticks);
        }
    }

    pub fn reads(&self) -> usize {
        self.inner.lock().map(|s| s.reads).unwrap_or(0)
    }
}

impl Adc for ScriptedAdc {
    fn read(&mut self) -> HwResult<u16> {
        let mut s = self
            .inner
            .lock()
            .map_err(|_| std::io::Error::other("scripted adc poisoned"))?;
        if s.fail_after.is_some_and(|n| s.reads >= n) {
            return Err(Box::new(std::io::Error::other("scripted adc failure")));
        }
        s.reads += 1;
        if let Some(t) = s.queue.pop_front() {
            s.last = t;
        }
        // Left-aligned 16-bit sample, low bits noisy like a real converter.
        Ok((s.last << 6) | 0x15)
    }
}

/// One command received by [`RecordingMotor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorCall {
    Enable(bool),
    Forward,
    Backward,
    Brake,
    Speed(u8),
}

/// Motor that records every command.
#[derive(Debug, Clone, Default)]
pub struct RecordingMotor {
    inner: Arc<Mutex<MotorLog>>,
}

#[derive(Debug, Default)]
struct MotorLog {
    calls: Vec<MotorCall>,
    enabled: bool,
    fail_enable: bool,
    fail_motion: bool,
}

impl RecordingMotor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<MotorCall> {
        self.inner.lock().map(|l| l.calls.clone()).unwrap_or_default()
    }

    /// Commands other than enable/disable.
    pub fn motion_calls(&self) -> Vec<MotorCall> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, MotorCall::Enable(_)))
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut l) = self.inner.lock() {
            l.calls.clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.lock().map(|l| l.enabled).unwrap_or(false)
    }

    /// Make `enable(true)` fail.
    pub fn fail_on_enable(&self) {
        if let Ok(mut l) = self.inner.lock() {
            l.fail_enable = true;
        }
    }

    /// Make direction and speed commands fail.
    pub fn fail_on_motion(&self) {
        if let Ok(mut l) = self.inner.lock() {
            l.fail_motion = true;
        }
    }

    fn record(&self, call: MotorCall) -> HwResult<()> {
        let mut l = self
            .inner
            .lock()
            .map_err(|_| std::io::Error::other("recording motor poisoned"))?;
        match call {
            MotorCall::Enable(true) if l.fail_enable => {
                return Err(Box::new(std::io::Error::other("motor enable failed")));
            }
            MotorCall::Enable(on) => l.enabled = on,
            _ if l.fail_motion => {
                return Err(Box::new(std::io::Error::other("motor command failed")));
            }
            _ => {}
        }
        l.calls.push(call);
        Ok(())
    }
}

impl Motor for RecordingMotor {
    fn enable(&mut self, on: bool) -> HwResult<()> {
        self.record(MotorCall::Enable(on))
    }
    fn forward(&mut self) -> HwResult<()> {
        self.record(MotorCall::Forward)
    }
    fn backward(&mut self) -> HwResult<()> {
        self.record(MotorCall::Backward)
    }
    fn brake(&mut self) -> HwResult<()> {
        self.record(MotorCall::Brake)
    }
    fn set_speed(&mut self, percent: u8) -> HwResult<()> {
        self.record(MotorCall::Speed(percent))
    }
}
