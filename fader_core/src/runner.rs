//! Control loop orchestration.
//!
//! `run` drives sampler → calibration table → seek controller on the calling
//! thread until shutdown or an I/O error. `FaderLoop` runs it on a dedicated
//! thread and hands out the goal setter and the event stream.
//!
//! Safety: the motor is enabled by a `MotorGuard` for exactly the duration of
//! the loop, and the goal is cleared when the loop ends.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel as xch;
use eyre::WrapErr;
use fader_traits::{Adc, Clock, Motor};

use crate::actuator::MotorGuard;
use crate::calibration::CalibrationTable;
use crate::config::{ControlCfg, SafetyCfg, SamplerCfg};
use crate::controller::SeekController;
use crate::error::{BuildError, Result};
use crate::feed::PositionFeed;
use crate::goal::GoalHandle;
use crate::sampler::PositionSampler;
use crate::status::FaderEvent;

/// Everything the control loop needs besides hardware and calibration.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub sampler: SamplerCfg,
    pub control: ControlCfg,
    pub safety: SafetyCfg,
    /// Outgoing event queue length (drop-oldest when full).
    pub event_capacity: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            sampler: SamplerCfg::default(),
            control: ControlCfg::default(),
            safety: SafetyCfg::default(),
            event_capacity: 16,
        }
    }
}

impl LoopConfig {
    /// Validate and build the controller this config describes.
    pub fn controller(&self) -> std::result::Result<SeekController, BuildError> {
        if self.sampler.sample_rate_hz == 0 {
            return Err(BuildError::InvalidConfig("sample_rate_hz must be > 0"));
        }
        if self.event_capacity == 0 {
            return Err(BuildError::InvalidConfig("event_capacity must be >= 1"));
        }
        SeekController::new(&self.control, &self.safety)
    }
}

/// Run the control loop on the current thread until `shutdown` is raised.
///
/// Returns `Ok(())` on shutdown and the first I/O error otherwise. The motor
/// is disabled and the goal cleared in both cases.
#[allow(clippy::too_many_arguments)]
pub fn run<A: Adc, M: Motor>(
    adc: A,
    motor: M,
    table: &CalibrationTable,
    cfg: &LoopConfig,
    clock: Arc<dyn Clock + Send + Sync>,
    goal: &GoalHandle,
    feed: &PositionFeed,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let controller = cfg.controller().map_err(eyre::Report::new)?;
    run_with(controller, adc, motor, table, cfg, clock, goal, feed, shutdown)
}

#[allow(clippy::too_many_arguments)]
fn run_with<A: Adc, M: Motor>(
    mut controller: SeekController,
    adc: A,
    motor: M,
    table: &CalibrationTable,
    cfg: &LoopConfig,
    clock: Arc<dyn Clock + Send + Sync>,
    goal: &GoalHandle,
    feed: &PositionFeed,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    let mut guard = MotorGuard::wake(motor).wrap_err("enable motor")?;
    let mut sampler = PositionSampler::new(
        adc,
        clock,
        cfg.sampler.period(),
        cfg.sampler.tolerance_ticks,
        goal.clone(),
        shutdown,
    );
    tracing::info!(
        rate_hz = cfg.sampler.sample_rate_hz,
        tolerance = cfg.sampler.tolerance_ticks,
        "control loop start"
    );

    let result = drive(&mut controller, &mut guard, &mut sampler, table, goal, feed);
    goal.clear();
    drop(guard);
    match &result {
        Ok(()) => tracing::info!("control loop stopped"),
        Err(e) => tracing::error!(error = %e, "control loop failed"),
    }
    result
}

fn drive<A: Adc, M: Motor>(
    controller: &mut SeekController,
    guard: &mut MotorGuard<M>,
    sampler: &mut PositionSampler<A>,
    table: &CalibrationTable,
    goal: &GoalHandle,
    feed: &PositionFeed,
) -> Result<()> {
    while let Some(sample) = sampler.next() {
        let sample = sample.wrap_err("read fader position")?;
        let position = table.map(sample.tick);
        if let Some(ev) = controller.step(guard, position, goal, sample.at)? {
            feed.publish(ev);
        }
        // Keep reporting every sample until the motor is braked.
        sampler.force(controller.is_seeking());
    }
    Ok(())
}

/// Control loop running on its own thread.
///
/// Dropping the handle raises the shutdown flag and joins the thread; use
/// [`FaderLoop::shutdown`] to also observe the loop's error.
pub struct FaderLoop {
    goal: GoalHandle,
    events: xch::Receiver<FaderEvent>,
    feed: PositionFeed,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<Result<()>>>,
}

impl FaderLoop {
    pub fn spawn<A, M>(
        adc: A,
        motor: M,
        table: CalibrationTable,
        cfg: LoopConfig,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Result<Self>
    where
        A: Adc + Send + 'static,
        M: Motor + Send + 'static,
    {
        let controller = cfg.controller().map_err(eyre::Report::new)?;
        let goal = GoalHandle::new();
        let (feed, events) = PositionFeed::bounded(cfg.event_capacity);
        let shutdown = Arc::new(AtomicBool::new(false));

        let (g, f, s) = (goal.clone(), feed.clone(), shutdown.clone());
        let join = std::thread::Builder::new()
            .name("fader-loop".into())
            .spawn(move || run_with(controller, adc, motor, &table, &cfg, clock, &g, &f, s))
            .wrap_err("spawn control thread")?;

        Ok(Self {
            goal,
            events,
            feed,
            shutdown,
            join: Some(join),
        })
    }

    /// Shared goal cell; clones may be handed to other threads.
    pub fn goal(&self) -> GoalHandle {
        self.goal.clone()
    }

    pub fn set_goal(&self, goal: Option<f32>) {
        self.goal.set(goal);
    }

    pub fn events(&self) -> &xch::Receiver<FaderEvent> {
        &self.events
    }

    /// Last published position, if any.
    pub fn latest(&self) -> Option<f32> {
        self.feed.latest()
    }

    /// Flag that stops the loop when raised (e.g. from a signal handler).
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Whether the control thread has exited (shutdown or error).
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop the loop, wait for the thread and return its result.
    pub fn shutdown(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::Relaxed);
        match self.join.take() {
            Some(handle) => match handle.join() {
                Ok(r) => r,
                Err(_) => Err(eyre::eyre!("control thread panicked")),
            },
            None => Ok(()),
        }
    }
}

impl Drop for FaderLoop {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join.take() {
            match handle.join() {
                Ok(Ok(())) => tracing::trace!("control thread joined"),
                Ok(Err(e)) => tracing::warn!(error = %e, "control loop ended with error"),
                Err(e) => tracing::warn!(?e, "control thread panicked during shutdown"),
            }
        }
    }
}
