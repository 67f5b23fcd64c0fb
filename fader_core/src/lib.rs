#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Closed-loop control core for a motorized fader (hardware-agnostic).
//!
//! All hardware interactions go through the `fader_traits::Adc` and
//! `fader_traits::Motor` traits.
//!
//! ## Architecture
//!
//! - **Sampling**: fixed-cadence ADC reads with a noise-tolerance filter (`sampler`)
//! - **Calibration**: 11-point piecewise-linear raw→percent table (`calibration`)
//! - **Control**: tiered-speed seek with a stall watchdog (`controller`)
//! - **Procedures**: end-stop search, table regeneration, timed sweeps (`procedures`)
//! - **Runner**: one control thread, lock-free goal, drop-oldest event feed (`runner`)
//!
//! Positions are `f32` percent of travel (0.0..=100.0); raw ticks are the
//! 10-bit quantized ADC value (0..=1023).

pub mod actuator;
pub mod builder;
pub mod calibration;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod feed;
pub mod goal;
pub mod hw_error;
pub mod mocks;
pub mod procedures;
pub mod runner;
pub mod sampler;
pub mod status;
pub mod util;

pub use actuator::{Direction, MotorGuard};
pub use builder::FaderBuilder;
pub use calibration::CalibrationTable;
pub use config::{ControlCfg, SafetyCfg, SamplerCfg, SweepCfg};
pub use controller::SeekController;
pub use error::{BuildError, FaderError, Result};
pub use feed::PositionFeed;
pub use goal::GoalHandle;
pub use procedures::{
    Calibrator, CrawlReport, CrawlStep, Crossing, SweepDirection, SweepReport,
};
pub use runner::{FaderLoop, LoopConfig};
pub use sampler::{DebounceFilter, PositionSampler, RawTick, Sample};
pub use status::{ControllerState, FaderEvent};
