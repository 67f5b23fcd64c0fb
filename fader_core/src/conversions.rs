//! `From` implementations bridging `fader_config` types to `fader_core` types.

use std::time::Duration;

use crate::calibration::CalibrationTable;
use crate::config::{BoundsCfg, ControlCfg, CrawlCfg, SafetyCfg, SamplerCfg, SweepCfg};
use crate::error::BuildError;
use crate::runner::LoopConfig;

// ── SamplerCfg ───────────────────────────────────────────────────────────────

impl From<&fader_config::SamplerCfg> for SamplerCfg {
    fn from(c: &fader_config::SamplerCfg) -> Self {
        Self {
            sample_rate_hz: c.sample_rate_hz,
            tolerance_ticks: c.tolerance_ticks,
        }
    }
}

// ── ControlCfg ───────────────────────────────────────────────────────────────

impl From<&fader_config::ControlCfg> for ControlCfg {
    fn from(c: &fader_config::ControlCfg) -> Self {
        Self {
            speed_bands: c.speed_bands.clone(),
            cooldown: Duration::from_millis(c.cooldown_ms),
        }
    }
}

// ── SafetyCfg ────────────────────────────────────────────────────────────────

impl From<&fader_config::Safety> for SafetyCfg {
    fn from(c: &fader_config::Safety) -> Self {
        Self {
            window: c.window,
            min_span: c.min_span,
        }
    }
}

// ── Procedures ───────────────────────────────────────────────────────────────

impl From<&fader_config::Config> for BoundsCfg {
    fn from(c: &fader_config::Config) -> Self {
        Self {
            period: SamplerCfg::from(&c.sampler).period(),
            window: c.calibration.bounds_window,
            span_ticks: c.calibration.bounds_span_ticks,
            max_samples: c.calibration.bounds_max_samples,
        }
    }
}

impl From<&fader_config::SweepCfg> for SweepCfg {
    fn from(c: &fader_config::SweepCfg) -> Self {
        Self {
            period: Duration::from_millis(c.period_ms),
            window: c.window,
            span_ticks: c.span_ticks,
            max_samples: c.max_samples,
        }
    }
}

impl From<&fader_config::CrawlCfg> for CrawlCfg {
    fn from(c: &fader_config::CrawlCfg) -> Self {
        Self {
            period: Duration::from_micros(crate::util::period_us(c.sample_rate_hz)),
            speed: c.speed,
            until: c.until_tick,
            max_samples: c.max_samples,
        }
    }
}

// ── LoopConfig ───────────────────────────────────────────────────────────────

impl From<&fader_config::Config> for LoopConfig {
    fn from(c: &fader_config::Config) -> Self {
        Self {
            sampler: (&c.sampler).into(),
            control: (&c.control).into(),
            safety: (&c.safety).into(),
            event_capacity: c.runner.event_capacity,
        }
    }
}

// ── CalibrationTable ─────────────────────────────────────────────────────────

impl TryFrom<&fader_config::CalibrationCfg> for CalibrationTable {
    type Error = BuildError;

    fn try_from(c: &fader_config::CalibrationCfg) -> Result<Self, Self::Error> {
        Self::from_slice(&c.breakpoints, c.dead_zone_low, c.dead_zone_high)
    }
}
