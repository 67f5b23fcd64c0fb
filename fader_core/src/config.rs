//! Runtime configuration for the control loop and calibration procedures.
//!
//! These are the structs the core consumes. They are separate from the
//! TOML-deserialized config in `fader_config`; see `conversions`.

use std::time::Duration;

/// Position sampling cadence and idle noise filter.
#[derive(Debug, Clone)]
pub struct SamplerCfg {
    /// Sampling rate in Hz; drives the loop period. Default 64 Hz (15.625 ms).
    pub sample_rate_hz: u32,
    /// Idle changes of at most this many raw ticks are not emitted. Default 4.
    pub tolerance_ticks: u16,
}

impl Default for SamplerCfg {
    fn default() -> Self {
        Self {
            sample_rate_hz: 64,
            tolerance_ticks: 4,
        }
    }
}

impl SamplerCfg {
    pub fn period(&self) -> Duration {
        Duration::from_micros(crate::util::period_us(self.sample_rate_hz))
    }
}

/// Seek controller speed selection and post-stop quiet period.
#[derive(Debug, Clone)]
pub struct ControlCfg {
    /// Speed table: each entry is `(min_distance_percent, speed_percent)`.
    /// Sorted descending by threshold when the controller is built. A distance
    /// below the smallest threshold counts as arrival.
    pub speed_bands: Vec<(f32, u8)>,
    /// No idle positions are reported for this long after a stop. Default 150 ms.
    pub cooldown: Duration,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            speed_bands: vec![(25.0, 100), (1.0, 80)],
            cooldown: Duration::from_millis(150),
        }
    }
}

/// Stall watchdog applied while the motor is commanded to move.
#[derive(Debug, Clone)]
pub struct SafetyCfg {
    /// Number of recent positions inspected. Default 5.
    pub window: usize,
    /// Stop when those positions span less than this many percent. Default 0.1.
    pub min_span: f32,
}

impl Default for SafetyCfg {
    fn default() -> Self {
        Self {
            window: 5,
            min_span: 0.1,
        }
    }
}

/// End-stop search used by `bounds_test`.
#[derive(Debug, Clone)]
pub struct BoundsCfg {
    /// Sample cadence while searching.
    pub period: Duration,
    pub window: usize,
    /// End stop reached once the window spans fewer ticks than this.
    pub span_ticks: u16,
    /// Give up after this many samples (≈10 s at 64 Hz).
    pub max_samples: usize,
}

impl Default for BoundsCfg {
    fn default() -> Self {
        Self {
            period: Duration::from_micros(crate::util::period_us(64)),
            window: 5,
            span_ticks: 2,
            max_samples: 640,
        }
    }
}

/// Timed full-travel sweep.
#[derive(Debug, Clone)]
pub struct SweepCfg {
    pub period: Duration,
    pub window: usize,
    pub span_ticks: u16,
    pub max_samples: usize,
}

impl Default for SweepCfg {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(1),
            window: 10,
            span_ticks: 2,
            max_samples: 10_000,
        }
    }
}

/// Slow forward crawl reporting how far the knob moves between reads.
#[derive(Debug, Clone)]
pub struct CrawlCfg {
    pub period: Duration,
    /// Motor duty in percent. Default 10.
    pub speed: u8,
    /// Stop once a reading reaches this tick.
    pub until: u16,
    pub max_samples: usize,
}

impl Default for CrawlCfg {
    fn default() -> Self {
        Self {
            period: Duration::from_micros(crate::util::period_us(32)),
            speed: 10,
            until: 575,
            max_samples: 2_048,
        }
    }
}
