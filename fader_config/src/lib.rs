#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and calibration parsing for the motorized fader.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The break-point CSV loader enforces headers and the 0..=100 decile layout.
use serde::Deserialize;
use serde::de::Deserializer;

/// Number of calibration break-points (0%, 10%, ..., 100%).
pub const BREAKPOINTS: usize = 11;
/// Largest quantized ADC tick.
pub const MAX_TICK: u16 = 1023;

/// Calibration CSV schema.
///
/// Expected headers:
/// percent,tick
///
/// Example:
/// percent,tick
/// 0,511
/// 10,538
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct BreakpointRow {
    pub percent: u8,
    pub tick: u16,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pins {
    /// SPI bus of the MCP3008 (0 = /dev/spidev0.*)
    pub spi_bus: u8,
    /// Hardware chip select on that bus
    pub spi_slave_select: u8,
    /// ADC input the fader wiper is wired to
    pub adc_channel: u8,
    pub motor_in1: u8,
    pub motor_in2: u8,
    pub motor_pwm: u8,
    pub motor_standby: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            spi_bus: 0,
            spi_slave_select: 0,
            adc_channel: 0,
            motor_in1: 5,
            motor_in2: 6,
            motor_pwm: 12,
            motor_standby: 26,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SamplerCfg {
    pub sample_rate_hz: u32,
    /// Idle changes of at most this many ticks are treated as noise
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

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlCfg {
    /// Speed table keyed by distance to goal (percent of travel). Accepts either:
    /// - array of tables: [{ min_distance = 25.0, speed = 100 }, ...]
    /// - array of tuples: [[25.0, 100], [1.0, 80]]
    ///
    /// The smallest threshold doubles as the settle threshold.
    #[serde(deserialize_with = "de_speed_bands")]
    pub speed_bands: Vec<(f32, u8)>,
    /// Quiet period after a stop before manual moves are reported again
    pub cooldown_ms: u64,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            speed_bands: vec![(25.0, 100), (1.0, 80)],
            cooldown_ms: 150,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Safety {
    /// Number of recent positions watched while seeking
    pub window: usize,
    /// Stop when the watched positions span less than this (percent)
    pub min_span: f32,
}

impl Default for Safety {
    fn default() -> Self {
        Self {
            window: 5,
            min_span: 0.1,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CalibrationCfg {
    /// Ticks at 0%, 10%, ..., 100% travel
    pub breakpoints: Vec<u16>,
    pub dead_zone_low: u16,
    pub dead_zone_high: u16,
    /// bounds test: rolling window length (samples)
    pub bounds_window: usize,
    /// bounds test: end stop reached once the window spans fewer ticks than this
    pub bounds_span_ticks: u16,
    /// bounds test: give up after this many samples
    pub bounds_max_samples: usize,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            breakpoints: vec![511, 538, 569, 603, 643, 689, 739, 799, 869, 955, 1023],
            dead_zone_low: 2,
            dead_zone_high: 3,
            bounds_window: 5,
            bounds_span_ticks: 2,
            bounds_max_samples: 640,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SweepCfg {
    pub window: usize,
    pub span_ticks: u16,
    pub period_ms: u64,
    pub max_samples: usize,
}

impl Default for SweepCfg {
    fn default() -> Self {
        Self {
            window: 10,
            span_ticks: 2,
            period_ms: 1,
            max_samples: 10_000,
        }
    }
}

/// Slow forward crawl for inspecting per-read travel.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CrawlCfg {
    /// Motor duty in percent
    pub speed: u8,
    pub sample_rate_hz: u32,
    /// Stop once the reading reaches this tick
    pub until_tick: u16,
    pub max_samples: usize,
}

impl Default for CrawlCfg {
    fn default() -> Self {
        Self {
            speed: 10,
            sample_rate_hz: 32,
            until_tick: 575,
            max_samples: 2_048,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunnerCfg {
    /// Outgoing event queue length; the oldest event is dropped when full
    pub event_capacity: usize,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self { event_capacity: 16 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Hardware {
    pub spi_clock_hz: u32,
    pub pwm_frequency_hz: f64,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            spi_clock_hz: 1_350_000,
            pwm_frequency_hz: 1_000.0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub pins: Pins,
    pub sampler: SamplerCfg,
    pub control: ControlCfg,
    pub safety: Safety,
    pub calibration: CalibrationCfg,
    pub sweep: SweepCfg,
    pub crawl: CrawlCfg,
    pub runner: RunnerCfg,
    pub logging: Logging,
    pub hardware: Hardware,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BandToml {
    Tuple((f32, u8)),
    Table { min_distance: f32, speed: u8 },
}

fn de_speed_bands<'de, D>(deserializer: D) -> Result<Vec<(f32, u8)>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<Vec<BandToml>> = Option::deserialize(deserializer)?;
    let mut out = Vec::new();
    if let Some(items) = opt {
        for b in items {
            match b {
                BandToml::Tuple((thr, speed)) => out.push((thr, speed)),
                BandToml::Table {
                    min_distance,
                    speed,
                } => out.push((min_distance, speed)),
            }
        }
    }
    Ok(out)
}

/// Check the break-point layout shared by TOML and CSV sources.
pub fn validate_breakpoints(points: &[u16]) -> eyre::Result<()> {
    if points.len() != BREAKPOINTS {
        eyre::bail!(
            "calibration.breakpoints must have {BREAKPOINTS} entries, got {}",
            points.len()
        );
    }
    for (i, pair) in points.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            eyre::bail!(
                "calibration.breakpoints must be strictly increasing (index {} -> {})",
                i,
                i + 1
            );
        }
    }
    if points[BREAKPOINTS - 1] > MAX_TICK {
        eyre::bail!("calibration.breakpoints must be <= {MAX_TICK}");
    }
    Ok(())
}

/// Load break-points from a `percent,tick` CSV with exactly one row per decile.
pub fn load_breakpoints_csv(path: &std::path::Path) -> eyre::Result<Vec<u16>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open calibration CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["percent", "tick"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "calibration CSV must have headers 'percent,tick', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<BreakpointRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    breakpoints_from_rows(&rows)
}

/// Order rows by percent and check they cover 0, 10, ..., 100 exactly once.
pub fn breakpoints_from_rows(rows: &[BreakpointRow]) -> eyre::Result<Vec<u16>> {
    let mut sorted = rows.to_vec();
    sorted.sort_by_key(|r| r.percent);
    let percents: Vec<u8> = sorted.iter().map(|r| r.percent).collect();
    let expected: Vec<u8> = (0..=100).step_by(10).collect();
    if percents != expected {
        eyre::bail!(
            "calibration CSV must list percent 0,10,...,100 exactly once, got: {:?}",
            percents
        );
    }
    let ticks: Vec<u16> = sorted.iter().map(|r| r.tick).collect();
    validate_breakpoints(&ticks)?;
    Ok(ticks)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        if self.pins.adc_channel > 7 {
            eyre::bail!("pins.adc_channel must be in 0..=7");
        }

        // Sampler
        if self.sampler.sample_rate_hz == 0 {
            eyre::bail!("sampler.sample_rate_hz must be > 0");
        }
        if self.sampler.sample_rate_hz > 1_000 {
            eyre::bail!("sampler.sample_rate_hz must be <= 1000");
        }
        if self.sampler.tolerance_ticks > 64 {
            eyre::bail!("sampler.tolerance_ticks is unreasonably large (>64)");
        }

        // Control
        if self.control.speed_bands.is_empty() {
            eyre::bail!("control.speed_bands must not be empty");
        }
        for (thr, speed) in &self.control.speed_bands {
            if !thr.is_finite() || *thr <= 0.0 || *thr > 100.0 {
                eyre::bail!("control.speed_bands threshold must be in (0.0, 100.0]");
            }
            if *speed == 0 || *speed > 100 {
                eyre::bail!("control.speed_bands speed must be in 1..=100");
            }
        }
        let mut bands = self.control.speed_bands.clone();
        bands.sort_by(|a, b| b.0.total_cmp(&a.0));
        if bands.windows(2).any(|w| w[1].1 > w[0].1) {
            eyre::bail!("control.speed_bands must not speed up closer to the goal");
        }
        if self.control.cooldown_ms > 10_000 {
            eyre::bail!("control.cooldown_ms is unreasonably large (>10s)");
        }

        // Safety
        if self.safety.window < 2 {
            eyre::bail!("safety.window must be >= 2");
        }
        if !self.safety.min_span.is_finite() || self.safety.min_span <= 0.0 {
            eyre::bail!("safety.min_span must be > 0.0");
        }

        // Calibration
        validate_breakpoints(&self.calibration.breakpoints)?;
        let span = self.calibration.breakpoints[BREAKPOINTS - 1]
            .saturating_sub(self.calibration.breakpoints[0]);
        if u32::from(self.calibration.dead_zone_low) + u32::from(self.calibration.dead_zone_high)
            >= u32::from(span)
        {
            eyre::bail!("calibration dead zones exceed the calibrated travel");
        }
        if self.calibration.bounds_window < 2 {
            eyre::bail!("calibration.bounds_window must be >= 2");
        }
        if self.calibration.bounds_span_ticks == 0 {
            eyre::bail!("calibration.bounds_span_ticks must be >= 1");
        }
        if self.calibration.bounds_max_samples < self.calibration.bounds_window {
            eyre::bail!("calibration.bounds_max_samples must be >= bounds_window");
        }

        // Sweep
        if self.sweep.window < 2 {
            eyre::bail!("sweep.window must be >= 2");
        }
        if self.sweep.span_ticks == 0 {
            eyre::bail!("sweep.span_ticks must be >= 1");
        }
        if self.sweep.max_samples < self.sweep.window {
            eyre::bail!("sweep.max_samples must be >= sweep.window");
        }

        // Crawl
        if self.crawl.speed == 0 || self.crawl.speed > 100 {
            eyre::bail!("crawl.speed must be in 1..=100");
        }
        if self.crawl.sample_rate_hz == 0 || self.crawl.sample_rate_hz > 1000 {
            eyre::bail!("crawl.sample_rate_hz must be in 1..=1000");
        }
        if self.crawl.until_tick > MAX_TICK {
            eyre::bail!("crawl.until_tick must be <= {MAX_TICK}");
        }
        if self.crawl.max_samples == 0 {
            eyre::bail!("crawl.max_samples must be >= 1");
        }

        // Runner
        if self.runner.event_capacity == 0 {
            eyre::bail!("runner.event_capacity must be >= 1");
        }

        // Hardware
        if self.hardware.spi_clock_hz == 0 {
            eyre::bail!("hardware.spi_clock_hz must be > 0");
        }
        if self.hardware.pwm_frequency_hz.is_nan() || self.hardware.pwm_frequency_hz <= 0.0 {
            eyre::bail!("hardware.pwm_frequency_hz must be > 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = load_toml("").unwrap();
        assert_eq!(cfg.sampler.sample_rate_hz, 64);
        assert_eq!(cfg.calibration.breakpoints.len(), BREAKPOINTS);
        assert_eq!(cfg.control.speed_bands, vec![(25.0, 100), (1.0, 80)]);
        cfg.validate().unwrap();
    }

    #[test]
    fn speed_bands_accept_tables_and_tuples() {
        let a = load_toml("[control]\nspeed_bands = [[30.0, 90], [2.0, 60]]\n").unwrap();
        let b = load_toml(
            "[control]\nspeed_bands = [{ min_distance = 30.0, speed = 90 }, { min_distance = 2.0, speed = 60 }]\n",
        )
        .unwrap();
        assert_eq!(a.control.speed_bands, b.control.speed_bands);
    }
}
