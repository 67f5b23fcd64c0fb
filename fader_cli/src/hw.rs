//! Hardware assembly: MCP3008 + H-bridge on a Pi, the simulator elsewhere.

use eyre::Result;
use fader_traits::{Adc, Motor};

pub type BoxedAdc = Box<dyn Adc + Send>;
pub type BoxedMotor = Box<dyn Motor + Send>;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn open(cfg: &fader_config::Config) -> Result<(BoxedAdc, BoxedMotor)> {
    use eyre::WrapErr;
    use fader_hardware::{HBridgeMotor, Mcp3008};

    let p = &cfg.pins;
    let adc = Mcp3008::new(
        p.spi_bus,
        p.spi_slave_select,
        cfg.hardware.spi_clock_hz,
        p.adc_channel,
    )
    .wrap_err("open spi adc")?;
    let motor = HBridgeMotor::new(
        p.motor_in1,
        p.motor_in2,
        p.motor_pwm,
        p.motor_standby,
        cfg.hardware.pwm_frequency_hz,
    )
    .wrap_err("open motor pins")?;
    tracing::info!(
        spi_bus = p.spi_bus,
        channel = p.adc_channel,
        in1 = p.motor_in1,
        in2 = p.motor_in2,
        "hardware backend ready"
    );
    Ok((Box::new(adc), Box::new(motor)))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub fn open(_cfg: &fader_config::Config) -> Result<(BoxedAdc, BoxedMotor)> {
    let sim = fader_hardware::SimulatedFader::new(sim_config_from_env()?);
    tracing::info!("simulation backend ready");
    Ok((Box::new(sim.adc()), Box::new(sim.motor())))
}

/// Simulator knobs for tests and demos.
///
/// - `FADER_TEST_SIM_START`: initial tick
/// - `FADER_TEST_SIM_MIN_STOP`: bottom end stop tick
/// - `FADER_TEST_SIM_STUCK=1`: knob jammed
/// - `FADER_TEST_SIM_FAIL_AFTER`: ADC fails after this many reads
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn sim_config_from_env() -> Result<fader_hardware::SimConfig> {
    fn parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
        match std::env::var(key) {
            Ok(v) => v
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| eyre::eyre!("invalid value for {key}: {v:?}")),
            Err(_) => Ok(None),
        }
    }

    let mut sim = fader_hardware::SimConfig::default();
    if let Some(t) = parse::<f32>("FADER_TEST_SIM_START")? {
        sim.start_tick = t;
    }
    if let Some(t) = parse::<f32>("FADER_TEST_SIM_MIN_STOP")? {
        sim.min_stop = t;
    }
    sim.stuck = parse::<u8>("FADER_TEST_SIM_STUCK")?.is_some_and(|v| v != 0);
    sim.fail_after = parse::<usize>("FADER_TEST_SIM_FAIL_AFTER")?;
    Ok(sim)
}
