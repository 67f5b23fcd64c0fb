//! Human-readable error descriptions and structured JSON error formatting.

use fader_core::error::{BuildError, FaderError};

fn find<'a, T: std::error::Error + 'static>(err: &'a eyre::Report) -> Option<&'a T> {
    err.chain().find_map(|e| e.downcast_ref::<T>())
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = find::<BuildError>(err) {
        return match be {
            BuildError::MissingAdc => {
                "What happened: No ADC was provided to the control loop.\nLikely causes: The SPI converter failed to initialize or was not wired into the builder.\nHow to fix: Ensure the MCP3008 is created successfully and passed via with_adc(...).".to_string()
            }
            BuildError::MissingMotor => {
                "What happened: No motor was provided to the control loop.\nLikely causes: The H-bridge pins failed to initialize or were not wired into the builder.\nHow to fix: Ensure the motor is created successfully and passed via with_motor(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/fader_config.toml for a sample."
            ),
            BuildError::InvalidTable(msg) => format!(
                "What happened: Invalid calibration table ({msg}).\nLikely causes: Break-points out of order, out of range, or dead zones too wide.\nHow to fix: Re-run `fader calibrate` or fix [calibration].breakpoints in the config."
            ),
        };
    }

    if let Some(fe) = find::<FaderError>(err) {
        return match fe {
            FaderError::Timeout => {
                "What happened: ADC read timed out.\nLikely causes: SPI not enabled, wrong bus/chip select, or the converter is unpowered.\nHow to fix: Check [pins] spi_bus/spi_slave_select, verify 3.3V/GND, and enable SPI on the Pi.".to_string()
            }
            FaderError::SafetyStop { goal, position } => format!(
                "What happened: Safety stop at {position:.1}% while seeking {goal:.1}%; the motor was driven but the knob did not move.\nLikely causes: Knob held by hand, mechanical jam, or motor supply missing.\nHow to fix: Free the knob and check motor power; adjust [safety] window/min_span if the fader is slow."
            ),
            FaderError::CalibrationTimeout { samples } => format!(
                "What happened: Calibration procedure did not finish within {samples} samples.\nLikely causes: The knob never reached its end stop or target, or the reading is noisy.\nHow to fix: Check the motor moves the knob; raise max_samples in [calibration] (bounds_max_samples), [sweep] or [crawl]."
            ),
            FaderError::Cancelled => {
                "What happened: Operation cancelled.\nLikely causes: Ctrl-C was pressed.\nHow to fix: Nothing to fix; rerun the command when ready.".to_string()
            }
            FaderError::HardwareFault(msg) | FaderError::Hardware(msg) => format!(
                "What happened: Hardware error ({msg}).\nLikely causes: Wiring, permissions on /dev/spidev* or /dev/gpiomem, or a loose connector.\nHow to fix: Verify wiring and run with sufficient permissions; re-run with --log-level=debug."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err
        .chain()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(": ");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("calibration csv must have headers") {
        return "Invalid headers in calibration CSV. Expected 'percent,tick'.".to_string();
    }

    if lower.contains("open spi adc") || lower.contains("open motor pins") {
        return "What happened: Failed to initialize hardware.\nLikely causes: Incorrect pin or SPI numbers, or insufficient GPIO/SPI permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process can access /dev/spidev* and GPIO.".to_string();
    }

    if lower.contains("invalid configuration") || lower.contains("parse config") {
        return format!(
            "What happened: Configuration is invalid or incomplete ({msg}).\nLikely causes: Out-of-range values or unknown keys in the TOML.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable process exit codes; anything unclassified returns 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match find::<FaderError>(err) {
        Some(FaderError::SafetyStop { .. }) => 3,
        Some(FaderError::CalibrationTimeout { .. }) => 4,
        Some(FaderError::Hardware(_) | FaderError::HardwareFault(_) | FaderError::Timeout) => 5,
        Some(FaderError::Cancelled) => 130,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = find::<BuildError>(err) {
        return match be {
            BuildError::MissingAdc | BuildError::MissingMotor => "Build",
            BuildError::InvalidConfig(_) => "InvalidConfig",
            BuildError::InvalidTable(_) => "InvalidTable",
        };
    }
    match find::<FaderError>(err) {
        Some(FaderError::SafetyStop { .. }) => "SafetyStop",
        Some(FaderError::CalibrationTimeout { .. }) => "CalibrationTimeout",
        Some(FaderError::Timeout) => "Timeout",
        Some(FaderError::Hardware(_) | FaderError::HardwareFault(_)) => "Hardware",
        Some(FaderError::Cancelled) => "Cancelled",
        Some(FaderError::Config(_)) => "InvalidConfig",
        Some(FaderError::State(_)) => "State",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let msg = humanize(err);
    let details = match find::<FaderError>(err) {
        Some(FaderError::SafetyStop { goal, position }) => {
            Some(json!({ "goal": goal, "position": position }))
        }
        Some(FaderError::CalibrationTimeout { samples }) => Some(json!({ "samples": samples })),
        _ => None,
    };
    let obj = match details {
        Some(d) => json!({ "reason": reason_name(err), "details": d, "message": msg }),
        None => json!({ "reason": reason_name(err), "message": msg }),
    };
    obj.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safety_stop_maps_to_exit_code_3() {
        let err = eyre::Report::new(FaderError::SafetyStop {
            goal: 50.0,
            position: 12.0,
        });
        assert_eq!(exit_code_for_error(&err), 3);
        assert!(humanize(&err).contains("Safety stop"));
    }

    #[test]
    fn wrapped_timeout_is_still_classified() {
        use eyre::WrapErr;
        let err: eyre::Result<()> = Err(eyre::Report::new(FaderError::Timeout));
        let err = err.wrap_err("read fader position").unwrap_err();
        assert_eq!(exit_code_for_error(&err), 5);
        assert!(format_error_json(&err).contains("\"reason\":\"Timeout\""));
    }

    #[test]
    fn csv_header_message_is_short() {
        let err = eyre::eyre!("calibration CSV must have headers 'percent,tick'")
            .wrap_err("load calibration override");
        assert_eq!(
            humanize(&err),
            "Invalid headers in calibration CSV. Expected 'percent,tick'."
        );
    }

    #[test]
    fn json_carries_safety_details() {
        let err = eyre::Report::new(FaderError::SafetyStop {
            goal: 40.0,
            position: 10.0,
        });
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "SafetyStop");
        assert_eq!(v["details"]["goal"], 40.0);
    }
}
