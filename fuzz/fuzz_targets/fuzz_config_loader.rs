#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(cfg) = fader_config::load_toml(data) {
        let _ = cfg.validate();
        let _ = fader_config::validate_breakpoints(&cfg.calibration.breakpoints);
    }
});
