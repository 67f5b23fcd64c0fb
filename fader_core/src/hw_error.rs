//! Maps `Box<dyn Error>` from trait boundaries to typed `FaderError`.
//!
//! The traits in `fader_traits` use `Box<dyn Error + Send + Sync>`; this module
//! converts those to our typed error enum, with an optional feature-gated path
//! for `fader_hardware::HwError` downcasting.

use crate::error::FaderError;

/// Map a trait-boundary error to a typed `FaderError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> FaderError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<fader_hardware::error::HwError>() {
            return match hw {
                fader_hardware::error::HwError::Timeout => FaderError::Timeout,
                other => FaderError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        FaderError::Timeout
    } else {
        FaderError::Hardware(s)
    }
}

/// Convert a trait-boundary error into an `eyre::Report` carrying a `FaderError`.
pub(crate) fn report(e: &(dyn std::error::Error + Send + Sync + 'static)) -> eyre::Report {
    eyre::Report::new(map_hw_error(e))
}
