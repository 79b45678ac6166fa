//! Maps `Box<dyn Error>` from trait boundaries to typed `ControllerError`.
//!
//! The traits in `shutter_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `shutter_hardware::HwError` downcasting.

use crate::error::ControllerError;

/// Map a trait-boundary error to a typed `ControllerError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> ControllerError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<shutter_hardware::error::HwError>() {
            return ControllerError::HardwareFault(hw.to_string());
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        ControllerError::Timeout
    } else {
        ControllerError::Hardware(s)
    }
}

/// Wrap a trait-boundary error into an `eyre::Report` carrying `context`.
pub(crate) fn hw_report(e: &(dyn std::error::Error + 'static), context: &'static str) -> eyre::Report {
    eyre::Report::new(map_hw_error(e)).wrap_err(context)
}
