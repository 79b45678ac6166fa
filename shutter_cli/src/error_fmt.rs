//! Human-readable error descriptions and structured JSON error formatting.

use shutter_core::error::{BuildError, ControllerError};

/// Map an `eyre::Report` to an explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingDriver => {
                "What happened: No stepper driver was provided to the controller.\nLikely causes: The step/dir pins failed to initialize or were not wired into the builder.\nHow to fix: Check [pins].step and [pins].dir and pass the driver via with_driver(...).".to_string()
            }
            BuildError::MissingLimit => {
                "What happened: No limit switch was provided to the controller.\nLikely causes: The limit input failed to initialize.\nHow to fix: Check [pins].limit; homing is impossible without it.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun `shutter self-check`."
            ),
        };
    }

    if let Some(ce) = err.downcast_ref::<ControllerError>() {
        return match ce {
            ControllerError::Timeout => "What happened: A hardware operation timed out.\nLikely causes: Disconnected wiring or a stalled peripheral.\nHow to fix: Check the driver and probe connections, then rerun.".to_string(),
            ControllerError::Hardware(m) | ControllerError::HardwareFault(m) => format!(
                "What happened: Hardware failure ({m}).\nLikely causes: Wrong pin numbers, missing GPIO permissions or a disconnected driver.\nHow to fix: Verify [pins] and run with --log-level=debug for the full chain."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("reading config") {
        return format!(
            "What happened: The config file could not be read.\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass --config <FILE> (default etc/shutter.toml). Original: {msg}"
        );
    }

    if lower.contains("parsing config") {
        return format!(
            "What happened: The config file is not valid TOML for this controller.\nLikely causes: A missing [pins] table or a misspelled key.\nHow to fix: Compare with etc/shutter.toml. Original: {msg}"
        );
    }

    if lower.contains("invalid configuration") {
        return format!(
            "What happened: Configuration is invalid.\nLikely causes: Out-of-range values.\nHow to fix: Edit the TOML and try again. Original: {msg}"
        );
    }

    if lower.contains("open stepper pins") || (lower.contains("pin") && lower.contains("gpio")) {
        return "What happened: Failed to initialize GPIO pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values; ensure the process may access /dev/gpiomem.".to_string();
    }

    if lower.contains("homing did not finish") {
        return format!(
            "What happened: {msg}.\nLikely causes: A slow profile over a long travel, or a limit switch that never closes.\nHow to fix: Raise --timeout-ms or check the limit switch wiring."
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

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        "Build"
    } else if let Some(ce) = err.downcast_ref::<ControllerError>() {
        match ce {
            ControllerError::Timeout => "Timeout",
            ControllerError::Hardware(_) | ControllerError::HardwareFault(_) => "Hardware",
        }
    } else {
        "Error"
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({ "reason": reason_name(err), "message": humanize(err) }).to_string()
}
