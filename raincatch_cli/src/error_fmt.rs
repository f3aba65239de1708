//! Human-readable error descriptions and structured JSON error formatting.

use raincatch_core::error::{BuildError, LidError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingRanger => {
                "What happened: No range sensor was provided to the controller.\nLikely causes: The ultrasonic sensor failed to initialize or was not wired into the builder.\nHow to fix: Check the trigger/echo pins and pass the sensor via with_ranger(...).".to_string()
            }
            BuildError::MissingRainSensor => {
                "What happened: No rain sensor was provided to the controller.\nLikely causes: The ADC failed to initialize or was not wired into the builder.\nHow to fix: Check SPI is enabled and pass the sensor via with_rain_sensor(...).".to_string()
            }
            BuildError::MissingStepper => {
                "What happened: No stepper driver was provided to the controller.\nLikely causes: Driver pins failed to initialize or were not wired into the builder.\nHow to fix: Check the motor pins and pass the driver via with_stepper(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/raincatch.toml for a sample."
            ),
        };
    }

    if let Some(le) = err.downcast_ref::<LidError>() {
        return match le {
            LidError::SensingTimeout | LidError::SensingAggregate { .. } => {
                "What happened: The ultrasonic sensor did not answer in time.\nLikely causes: Trigger/echo miswired, no 5V supply, or nothing within range.\nHow to fix: Verify [pins] trigger/echo and power, or raise sensing.echo_timeout_ms.".to_string()
            }
            LidError::Hardware(_) | LidError::HardwareFault(_) => format!(
                "What happened: A driver line failed ({le}).\nLikely causes: GPIO permissions or a pin already claimed by another process.\nHow to fix: Run as a user in the gpio group and check [pins] for conflicts."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("open ultrasonic pins")
        || lower.contains("open stepper pins")
        || lower.contains("open rain adc")
    {
        return "What happened: Failed to initialize hardware.\nLikely causes: Incorrect pin numbers, SPI disabled, or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process can access GPIO and SPI.".to_string();
    }

    if lower.contains("invalid configuration") || lower.contains("parse config") {
        return format!(
            "What happened: Configuration is invalid.\nLikely causes: A typo or out-of-range value in the TOML.\nHow to fix: Edit the config file and try again. Details: {}",
            err.root_cause()
        );
    }

    // Calibration CSV header special-case
    if lower.contains("calibration csv must have headers") {
        return "Invalid headers in calibration CSV. Expected 'distance_cm,liters'.".to_string();
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

/// Stable exit codes per error family.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err.downcast_ref::<BuildError>().is_some() {
        return 2;
    }
    match err.downcast_ref::<LidError>() {
        Some(LidError::Config(_)) => 2,
        Some(LidError::SensingTimeout | LidError::SensingAggregate { .. }) => 3,
        Some(LidError::Hardware(_) | LidError::HardwareFault(_)) => 4,
        Some(_) => 5,
        None => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(_) => "InvalidConfig",
            _ => "MissingDevice",
        };
    }
    match err.downcast_ref::<LidError>() {
        Some(LidError::SensingTimeout) => "SensingTimeout",
        Some(LidError::SensingAggregate { .. }) => "SensingAggregate",
        Some(LidError::NetworkTransport(_)) => "NetworkTransport",
        Some(LidError::NetworkStatus(_)) => "NetworkStatus",
        Some(LidError::RemoteDataMalformed(_)) => "RemoteDataMalformed",
        Some(LidError::Hardware(_) | LidError::HardwareFault(_)) => "Hardware",
        Some(LidError::Config(_)) => "Config",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
