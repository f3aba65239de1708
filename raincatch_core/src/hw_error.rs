//! Maps `Box<dyn Error>` from trait boundaries to typed `LidError`.
//!
//! The traits in `raincatch_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `raincatch_hardware::HwError` downcasting.

use crate::error::LidError;

/// Map a trait-boundary error to a typed `LidError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> LidError {
    #[cfg(feature = "hardware-errors")]
    {
        use raincatch_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::EchoStartTimeout
                | HwError::EchoEndTimeout
                | HwError::LevelTimeout { .. } => LidError::SensingTimeout,
                HwError::Http(msg) | HwError::Unreachable(msg) => {
                    LidError::NetworkTransport(msg.clone())
                }
                other => LidError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        LidError::SensingTimeout
    } else {
        LidError::Hardware(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_fallback_detects_timeouts() {
        let e = std::io::Error::other("adc read timeout");
        assert_eq!(map_hw_error(&e), LidError::SensingTimeout);
        let e = std::io::Error::other("spi bus busy");
        assert_eq!(map_hw_error(&e), LidError::Hardware("spi bus busy".into()));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn typed_hardware_errors_are_downcast() {
        use raincatch_hardware::error::HwError;
        assert_eq!(map_hw_error(&HwError::EchoEndTimeout), LidError::SensingTimeout);
        assert!(matches!(
            map_hw_error(&HwError::Gpio("pin 17 busy".into())),
            LidError::HardwareFault(_)
        ));
    }
}
