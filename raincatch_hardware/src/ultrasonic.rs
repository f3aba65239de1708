//! HC-SR04 style ultrasonic ranger.
//!
//! A ping is a short trigger pulse; the module answers by holding the echo
//! line high for as long as the sound took to travel out and back.

use std::time::Duration;

use raincatch_traits::RangeSensor;
use tracing::{trace, warn};

use crate::error::{HwError, Result};
use crate::lines::{InputLine, OutputLine};
use crate::util::{spin_delay, wait_for_level_with_timeout};

/// Quiet time before the trigger pulse.
pub const TRIGGER_SETTLE: Duration = Duration::from_micros(2);
/// Trigger pulse width (datasheet minimum is 10 µs).
pub const TRIGGER_PULSE: Duration = Duration::from_micros(10);
/// Ceiling for each echo edge. Generous: the control loop runs every few minutes.
pub const DEFAULT_ECHO_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Ultrasonic<T: OutputLine, E: InputLine> {
    trigger: T,
    echo: E,
    echo_timeout: Duration,
}

impl<T: OutputLine, E: InputLine> Ultrasonic<T, E> {
    pub fn new(trigger: T, echo: E) -> Self {
        Self::with_timeout(trigger, echo, DEFAULT_ECHO_TIMEOUT)
    }

    pub fn with_timeout(trigger: T, echo: E, echo_timeout: Duration) -> Self {
        Self {
            trigger,
            echo,
            echo_timeout,
        }
    }

    /// Fire one ping and time the echo pulse.
    pub fn ping(&mut self) -> Result<u32> {
        self.trigger.set_low()?;
        spin_delay(TRIGGER_SETTLE);
        self.trigger.set_high()?;
        spin_delay(TRIGGER_PULSE);
        self.trigger.set_low()?;

        let echo = &self.echo;
        let start =
            wait_for_level_with_timeout(|| echo.is_high(), true, self.echo_timeout, Duration::ZERO)
                .map_err(|_| HwError::EchoStartTimeout)?;
        let end =
            wait_for_level_with_timeout(|| echo.is_high(), false, self.echo_timeout, Duration::ZERO)
                .map_err(|_| HwError::EchoEndTimeout)?;

        let width_us = end.saturating_duration_since(start).as_micros();
        Ok(u32::try_from(width_us).unwrap_or(u32::MAX))
    }
}

impl<T: OutputLine, E: InputLine> RangeSensor for Ultrasonic<T, E> {
    fn measure(&mut self) -> Option<u32> {
        match self.ping() {
            Ok(us) => {
                trace!(duration_us = us, "echo pulse");
                Some(us)
            }
            Err(e) => {
                warn!(error = %e, "ultrasonic ping failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    /// Trigger line that starts an echo responder thread on each falling edge.
    struct ScriptedTrigger {
        echo: Arc<AtomicBool>,
        high: bool,
        pulses: Arc<AtomicU32>,
        respond: Option<(Duration, Duration)>,
    }

    impl OutputLine for ScriptedTrigger {
        fn set_high(&mut self) -> Result<()> {
            self.high = true;
            Ok(())
        }
        fn set_low(&mut self) -> Result<()> {
            if self.high {
                self.pulses.fetch_add(1, Ordering::Relaxed);
                if let Some((delay, width)) = self.respond {
                    let echo = self.echo.clone();
                    std::thread::spawn(move || {
                        std::thread::sleep(delay);
                        echo.store(true, Ordering::Relaxed);
                        std::thread::sleep(width);
                        echo.store(false, Ordering::Relaxed);
                    });
                }
            }
            self.high = false;
            Ok(())
        }
    }

    struct SharedEcho(Arc<AtomicBool>);
    impl InputLine for SharedEcho {
        fn is_high(&self) -> bool {
            self.0.load(Ordering::Relaxed)
        }
    }

    fn ranger(
        respond: Option<(Duration, Duration)>,
        timeout: Duration,
    ) -> (Ultrasonic<ScriptedTrigger, SharedEcho>, Arc<AtomicU32>, Arc<AtomicBool>) {
        let echo = Arc::new(AtomicBool::new(false));
        let pulses = Arc::new(AtomicU32::new(0));
        let trigger = ScriptedTrigger {
            echo: echo.clone(),
            high: false,
            pulses: pulses.clone(),
            respond,
        };
        (
            Ultrasonic::with_timeout(trigger, SharedEcho(echo.clone()), timeout),
            pulses,
            echo,
        )
    }

    #[test]
    fn measures_echo_width() {
        let (mut r, pulses, _) = ranger(
            Some((Duration::from_millis(1), Duration::from_millis(20))),
            Duration::from_secs(2),
        );
        let us = r.measure().expect("echo");
        assert_eq!(pulses.load(Ordering::Relaxed), 1);
        // Thread scheduling only ever stretches the pulse.
        assert!(us >= 19_000, "pulse too short: {us}");
        assert!(us < 1_000_000, "pulse absurdly long: {us}");
    }

    #[test]
    fn no_echo_times_out_as_none() {
        let (mut r, _, _) = ranger(None, Duration::from_millis(20));
        assert_eq!(r.measure(), None);
        assert!(matches!(r.ping(), Err(HwError::EchoStartTimeout)));
    }

    #[test]
    fn stuck_echo_times_out_on_end_edge() {
        let (mut r, _, echo) = ranger(None, Duration::from_millis(20));
        echo.store(true, Ordering::Relaxed);
        assert!(matches!(r.ping(), Err(HwError::EchoEndTimeout)));
    }
}
