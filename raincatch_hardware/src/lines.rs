//! Single digital lines, so the ranger and stepper logic can run against
//! real GPIO or against in-memory fakes.

use crate::error::Result;

pub trait OutputLine {
    fn set_high(&mut self) -> Result<()>;
    fn set_low(&mut self) -> Result<()>;

    fn set_level(&mut self, high: bool) -> Result<()> {
        if high { self.set_high() } else { self.set_low() }
    }
}

pub trait InputLine {
    fn is_high(&self) -> bool;
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
mod gpio {
    use super::{InputLine, OutputLine};
    use crate::error::{HwError, Result};
    use rppal::gpio::{Gpio, InputPin, OutputPin};

    impl OutputLine for OutputPin {
        fn set_high(&mut self) -> Result<()> {
            OutputPin::set_high(self);
            Ok(())
        }
        fn set_low(&mut self) -> Result<()> {
            OutputPin::set_low(self);
            Ok(())
        }
    }

    impl InputLine for InputPin {
        fn is_high(&self) -> bool {
            InputPin::is_high(self)
        }
    }

    /// Claim a BCM pin as an output, starting at the given level.
    pub fn output_pin(gpio: &Gpio, pin: u8, initial_high: bool) -> Result<OutputPin> {
        let p = gpio
            .get(pin)
            .map_err(|e| HwError::Gpio(format!("open output pin {pin}: {e}")))?;
        Ok(if initial_high {
            p.into_output_high()
        } else {
            p.into_output_low()
        })
    }

    /// Claim a BCM pin as a floating input.
    pub fn input_pin(gpio: &Gpio, pin: u8) -> Result<InputPin> {
        gpio.get(pin)
            .map(|p| p.into_input())
            .map_err(|e| HwError::Gpio(format!("open input pin {pin}: {e}")))
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use gpio::{input_pin, output_pin};
