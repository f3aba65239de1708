pub mod error;
pub mod lines;
#[cfg(feature = "network")]
pub mod net;
pub mod stepper;
pub mod ultrasonic;
pub mod util;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod adc;

use raincatch_traits::{BoxError, RainSensor, RangeSensor, Rotation, StepperDriver};
use std::cell::Cell;
use std::rc::Rc;

/// Round-trip echo time for a distance, using the same 0.0343 cm/µs as the core.
fn echo_us_for_cm(distance_cm: f32) -> u32 {
    (distance_cm * 2.0 / 0.0343).round().max(0.0) as u32
}

/// Simulated ranger over a slowly filling tank: every ping the water surface
/// creeps closer to the sensor until it reaches `floor_cm`.
pub struct SimulatedRanger {
    distance_cm: Rc<Cell<f32>>,
    fill_rate_cm: f32,
    floor_cm: f32,
}

impl SimulatedRanger {
    pub fn new(start_cm: f32) -> Self {
        SimulatedRanger {
            distance_cm: Rc::new(Cell::new(start_cm)),
            fill_rate_cm: 0.002,
            floor_cm: 2.0,
        }
    }

    /// Shared handle to the simulated surface distance.
    pub fn distance_handle(&self) -> Rc<Cell<f32>> {
        self.distance_cm.clone()
    }
}

impl RangeSensor for SimulatedRanger {
    fn measure(&mut self) -> Option<u32> {
        let d = self.distance_cm.get();
        self.distance_cm
            .set((d - self.fill_rate_cm).max(self.floor_cm));
        tracing::trace!(distance_cm = d, "ranger (simulated)");
        Some(echo_us_for_cm(d))
    }
}

/// Simulated rain sensor alternating between dry and wet spells.
pub struct SimulatedRainSensor {
    reads: u32,
    spell: u32,
    dry: u16,
    wet: u16,
}

impl SimulatedRainSensor {
    /// `spell` reads dry, then `spell` reads wet, and so on.
    pub fn new(spell: u32) -> Self {
        SimulatedRainSensor {
            reads: 0,
            spell: spell.max(1),
            dry: 3900,
            wet: 1200,
        }
    }
}

impl RainSensor for SimulatedRainSensor {
    fn read_raw(&mut self) -> Result<u16, BoxError> {
        let wet = (self.reads / self.spell) % 2 == 1;
        self.reads = self.reads.wrapping_add(1);
        Ok(if wet { self.wet } else { self.dry })
    }
}

/// Simulated stepper driver; counts rising edges per enable window.
#[derive(Default)]
pub struct SimulatedStepper {
    enabled: bool,
    step_high: bool,
    steps: u32,
    rotation: Option<Rotation>,
}

impl SimulatedStepper {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StepperDriver for SimulatedStepper {
    fn set_enabled(&mut self, enabled: bool) -> Result<(), BoxError> {
        if enabled && !self.enabled {
            self.steps = 0;
        }
        if !enabled && self.enabled {
            tracing::info!(steps = self.steps, rotation = ?self.rotation, "stepper released (simulated)");
        }
        self.enabled = enabled;
        Ok(())
    }

    fn set_direction(&mut self, rotation: Rotation) -> Result<(), BoxError> {
        self.rotation = Some(rotation);
        Ok(())
    }

    fn set_step(&mut self, high: bool) -> Result<(), BoxError> {
        if high && !self.step_high && self.enabled {
            self.steps += 1;
        }
        self.step_high = high;
        Ok(())
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod hardware {
    //! Real devices on Raspberry Pi GPIO (BCM numbering).
    use std::time::Duration;

    use rppal::gpio::{Gpio, InputPin, OutputPin};

    use crate::error::{HwError, Result};
    use crate::lines::{input_pin, output_pin};
    use crate::stepper::LineStepper;
    use crate::ultrasonic::Ultrasonic;

    pub use crate::adc::Mcp3008RainSensor;

    pub type HardwareRanger = Ultrasonic<OutputPin, InputPin>;
    pub type HardwareStepper = LineStepper<OutputPin, OutputPin, OutputPin>;

    fn gpio() -> Result<Gpio> {
        Gpio::new().map_err(|e| HwError::Gpio(format!("open gpio: {e}")))
    }

    pub fn open_ranger(trigger_pin: u8, echo_pin: u8, echo_timeout: Duration) -> Result<HardwareRanger> {
        let gpio = gpio()?;
        let trigger = output_pin(&gpio, trigger_pin, false)?;
        let echo = input_pin(&gpio, echo_pin)?;
        tracing::debug!(trigger_pin, echo_pin, "ultrasonic ranger ready");
        Ok(Ultrasonic::with_timeout(trigger, echo, echo_timeout))
    }

    /// Open the driver lines with the enable line already released (high).
    pub fn open_stepper(enable_pin: u8, dir_pin: u8, step_pin: u8) -> Result<HardwareStepper> {
        let gpio = gpio()?;
        let enable = output_pin(&gpio, enable_pin, true)?;
        let dir = output_pin(&gpio, dir_pin, false)?;
        let step = output_pin(&gpio, step_pin, false)?;
        tracing::debug!(enable_pin, dir_pin, step_pin, "stepper driver ready");
        Ok(LineStepper::new(enable, dir, step))
    }
}
