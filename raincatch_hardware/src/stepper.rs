//! Step/dir/enable driver wired to three output lines.

use raincatch_traits::{BoxError, Rotation, StepperDriver};

use crate::lines::OutputLine;

/// A4988/DRV8825 style driver. The enable input is active low, so
/// "disabled" means the line idles high and the coils hold no current.
pub struct LineStepper<En: OutputLine, Dir: OutputLine, Step: OutputLine> {
    enable: En,
    dir: Dir,
    step: Step,
}

impl<En: OutputLine, Dir: OutputLine, Step: OutputLine> LineStepper<En, Dir, Step> {
    pub fn new(enable: En, dir: Dir, step: Step) -> Self {
        Self { enable, dir, step }
    }
}

impl<En: OutputLine, Dir: OutputLine, Step: OutputLine> StepperDriver
    for LineStepper<En, Dir, Step>
{
    fn set_enabled(&mut self, enabled: bool) -> Result<(), BoxError> {
        self.enable.set_level(!enabled)?;
        Ok(())
    }

    fn set_direction(&mut self, rotation: Rotation) -> Result<(), BoxError> {
        self.dir.set_level(matches!(rotation, Rotation::Clockwise))?;
        Ok(())
    }

    fn set_step(&mut self, high: bool) -> Result<(), BoxError> {
        self.step.set_level(high)?;
        Ok(())
    }
}
