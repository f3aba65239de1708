//! Lid stepper actuation.
//!
//! One actuation is a fixed open-loop travel: enable, settle, set direction,
//! a bounded loop of step pulses, release pause, disable. There is no
//! position feedback; step counts are calibrated per lid.

use std::sync::Arc;
use std::time::Duration;

use eyre::WrapErr;
use raincatch_traits::{Clock, Rotation, StepperDriver};

use crate::config::MotorCfg;
use crate::error::Result;
use crate::hw_error::map_hw_error;
use crate::util::split_step_period;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Open,
    Close,
}

impl Direction {
    /// Opening turns counter-clockwise, closing clockwise.
    pub fn rotation(self) -> Rotation {
        match self {
            Self::Open => Rotation::CounterClockwise,
            Self::Close => Rotation::Clockwise,
        }
    }
}

/// What one actuation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuationReport {
    pub direction: Direction,
    pub steps: u32,
    /// Time spent in the step loop, excluding settle and release pauses.
    pub stepping: Duration,
}

pub struct MotorActuator<D> {
    driver: D,
    cfg: MotorCfg,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl<D: StepperDriver> MotorActuator<D> {
    pub fn new(driver: D, cfg: MotorCfg, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self { driver, cfg, clock }
    }

    pub fn steps_for(&self, direction: Direction) -> u32 {
        match direction {
            Direction::Open => self.cfg.open_steps,
            Direction::Close => self.cfg.close_steps,
        }
    }

    /// De-energize the driver.
    pub fn release(&mut self) -> Result<()> {
        self.driver
            .set_enabled(false)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("stepper disable")
    }

    /// Run one full travel. The driver is released afterwards whether or not
    /// the travel succeeded.
    pub fn actuate(&mut self, direction: Direction) -> Result<ActuationReport> {
        let steps = self.steps_for(direction);
        tracing::info!(?direction, steps, "actuating lid");
        let travel = self.travel(direction, steps);
        let released = self.release();
        let report = travel?;
        released?;
        tracing::debug!(
            ?direction,
            steps,
            stepping_ms = report.stepping.as_millis() as u64,
            "lid actuation complete"
        );
        Ok(report)
    }

    fn travel(&mut self, direction: Direction, steps: u32) -> Result<ActuationReport> {
        self.driver
            .set_enabled(true)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("stepper enable")?;
        self.clock.sleep(Duration::from_millis(self.cfg.settle_ms));
        self.driver
            .set_direction(direction.rotation())
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err("stepper direction")?;

        let (high, low) = split_step_period(self.cfg.step_delay_us);
        let started = self.clock.now();
        for step in 0..steps {
            self.driver
                .set_step(true)
                .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
                .wrap_err_with(|| format!("step {step} rising edge"))?;
            self.clock.sleep(high);
            self.driver
                .set_step(false)
                .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
                .wrap_err_with(|| format!("step {step} falling edge"))?;
            self.clock.sleep(low);
        }
        let stepping = self.clock.now().saturating_duration_since(started);

        self.clock.sleep(Duration::from_millis(self.cfg.release_ms));
        Ok(ActuationReport {
            direction,
            steps,
            stepping,
        })
    }
}
