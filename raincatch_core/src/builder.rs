//! Type-state builder for `LidController`.
//!
//! The builder enforces at compile time that the range sensor, rain sensor
//! and stepper are provided before `build()` is available. `try_build()` is
//! always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use raincatch_traits::clock::{Clock, MonotonicClock};
use raincatch_traits::{Connectivity, HttpClient, RainSensor, RangeSensor, StepperDriver};

use crate::config::Settings;
use crate::controller::LidController;
use crate::error::{BuildError, Result};
use crate::mocks::{AlwaysConnected, OfflineHttp};
use crate::motor::MotorActuator;
use crate::rain::RainFusion;
use crate::status::TankState;
use crate::telemetry::TelemetryClient;
use crate::volume::VolumeEstimator;

/// Every device and collaborator the controller talks to, assembled once at
/// startup by the binary.
pub struct Devices {
    pub ranger: Box<dyn RangeSensor>,
    pub rain_sensor: Box<dyn RainSensor>,
    pub stepper: Box<dyn StepperDriver>,
    pub http: Box<dyn HttpClient>,
    pub link: Box<dyn Connectivity>,
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Builder for `LidController`. Settings are validated on `build()`.
pub struct LidControllerBuilder<R, S, M> {
    ranger: Option<Box<dyn RangeSensor>>,
    rain_sensor: Option<Box<dyn RainSensor>>,
    stepper: Option<Box<dyn StepperDriver>>,
    http: Option<Box<dyn HttpClient>>,
    link: Option<Box<dyn Connectivity>>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    settings: Option<Settings>,
    _r: PhantomData<R>,
    _s: PhantomData<S>,
    _m: PhantomData<M>,
}

impl Default for LidControllerBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            ranger: None,
            rain_sensor: None,
            stepper: None,
            http: None,
            link: None,
            clock: None,
            settings: None,
            _r: PhantomData,
            _s: PhantomData,
            _m: PhantomData,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate(s: &Settings) -> Result<()> {
    if s.sensing.samples == 0 {
        return Err(invalid("samples must be >= 1"));
    }
    if !(s.sensing.speed_of_sound_cm_per_us.is_finite() && s.sensing.speed_of_sound_cm_per_us > 0.0) {
        return Err(invalid("speed of sound must be > 0"));
    }
    if !(s.volume.slope_l_per_cm.is_finite() && s.volume.intercept_l.is_finite()) {
        return Err(invalid("volume calibration must be finite"));
    }
    if !(s.volume.max_volume_l.is_finite() && s.volume.max_volume_l > 0.0) {
        return Err(invalid("max volume must be > 0"));
    }
    if s.motor.step_delay_us < 2 {
        return Err(invalid("step delay must be >= 2 us"));
    }
    if s.motor.open_steps == 0 || s.motor.close_steps == 0 {
        return Err(invalid("step counts must be > 0"));
    }
    if s.telemetry.attempts == 0 {
        return Err(invalid("telemetry attempts must be >= 1"));
    }
    if s.controller.cycle_secs == 0 {
        return Err(invalid("cycle period must be >= 1 s"));
    }
    if s.controller.report_interval_secs == 0 {
        return Err(invalid("report interval must be >= 1 s"));
    }
    Ok(())
}

impl<R, S, M> LidControllerBuilder<R, S, M> {
    /// Fallible build available in any type-state; returns detailed error for missing pieces.
    pub fn try_build(self) -> Result<LidController> {
        let ranger = self
            .ranger
            .ok_or_else(|| eyre::Report::new(BuildError::MissingRanger))?;
        let rain_sensor = self
            .rain_sensor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingRainSensor))?;
        let stepper = self
            .stepper
            .ok_or_else(|| eyre::Report::new(BuildError::MissingStepper))?;
        let settings = self.settings.unwrap_or_default();
        validate(&settings)?;

        let http = self.http.unwrap_or_else(|| {
            tracing::warn!("no http client provided; weather, override and telemetry are offline");
            Box::new(OfflineHttp) as Box<dyn HttpClient>
        });
        let link = self
            .link
            .unwrap_or_else(|| Box::new(AlwaysConnected) as Box<dyn Connectivity>);
        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };

        let Settings {
            sensing,
            volume,
            rain,
            motor,
            telemetry,
            controller,
            credentials,
        } = settings;

        Ok(LidController {
            volume: VolumeEstimator::new(ranger, sensing, volume, clock.clone()),
            rain: RainFusion::new(rain_sensor, rain),
            motor: MotorActuator::new(stepper, motor, clock.clone()),
            telemetry: TelemetryClient::new(telemetry, credentials),
            http,
            link,
            state: TankState::new(clock.unix_secs()),
            clock,
            cfg: controller,
            booted: false,
        })
    }
}

/// Chainable setters that do not affect type-state.
impl<R, S, M> LidControllerBuilder<R, S, M> {
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }
    pub fn with_http(mut self, http: impl HttpClient + 'static) -> Self {
        self.http = Some(Box::new(http));
        self
    }
    pub fn with_link(mut self, link: impl Connectivity + 'static) -> Self {
        self.link = Some(Box::new(link));
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<S, M> LidControllerBuilder<Missing, S, M> {
    pub fn with_ranger(self, ranger: impl RangeSensor + 'static) -> LidControllerBuilder<Set, S, M> {
        LidControllerBuilder {
            ranger: Some(Box::new(ranger)),
            rain_sensor: self.rain_sensor,
            stepper: self.stepper,
            http: self.http,
            link: self.link,
            clock: self.clock,
            settings: self.settings,
            _r: PhantomData,
            _s: PhantomData,
            _m: PhantomData,
        }
    }
}

impl<R, M> LidControllerBuilder<R, Missing, M> {
    pub fn with_rain_sensor(
        self,
        sensor: impl RainSensor + 'static,
    ) -> LidControllerBuilder<R, Set, M> {
        LidControllerBuilder {
            ranger: self.ranger,
            rain_sensor: Some(Box::new(sensor)),
            stepper: self.stepper,
            http: self.http,
            link: self.link,
            clock: self.clock,
            settings: self.settings,
            _r: PhantomData,
            _s: PhantomData,
            _m: PhantomData,
        }
    }
}

impl<R, S> LidControllerBuilder<R, S, Missing> {
    pub fn with_stepper(
        self,
        stepper: impl StepperDriver + 'static,
    ) -> LidControllerBuilder<R, S, Set> {
        LidControllerBuilder {
            ranger: self.ranger,
            rain_sensor: self.rain_sensor,
            stepper: Some(Box::new(stepper)),
            http: self.http,
            link: self.link,
            clock: self.clock,
            settings: self.settings,
            _r: PhantomData,
            _s: PhantomData,
            _m: PhantomData,
        }
    }
}

impl LidControllerBuilder<Missing, Missing, Missing> {
    /// Take every device from an assembled `Devices` set.
    pub fn with_devices(self, devices: Devices) -> LidControllerBuilder<Set, Set, Set> {
        LidControllerBuilder {
            ranger: Some(devices.ranger),
            rain_sensor: Some(devices.rain_sensor),
            stepper: Some(devices.stepper),
            http: Some(devices.http),
            link: Some(devices.link),
            clock: self.clock,
            settings: self.settings,
            _r: PhantomData,
            _s: PhantomData,
            _m: PhantomData,
        }
    }
}

impl LidControllerBuilder<Set, Set, Set> {
    /// Validate and build. Only available when all three devices are set.
    pub fn build(self) -> Result<LidController> {
        self.try_build()
    }
}

/// Validate settings and build a controller from an assembled device set.
pub fn build_controller(
    devices: Devices,
    settings: Settings,
    clock: Option<Box<dyn Clock + Send + Sync>>,
) -> Result<LidController> {
    let b = LidController::builder().with_devices(devices).with_settings(settings);
    match clock {
        Some(c) => b.with_clock(c).build(),
        None => b.build(),
    }
}
