//! `From` implementations bridging `raincatch_config` types to `raincatch_core` types.

use raincatch_traits::Credentials;

use crate::config::{ControllerCfg, MotorCfg, RainCfg, SensingCfg, Settings, TelemetryCfg};
use crate::volume::VolumeModel;

// ── SensingCfg ───────────────────────────────────────────────────────────────

impl From<&raincatch_config::Sensing> for SensingCfg {
    fn from(c: &raincatch_config::Sensing) -> Self {
        Self {
            samples: c.samples,
            sample_gap_ms: c.sample_gap_ms,
            speed_of_sound_cm_per_us: c.speed_of_sound_cm_per_us,
        }
    }
}

// ── VolumeModel ──────────────────────────────────────────────────────────────

impl From<(&raincatch_config::VolumeCalibration, &raincatch_config::Sensing)> for VolumeModel {
    fn from((cal, sensing): (&raincatch_config::VolumeCalibration, &raincatch_config::Sensing)) -> Self {
        Self {
            slope_l_per_cm: cal.slope_l_per_cm,
            intercept_l: cal.intercept_l,
            max_volume_l: sensing.max_volume_l,
        }
    }
}

// ── RainCfg ──────────────────────────────────────────────────────────────────

impl From<&raincatch_config::Rain> for RainCfg {
    fn from(c: &raincatch_config::Rain) -> Self {
        Self {
            threshold: c.threshold,
            weather_url: c.weather_url.clone(),
            latitude: c.latitude,
            longitude: c.longitude,
            api_key: c.api_key.clone(),
        }
    }
}

// ── MotorCfg ─────────────────────────────────────────────────────────────────

impl From<&raincatch_config::Motor> for MotorCfg {
    fn from(c: &raincatch_config::Motor) -> Self {
        Self {
            step_delay_us: c.step_delay_us,
            open_steps: c.open_steps,
            close_steps: c.close_steps,
            settle_ms: c.settle_ms,
            release_ms: c.release_ms,
        }
    }
}

// ── TelemetryCfg ─────────────────────────────────────────────────────────────

impl From<&raincatch_config::Telemetry> for TelemetryCfg {
    fn from(c: &raincatch_config::Telemetry) -> Self {
        Self {
            base_url: c.base_url.clone(),
            attempts: c.attempts,
        }
    }
}

// ── ControllerCfg ────────────────────────────────────────────────────────────

impl From<&raincatch_config::Controller> for ControllerCfg {
    fn from(c: &raincatch_config::Controller) -> Self {
        Self {
            cycle_secs: c.cycle_secs,
            report_interval_secs: c.report_interval_secs,
            utc_offset_hours: c.utc_offset_hours,
        }
    }
}

// ── Credentials ──────────────────────────────────────────────────────────────

// A `From` impl is not allowed here (orphan rule: neither type is local).
fn credentials_from(c: &raincatch_config::Network) -> Credentials {
    Credentials {
        ssid: c.ssid.clone(),
        password: c.password.clone(),
    }
}

// ── Settings ─────────────────────────────────────────────────────────────────

impl From<&raincatch_config::Config> for Settings {
    fn from(c: &raincatch_config::Config) -> Self {
        Self {
            sensing: (&c.sensing).into(),
            volume: (&c.calibration, &c.sensing).into(),
            rain: (&c.rain).into(),
            motor: (&c.motor).into(),
            telemetry: (&c.telemetry).into(),
            controller: (&c.controller).into(),
            credentials: credentials_from(&c.network),
        }
    }
}
