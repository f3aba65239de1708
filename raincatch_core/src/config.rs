//! Runtime configuration for the lid controller.
//!
//! Compiled-in defaults are the named constants below; the structs carry the
//! values actually used at runtime. They are separate from the
//! TOML-deserialized schema in `raincatch_config` (see `conversions`).

use raincatch_traits::Credentials;

/// Speed of sound in air at roughly 20 °C, in centimetres per microsecond.
pub const SPEED_OF_SOUND_CM_PER_US: f32 = 0.0343;
/// Range samples averaged into one volume reading.
pub const DEFAULT_SAMPLES: u32 = 20;
/// Pause after each successful range sample.
pub const SAMPLE_GAP_MS: u64 = 10;
/// Bound on each echo edge wait (start and end) of a single ping.
pub const ECHO_TIMEOUT_MS: u64 = 5_000;

/// Litres lost per centimetre of headroom between sensor and water surface.
pub const VOLUME_SLOPE_L_PER_CM: f32 = -0.2984;
/// Litres at zero headroom.
pub const VOLUME_INTERCEPT_L: f32 = 7.425;
/// Tank capacity; at or above this the lid stays shut even when raining.
pub const MAX_VOLUME_L: f32 = 6.8;
/// Reported in place of a volume when a reading failed.
pub const VOLUME_SENTINEL_L: f32 = -1.0;

/// Raw rain-sensor counts below this mean wet (12-bit scale, lower is wetter).
pub const RAIN_THRESHOLD: u16 = 1900;
pub const WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const WEATHER_LATITUDE: f64 = -27.50;
pub const WEATHER_LONGITUDE: f64 = 153.01;

/// Step period of the lid stepper.
pub const STEP_DELAY_US: u64 = 13_000;
/// Steps from closed to open (counter-clockwise).
pub const OPEN_STEPS: u32 = 155;
/// Steps from open to closed (clockwise). A few extra to seat the lid.
pub const CLOSE_STEPS: u32 = 160;
/// Pause after enabling the driver, before the first step.
pub const SETTLE_MS: u64 = 1_000;
/// Pause after the last step, before releasing the driver.
pub const RELEASE_MS: u64 = 500;

pub const TELEMETRY_BASE_URL: &str = "https://smartdrop.uqcloud.net";
/// Total POST attempts per telemetry event.
pub const TELEMETRY_ATTEMPTS: u8 = 3;

/// Supervisory loop period.
pub const CYCLE_SECS: u64 = 300;
/// Interval between periodic tank reports.
pub const REPORT_INTERVAL_SECS: u64 = 12 * 60 * 60;
/// Fixed offset applied to UTC for telemetry timestamps (AEST).
pub const UTC_OFFSET_HOURS: i32 = 10;

/// Range sampling parameters.
#[derive(Debug, Clone)]
pub struct SensingCfg {
    /// Samples per volume reading (must be >= 1).
    pub samples: u32,
    pub sample_gap_ms: u64,
    pub speed_of_sound_cm_per_us: f32,
}

impl Default for SensingCfg {
    fn default() -> Self {
        Self {
            samples: DEFAULT_SAMPLES,
            sample_gap_ms: SAMPLE_GAP_MS,
            speed_of_sound_cm_per_us: SPEED_OF_SOUND_CM_PER_US,
        }
    }
}

/// Local and remote rain detection parameters.
#[derive(Debug, Clone)]
pub struct RainCfg {
    pub threshold: u16,
    pub weather_url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub api_key: String,
}

impl Default for RainCfg {
    fn default() -> Self {
        Self {
            threshold: RAIN_THRESHOLD,
            weather_url: WEATHER_URL.to_string(),
            latitude: WEATHER_LATITUDE,
            longitude: WEATHER_LONGITUDE,
            api_key: String::new(),
        }
    }
}

impl RainCfg {
    /// Full weather query URL with coordinates and key.
    pub fn query_url(&self) -> String {
        format!(
            "{}?lat={:.2}&lon={:.2}&appid={}",
            self.weather_url, self.latitude, self.longitude, self.api_key
        )
    }
}

/// Stepper travel and timing.
#[derive(Debug, Clone)]
pub struct MotorCfg {
    pub step_delay_us: u64,
    pub open_steps: u32,
    pub close_steps: u32,
    pub settle_ms: u64,
    pub release_ms: u64,
}

impl Default for MotorCfg {
    fn default() -> Self {
        Self {
            step_delay_us: STEP_DELAY_US,
            open_steps: OPEN_STEPS,
            close_steps: CLOSE_STEPS,
            settle_ms: SETTLE_MS,
            release_ms: RELEASE_MS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryCfg {
    /// Scheme and host, no trailing slash; endpoints are appended verbatim.
    pub base_url: String,
    pub attempts: u8,
}

impl Default for TelemetryCfg {
    fn default() -> Self {
        Self {
            base_url: TELEMETRY_BASE_URL.to_string(),
            attempts: TELEMETRY_ATTEMPTS,
        }
    }
}

/// Supervisory loop timing.
#[derive(Debug, Clone)]
pub struct ControllerCfg {
    pub cycle_secs: u64,
    pub report_interval_secs: u64,
    pub utc_offset_hours: i32,
}

impl Default for ControllerCfg {
    fn default() -> Self {
        Self {
            cycle_secs: CYCLE_SECS,
            report_interval_secs: REPORT_INTERVAL_SECS,
            utc_offset_hours: UTC_OFFSET_HOURS,
        }
    }
}

/// Everything the controller needs, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub sensing: SensingCfg,
    pub volume: crate::volume::VolumeModel,
    pub rain: RainCfg,
    pub motor: MotorCfg,
    pub telemetry: TelemetryCfg,
    pub controller: ControllerCfg,
    pub credentials: Credentials,
}
