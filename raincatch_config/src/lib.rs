#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and calibration fitting for the rain-lid controller.
//!
//! - `Config` and its sections deserialize from TOML. Every section has
//!   defaults, so an empty file is the stock tank and lid.
//! - `validate()` rejects values the control loop cannot run with.
//! - The volume calibration can be refit from a CSV of measured
//!   (distance, liters) pairs, with one outlier-rejection pass.
use serde::Deserialize;

/// Calibration CSV schema.
///
/// Expected headers:
/// distance_cm,liters
///
/// Example:
/// distance_cm,liters
/// 24.9,0.0
/// 10.0,4.45
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CalibrationRow {
    pub distance_cm: f32,
    pub liters: f32,
}

/// BCM pin numbers and the ADC channel of the rain sensor.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pins {
    pub trigger: u8,
    pub echo: u8,
    pub motor_step: u8,
    pub motor_dir: u8,
    pub motor_en: u8,
    pub rain_adc_channel: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            trigger: 23,
            echo: 24,
            motor_step: 17,
            motor_dir: 27,
            motor_en: 22,
            rain_adc_channel: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Sensing {
    /// Pings averaged per volume reading
    pub samples: u32,
    /// Gap between pings, to let echoes die down
    pub sample_gap_ms: u64,
    /// Ceiling for each echo edge
    pub echo_timeout_ms: u64,
    /// One-way speed of sound; halved internally for the round trip
    pub speed_of_sound_cm_per_us: f32,
    /// Usable tank capacity; auto-open stops at or above this
    pub max_volume_l: f32,
}

impl Default for Sensing {
    fn default() -> Self {
        Self {
            samples: 20,
            sample_gap_ms: 10,
            echo_timeout_ms: 5_000,
            speed_of_sound_cm_per_us: 0.0343,
            max_volume_l: 6.8,
        }
    }
}

/// Linear distance→volume model: liters = slope * distance_cm + intercept.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct VolumeCalibration {
    pub slope_l_per_cm: f32,
    pub intercept_l: f32,
}

impl Default for VolumeCalibration {
    fn default() -> Self {
        Self {
            slope_l_per_cm: -0.2984,
            intercept_l: 7.425,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Rain {
    /// Analog readings below this count as wet
    pub threshold: u16,
    /// Current-conditions endpoint (OpenWeather compatible)
    pub weather_url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub api_key: String,
}

impl Default for Rain {
    fn default() -> Self {
        Self {
            threshold: 1900,
            weather_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            latitude: -27.50,
            longitude: 153.01,
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Motor {
    pub step_delay_us: u64,
    pub open_steps: u32,
    pub close_steps: u32,
    /// Pause after enabling the driver
    pub settle_ms: u64,
    /// Pause after the last step before releasing the driver
    pub release_ms: u64,
}

impl Default for Motor {
    fn default() -> Self {
        Self {
            step_delay_us: 13_000,
            open_steps: 155,
            close_steps: 160,
            settle_ms: 1_000,
            release_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Telemetry {
    pub base_url: String,
    /// Total POST attempts per event (not retries)
    pub attempts: u8,
    pub http_timeout_ms: u64,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            base_url: "https://smartdrop.uqcloud.net".to_string(),
            attempts: 3,
            http_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Network {
    pub ssid: String,
    pub password: String,
    /// host:port probed to decide whether the link is up; derived from
    /// telemetry.base_url when absent
    pub probe: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Controller {
    pub cycle_secs: u64,
    pub report_interval_secs: u64,
    /// Fixed offset applied to UTC for telemetry timestamps
    pub utc_offset_hours: i32,
}

impl Default for Controller {
    fn default() -> Self {
        Self {
            cycle_secs: 300,
            report_interval_secs: 12 * 60 * 60,
            utc_offset_hours: 10,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub pins: Pins,
    pub sensing: Sensing,
    pub calibration: VolumeCalibration,
    pub rain: Rain,
    pub motor: Motor,
    pub telemetry: Telemetry,
    pub network: Network,
    pub controller: Controller,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl VolumeCalibration {
    /// Fit liters = a * distance_cm + b by ordinary least squares, then refit
    /// once without points whose residual exceeds 2σ.
    pub fn from_rows(rows: Vec<CalibrationRow>) -> eyre::Result<Self> {
        if rows.len() < 2 {
            eyre::bail!("calibration requires at least two rows, got {}", rows.len());
        }
        if let Some(i) = rows
            .iter()
            .position(|r| !(r.distance_cm.is_finite() && r.liters.is_finite()))
        {
            eyre::bail!("calibration row {} is not finite", i);
        }

        // Rows are recorded while filling or draining, so distances are monotonic
        let mut dir: i8 = 0; // 1 for increasing, -1 for decreasing
        for i in 1..rows.len() {
            let d = rows[i].distance_cm - rows[i - 1].distance_cm;
            if d == 0.0 {
                eyre::bail!(
                    "calibration rows have duplicate distances at index {} and {}",
                    i - 1,
                    i
                );
            }
            let step_dir = if d > 0.0 { 1 } else { -1 };
            if dir == 0 {
                dir = step_dir;
            } else if dir != step_dir {
                eyre::bail!(
                    "calibration distances must be monotonic (strictly increasing or strictly decreasing)"
                );
            }
        }

        let pts: Vec<(f64, f64)> = rows
            .iter()
            .map(|r| (f64::from(r.distance_cm), f64::from(r.liters)))
            .collect();
        let (a0, b0) = fit(&pts)?;

        let sumsq: f64 = pts
            .iter()
            .map(|(x, y)| {
                let r = y - (a0 * x + b0);
                r * r
            })
            .sum();
        let rms = (sumsq / pts.len() as f64).sqrt();

        let (a, b) = robust_refit(&pts, a0, b0, rms, 2.0).unwrap_or((a0, b0));
        Ok(Self {
            slope_l_per_cm: a as f32,
            intercept_l: b as f32,
        })
    }
}

/// OLS fit in f64 for numerical stability.
fn fit(pts: &[(f64, f64)]) -> eyre::Result<(f64, f64)> {
    let n = pts.len() as f64;
    let mean_x = pts.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pts.iter().map(|p| p.1).sum::<f64>() / n;
    let mut sxx = 0.0f64;
    let mut sxy = 0.0f64;
    for (x, y) in pts {
        let dx = x - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }
    if !sxx.is_finite() || sxx == 0.0 {
        eyre::bail!("calibration cannot determine slope (degenerate distance variance)");
    }
    let a = sxy / sxx;
    if !a.is_finite() {
        eyre::bail!("calibration produced non-finite slope");
    }
    if a == 0.0 {
        eyre::bail!("calibration produced zero slope (volume does not depend on distance)");
    }
    Ok((a, mean_y - a * mean_x))
}

/// Single-step robust refit: drop points with |residual| > k * rms around
/// y = a0*x + b0 and fit the inliers with an online (Welford/Chan) update.
/// Returns None when nothing was rejected, fewer than two inliers remain,
/// or the inlier variance is degenerate; the caller keeps (a0, b0).
fn robust_refit(pts: &[(f64, f64)], a0: f64, b0: f64, rms: f64, k: f64) -> Option<(f64, f64)> {
    if !(rms.is_finite() && rms > 0.0 && k.is_finite() && k > 0.0) {
        return None;
    }
    let thr = k * rms;
    let mut n_in: usize = 0;
    let mut mean_x = 0.0f64;
    let mut mean_y = 0.0f64;
    let mut cxx = 0.0f64;
    let mut cxy = 0.0f64;

    for (x, y) in pts {
        if (y - (a0 * x + b0)).abs() > thr {
            continue;
        }
        n_in += 1;
        let n = n_in as f64;
        let dx = x - mean_x;
        let dy = y - mean_y;
        let mean_x_new = mean_x + dx / n;
        let mean_y_new = mean_y + dy / n;
        cxx += dx * (x - mean_x_new);
        cxy += dx * (y - mean_y_new);
        mean_x = mean_x_new;
        mean_y = mean_y_new;
    }

    if n_in < 2 || n_in == pts.len() || !cxx.is_finite() || cxx == 0.0 {
        return None;
    }
    let a = cxy / cxx;
    if !a.is_finite() || a == 0.0 {
        return None;
    }
    Some((a, mean_y - a * mean_x))
}

impl TryFrom<Vec<CalibrationRow>> for VolumeCalibration {
    type Error = eyre::Report;
    fn try_from(rows: Vec<CalibrationRow>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

pub fn load_calibration_csv(path: &std::path::Path) -> eyre::Result<VolumeCalibration> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open calibration CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["distance_cm", "liters"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "calibration CSV must have headers 'distance_cm,liters', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CalibrationRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        }
    }

    VolumeCalibration::try_from(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        if self.pins.rain_adc_channel > 7 {
            eyre::bail!("pins.rain_adc_channel must be in 0..=7");
        }
        let p = &self.pins;
        let used = [p.trigger, p.echo, p.motor_step, p.motor_dir, p.motor_en];
        for (i, a) in used.iter().enumerate() {
            if used[i + 1..].contains(a) {
                eyre::bail!("pins: BCM pin {a} assigned twice");
            }
        }

        // Sensing
        if self.sensing.samples == 0 {
            eyre::bail!("sensing.samples must be >= 1");
        }
        if self.sensing.echo_timeout_ms == 0 {
            eyre::bail!("sensing.echo_timeout_ms must be >= 1");
        }
        if !(self.sensing.speed_of_sound_cm_per_us > 0.0
            && self.sensing.speed_of_sound_cm_per_us.is_finite())
        {
            eyre::bail!("sensing.speed_of_sound_cm_per_us must be > 0");
        }
        if !(self.sensing.max_volume_l > 0.0 && self.sensing.max_volume_l.is_finite()) {
            eyre::bail!("sensing.max_volume_l must be > 0");
        }

        // Calibration
        if !self.calibration.slope_l_per_cm.is_finite() || !self.calibration.intercept_l.is_finite()
        {
            eyre::bail!("calibration coefficients must be finite");
        }
        if self.calibration.slope_l_per_cm == 0.0 {
            eyre::bail!("calibration.slope_l_per_cm must be non-zero");
        }

        // Rain
        if self.rain.weather_url.trim().is_empty() {
            eyre::bail!("rain.weather_url must not be empty");
        }
        if !(-90.0..=90.0).contains(&self.rain.latitude) {
            eyre::bail!("rain.latitude must be in [-90, 90]");
        }
        if !(-180.0..=180.0).contains(&self.rain.longitude) {
            eyre::bail!("rain.longitude must be in [-180, 180]");
        }

        // Motor
        if self.motor.step_delay_us < 2 {
            eyre::bail!("motor.step_delay_us must be >= 2");
        }
        if self.motor.open_steps == 0 || self.motor.close_steps == 0 {
            eyre::bail!("motor.open_steps and motor.close_steps must be >= 1");
        }
        if self.motor.settle_ms > 60_000 || self.motor.release_ms > 60_000 {
            eyre::bail!("motor settle/release pauses are unreasonably large (>60s)");
        }

        // Telemetry
        if self.telemetry.base_url.trim().is_empty() {
            eyre::bail!("telemetry.base_url must not be empty");
        }
        if self.telemetry.base_url.ends_with('/') {
            eyre::bail!("telemetry.base_url must not end with '/'");
        }
        if self.telemetry.attempts == 0 {
            eyre::bail!("telemetry.attempts must be >= 1");
        }
        if self.telemetry.http_timeout_ms == 0 {
            eyre::bail!("telemetry.http_timeout_ms must be >= 1");
        }

        // Controller
        if self.controller.cycle_secs == 0 {
            eyre::bail!("controller.cycle_secs must be >= 1");
        }
        if self.controller.report_interval_secs == 0 {
            eyre::bail!("controller.report_interval_secs must be >= 1");
        }
        if !(-14..=14).contains(&self.controller.utc_offset_hours) {
            eyre::bail!("controller.utc_offset_hours must be in [-14, 14]");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_stock_configuration() {
        let cfg = load_toml("").expect("parse");
        assert_eq!(cfg.sensing.samples, 20);
        assert_eq!(cfg.motor.open_steps, 155);
        assert_eq!(cfg.motor.close_steps, 160);
        assert_eq!(cfg.controller.cycle_secs, 300);
        assert_eq!(cfg.calibration, VolumeCalibration::default());
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn refit_drops_single_outlier() {
        // liters = -0.3 * d + 7.5 with one wild point
        let mut rows: Vec<CalibrationRow> = (0..10)
            .map(|i| {
                let d = 24.0 - 2.0 * i as f32;
                CalibrationRow {
                    distance_cm: d,
                    liters: -0.3 * d + 7.5,
                }
            })
            .collect();
        rows[4].liters += 3.0;
        let c = VolumeCalibration::from_rows(rows).unwrap();
        assert!((c.slope_l_per_cm + 0.3).abs() < 1e-4, "{c:?}");
        assert!((c.intercept_l - 7.5).abs() < 1e-3, "{c:?}");
    }
}
