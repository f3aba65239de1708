//! Fill-level sensing: echo widths to centimetres to litres.

use std::sync::Arc;
use std::time::Duration;

use raincatch_traits::{Clock, RangeSensor};

use crate::config::{
    MAX_VOLUME_L, SensingCfg, VOLUME_INTERCEPT_L, VOLUME_SLOPE_L_PER_CM,
};
use crate::error::LidError;

/// Distance to the reflecting surface for a round-trip echo width.
#[inline]
pub fn distance_cm(echo_us: u32, speed_cm_per_us: f32) -> f32 {
    echo_us as f32 * speed_cm_per_us / 2.0
}

/// Linear distance→volume model with a floor at zero and a capacity bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeModel {
    pub slope_l_per_cm: f32,
    pub intercept_l: f32,
    pub max_volume_l: f32,
}

impl Default for VolumeModel {
    fn default() -> Self {
        Self {
            slope_l_per_cm: VOLUME_SLOPE_L_PER_CM,
            intercept_l: VOLUME_INTERCEPT_L,
            max_volume_l: MAX_VOLUME_L,
        }
    }
}

impl VolumeModel {
    /// Litres held for a given sensor-to-surface distance, never negative.
    #[inline]
    pub fn liters(&self, distance_cm: f32) -> f32 {
        (self.slope_l_per_cm * distance_cm + self.intercept_l).max(0.0)
    }

    /// True when `volume_l` is a real reading below capacity.
    /// The failed-read sentinel is negative and so never has room.
    #[inline]
    pub fn has_room(&self, volume_l: f32) -> bool {
        volume_l >= 0.0 && volume_l < self.max_volume_l
    }
}

/// Averages range samples into a volume reading.
pub struct VolumeEstimator<R> {
    ranger: R,
    cfg: SensingCfg,
    model: VolumeModel,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl<R: RangeSensor> VolumeEstimator<R> {
    pub fn new(
        ranger: R,
        cfg: SensingCfg,
        model: VolumeModel,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            ranger,
            cfg,
            model,
            clock,
        }
    }

    pub fn model(&self) -> &VolumeModel {
        &self.model
    }

    /// Take the configured number of samples.
    pub fn read(&mut self) -> Result<f32, LidError> {
        self.estimate(self.cfg.samples)
    }

    /// Take `samples` pings and convert the mean distance to litres.
    ///
    /// Fails fast: the first timed-out ping discards everything gathered so far.
    pub fn estimate(&mut self, samples: u32) -> Result<f32, LidError> {
        if samples == 0 {
            return Err(LidError::Config("sample count must be >= 1".into()));
        }
        let gap = Duration::from_millis(self.cfg.sample_gap_ms);
        let mut mean_cm = 0.0_f32;
        for i in 1..=samples {
            let Some(echo_us) = self.ranger.measure() else {
                tracing::warn!(sample = i, of = samples, "range sample timed out; volume read aborted");
                return Err(LidError::SensingAggregate {
                    failed_at: i,
                    samples,
                });
            };
            let d = distance_cm(echo_us, self.cfg.speed_of_sound_cm_per_us);
            mean_cm += (d - mean_cm) / i as f32;
            self.clock.sleep(gap);
        }
        let volume_l = self.model.liters(mean_cm);
        tracing::debug!(mean_cm, volume_l, samples, "volume reading");
        Ok(volume_l)
    }
}
