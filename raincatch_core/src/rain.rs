//! Rain fusion: local analog sensor OR remote weather report.

use raincatch_traits::{HttpClient, RainSensor};

use crate::config::RainCfg;
use crate::error::LidError;
use crate::hw_error::map_hw_error;
use crate::remote::fetch_json;
use crate::weather::WeatherReport;

/// Both sub-signals of one fused evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct RainSignal {
    pub local: bool,
    pub remote: bool,
}

impl RainSignal {
    #[inline]
    pub fn is_raining(&self) -> bool {
        self.local || self.remote
    }
}

pub struct RainFusion<S> {
    sensor: S,
    cfg: RainCfg,
}

impl<S: RainSensor> RainFusion<S> {
    pub fn new(sensor: S, cfg: RainCfg) -> Self {
        Self { sensor, cfg }
    }

    /// Local sensor says wet. A failed read counts as dry.
    pub fn local_wet(&mut self) -> bool {
        match self.sensor.read_raw() {
            Ok(raw) => {
                let wet = raw < self.cfg.threshold;
                tracing::debug!(raw, threshold = self.cfg.threshold, wet, "rain sensor");
                wet
            }
            Err(e) => {
                let err = map_hw_error(&*e);
                tracing::warn!(error = %err, "rain sensor read failed; treating as dry");
                false
            }
        }
    }

    /// Remote weather report says rain. Any failure counts as no rain.
    pub fn remote_rain(&self, http: &mut dyn HttpClient) -> bool {
        match self.query_weather(http) {
            Ok(report) => report.reports_rain(),
            Err(e) => {
                tracing::warn!(error = %e, "weather query failed; treating as no rain");
                false
            }
        }
    }

    fn query_weather(&self, http: &mut dyn HttpClient) -> Result<WeatherReport, LidError> {
        fetch_json(http, &self.cfg.query_url())
    }

    /// Fused rain state. The weather service is not queried when the local
    /// sensor is already wet.
    pub fn is_raining(&mut self, http: &mut dyn HttpClient) -> bool {
        self.local_wet() || self.remote_rain(http)
    }

    /// Evaluate both sources unconditionally (diagnostics).
    pub fn evaluate(&mut self, http: &mut dyn HttpClient) -> RainSignal {
        RainSignal {
            local: self.local_wet(),
            remote: self.remote_rain(http),
        }
    }
}
