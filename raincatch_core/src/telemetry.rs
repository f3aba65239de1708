//! Telemetry events and the retrying POST client.
//!
//! Every event is posted as a JSON array holding one record. Delivery is
//! best effort: a bounded number of immediate attempts, then the event is
//! dropped with a log line. Sending never fails the caller.

use raincatch_traits::{Connectivity, Credentials, HttpClient};
use serde::Serialize;

use crate::config::TelemetryCfg;

/// `hours` value marking a periodic tank report rather than an open duration.
pub const PERIODIC_REPORT_HOURS: i64 = -1;

/// Dashboard ingestion endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    LidStatus,
    TankData,
    CurrentLevel,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::LidStatus => "/api/lidStatusData",
            Self::TankData => "/api/tankData",
            Self::CurrentLevel => "/api/currentLevelData",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    LidOpened {
        timestamp: String,
    },
    LidClosed {
        timestamp: String,
    },
    /// Sent on close: how long the lid was open and the level afterwards.
    TankReading {
        timestamp: String,
        open_duration_secs: i64,
        water_level_liters: f32,
    },
    PeriodicTankReport {
        timestamp: String,
        water_level_liters: f32,
    },
    CurrentLevel {
        timestamp: String,
        current_level_liters: f32,
    },
}

#[derive(Serialize)]
#[serde(untagged)]
enum Record<'a> {
    LidStatus {
        timestamp: &'a str,
        #[serde(rename = "lidStatus")]
        lid_status: &'static str,
    },
    Tank {
        date: &'a str,
        hours: i64,
        #[serde(rename = "waterLevel")]
        water_level: f32,
    },
    Level {
        date: &'a str,
        #[serde(rename = "currentLevel")]
        current_level: f32,
    },
}

impl TelemetryEvent {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::LidOpened { .. } | Self::LidClosed { .. } => Endpoint::LidStatus,
            Self::TankReading { .. } | Self::PeriodicTankReport { .. } => Endpoint::TankData,
            Self::CurrentLevel { .. } => Endpoint::CurrentLevel,
        }
    }

    fn record(&self) -> Record<'_> {
        match self {
            Self::LidOpened { timestamp } => Record::LidStatus {
                timestamp,
                lid_status: "open",
            },
            Self::LidClosed { timestamp } => Record::LidStatus {
                timestamp,
                lid_status: "close",
            },
            Self::TankReading {
                timestamp,
                open_duration_secs,
                water_level_liters,
            } => Record::Tank {
                date: timestamp,
                hours: *open_duration_secs,
                water_level: *water_level_liters,
            },
            Self::PeriodicTankReport {
                timestamp,
                water_level_liters,
            } => Record::Tank {
                date: timestamp,
                hours: PERIODIC_REPORT_HOURS,
                water_level: *water_level_liters,
            },
            Self::CurrentLevel {
                timestamp,
                current_level_liters,
            } => Record::Level {
                date: timestamp,
                current_level: *current_level_liters,
            },
        }
    }

    /// Wire body: a JSON array with this event's single record.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&[self.record()])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered { attempts: u8 },
    Dropped,
}

impl SendOutcome {
    pub fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct TelemetryClient {
    cfg: TelemetryCfg,
    credentials: Credentials,
}

impl TelemetryClient {
    pub fn new(cfg: TelemetryCfg, credentials: Credentials) -> Self {
        Self { cfg, credentials }
    }

    pub fn base_url(&self) -> &str {
        &self.cfg.base_url
    }

    pub fn url_for(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.cfg.base_url, endpoint.path())
    }

    pub fn send(
        &self,
        http: &mut dyn HttpClient,
        link: &mut dyn Connectivity,
        event: &TelemetryEvent,
    ) -> SendOutcome {
        let endpoint = event.endpoint();
        let body = match event.to_json() {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(error = %e, ?endpoint, "telemetry record not serializable; dropped");
                return SendOutcome::Dropped;
            }
        };

        if !link.is_connected() {
            tracing::info!(ssid = %self.credentials.ssid, "network down; reconnecting before send");
            if let Err(e) = link.ensure_connected(&self.credentials) {
                tracing::warn!(error = %e, "reconnect failed; attempting send anyway");
            }
        }

        let url = self.url_for(endpoint);
        let attempts = self.cfg.attempts.max(1);
        for attempt in 1..=attempts {
            match http.post_json(&url, &body) {
                Ok(resp) if resp.is_success() => {
                    tracing::debug!(endpoint = endpoint.path(), attempt, status = resp.status, "telemetry delivered");
                    return SendOutcome::Delivered { attempts: attempt };
                }
                Ok(resp) => {
                    tracing::warn!(endpoint = endpoint.path(), attempt, status = resp.status, "telemetry rejected");
                }
                Err(e) => {
                    tracing::warn!(endpoint = endpoint.path(), attempt, error = %e, "telemetry transport error");
                }
            }
        }
        tracing::error!(endpoint = endpoint.path(), attempts, "telemetry dropped after retries");
        SendOutcome::Dropped
    }
}
