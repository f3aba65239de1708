//! Lid and tank state owned by the controller.

use serde::Serialize;

use crate::config::VOLUME_SENTINEL_L;
use crate::error::LidError;
use crate::lid_override::LidOverrideCommand;
use crate::rain::RainSignal;

/// Controller position. `OpenRaining` is also entered through a remote open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LidState {
    ClosedDry,
    OpenRaining,
}

/// Volatile tank state, rebuilt on every boot.
///
/// `lid_open` implies `last_open_epoch.is_some()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TankState {
    /// Last reading in litres, or the sentinel after a failed read.
    pub volume_liters: f32,
    /// Fused rain state as last acted on; doubles as "opened by the controller".
    pub is_raining: bool,
    pub lid_open: bool,
    pub last_open_epoch: Option<i64>,
    pub last_telemetry_epoch: i64,
}

impl TankState {
    pub fn new(boot_epoch: i64) -> Self {
        Self {
            volume_liters: VOLUME_SENTINEL_L,
            is_raining: false,
            lid_open: false,
            last_open_epoch: None,
            last_telemetry_epoch: boot_epoch,
        }
    }

    pub fn lid_state(&self) -> LidState {
        if self.is_raining {
            LidState::OpenRaining
        } else {
            LidState::ClosedDry
        }
    }
}

/// What moved the lid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Rain,
    Override,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "trigger", rename_all = "lowercase")]
pub enum LidAction {
    Opened(Trigger),
    Closed(Trigger),
}

/// Summary of one supervisory cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub timestamp: String,
    pub volume_liters: f32,
    pub raining: bool,
    pub command: LidOverrideCommand,
    pub actions: Vec<LidAction>,
    pub periodic_report: bool,
    pub events_delivered: u32,
    pub events_dropped: u32,
    pub lid: LidState,
}

/// One-shot sensor and network check; nothing is actuated or reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub timestamp: String,
    /// `None` when the volume read failed.
    pub volume_liters: Option<f32>,
    #[serde(skip)]
    pub volume_error: Option<LidError>,
    pub rain: RainSignal,
    pub command: LidOverrideCommand,
}

impl Diagnostics {
    /// The volume reading, or the error that stopped it.
    pub fn volume(&self) -> Result<f32, LidError> {
        match (&self.volume_error, self.volume_liters) {
            (Some(e), _) => Err(e.clone()),
            (None, Some(v)) => Ok(v),
            (None, None) => Err(LidError::SensingTimeout),
        }
    }
}
