//! The lid-control state machine and its supervisory loop.

use std::sync::Arc;
use std::time::Duration;

use raincatch_traits::{Clock, Connectivity, HttpClient, RainSensor, RangeSensor, StepperDriver};

use crate::builder::{LidControllerBuilder, Missing};
use crate::config::{ControllerCfg, VOLUME_SENTINEL_L};
use crate::error::Result;
use crate::lid_override::{LidOverrideCommand, fetch_override};
use crate::motor::{ActuationReport, Direction, MotorActuator};
use crate::rain::RainFusion;
use crate::status::{CycleReport, Diagnostics, LidAction, LidState, TankState, Trigger};
use crate::telemetry::{SendOutcome, TelemetryClient, TelemetryEvent};
use crate::time::local_timestamp;
use crate::util::elapsed_secs;
use crate::volume::VolumeEstimator;

pub struct LidController {
    pub(crate) volume: VolumeEstimator<Box<dyn RangeSensor>>,
    pub(crate) rain: RainFusion<Box<dyn RainSensor>>,
    pub(crate) motor: MotorActuator<Box<dyn StepperDriver>>,
    pub(crate) telemetry: TelemetryClient,
    pub(crate) http: Box<dyn HttpClient>,
    pub(crate) link: Box<dyn Connectivity>,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) cfg: ControllerCfg,
    pub(crate) state: TankState,
    pub(crate) booted: bool,
}

impl core::fmt::Debug for LidController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LidController")
            .field("state", &self.state)
            .field("cfg", &self.cfg)
            .field("booted", &self.booted)
            .finish_non_exhaustive()
    }
}

/// Accumulates what happened during one cycle.
#[derive(Default)]
struct CycleLog {
    actions: Vec<LidAction>,
    delivered: u32,
    dropped: u32,
}

impl LidController {
    /// Start building a controller.
    pub fn builder() -> LidControllerBuilder<Missing, Missing, Missing> {
        LidControllerBuilder::default()
    }

    pub fn state(&self) -> &TankState {
        &self.state
    }

    pub fn lid_state(&self) -> LidState {
        self.state.lid_state()
    }

    pub fn cycle_period(&self) -> Duration {
        Duration::from_secs(self.cfg.cycle_secs)
    }

    /// Initial reading and driver release. Runs once, before the first cycle.
    pub fn boot(&mut self) {
        if self.booted {
            return;
        }
        self.booted = true;
        let volume = self.read_volume();
        tracing::info!(volume_l = volume, "boot volume reading");
        self.state.volume_liters = volume;
        if let Err(e) = self.motor.release() {
            tracing::error!(error = ?e, "could not release stepper at boot");
        }
    }

    /// Run the supervisory loop forever.
    pub fn run(&mut self) -> ! {
        tracing::info!(cycle_secs = self.cfg.cycle_secs, "lid controller running");
        loop {
            self.cycle();
            self.clock.sleep(self.cycle_period());
        }
    }

    /// Run exactly `n` cycles, sleeping the cycle period between them.
    pub fn run_cycles(&mut self, n: u32) -> Vec<CycleReport> {
        let mut reports = Vec::with_capacity(n as usize);
        for i in 0..n {
            if i > 0 {
                self.clock.sleep(self.cycle_period());
            }
            reports.push(self.cycle());
        }
        reports
    }

    /// One pass: read, fuse, decide, report, obey the override.
    pub fn cycle(&mut self) -> CycleReport {
        self.boot();
        let mut log = CycleLog::default();
        let timestamp = self.timestamp();

        self.state.volume_liters = self.read_volume();
        let rain_now = self.rain.is_raining(self.http.as_mut());
        let has_room = self.volume.model().has_room(self.state.volume_liters);
        tracing::info!(
            volume_l = self.state.volume_liters,
            rain_now,
            has_room,
            lid = ?self.state.lid_state(),
            "cycle"
        );

        if rain_now && has_room {
            if !self.state.is_raining {
                self.open_lid(&timestamp, Trigger::Rain, &mut log);
            }
        } else if self.state.is_raining {
            self.close_lid(&timestamp, Trigger::Rain, &mut log);
        }

        let now = self.clock.unix_secs();
        let since_report = elapsed_secs(self.state.last_telemetry_epoch, now);
        let periodic_report = since_report >= self.report_interval_secs();
        if periodic_report {
            tracing::info!(since_report, "periodic tank report");
            self.emit(
                &TelemetryEvent::PeriodicTankReport {
                    timestamp: timestamp.clone(),
                    water_level_liters: self.state.volume_liters,
                },
                &mut log,
            );
            self.state.last_telemetry_epoch = now;
        }

        let command = fetch_override(self.http.as_mut(), self.telemetry.base_url());
        match command {
            LidOverrideCommand::Open if !self.state.is_raining => {
                tracing::info!("remote override: open");
                self.open_lid(&timestamp, Trigger::Override, &mut log);
            }
            LidOverrideCommand::Close if self.state.is_raining => {
                tracing::info!("remote override: close");
                self.close_lid(&timestamp, Trigger::Override, &mut log);
            }
            _ => {}
        }

        CycleReport {
            timestamp,
            volume_liters: self.state.volume_liters,
            raining: rain_now,
            command,
            actions: log.actions,
            periodic_report,
            events_delivered: log.delivered,
            events_dropped: log.dropped,
            lid: self.state.lid_state(),
        }
    }

    /// Read every input once without touching the lid or the dashboard.
    pub fn diagnose(&mut self) -> Diagnostics {
        let timestamp = self.timestamp();
        let (volume_liters, volume_error) = match self.volume.read() {
            Ok(v) => (Some(v), None),
            Err(e) => {
                tracing::warn!(error = %e, "self-check volume read failed");
                (None, Some(e))
            }
        };
        let rain = self.rain.evaluate(self.http.as_mut());
        let command = fetch_override(self.http.as_mut(), self.telemetry.base_url());
        Diagnostics {
            timestamp,
            volume_liters,
            volume_error,
            rain,
            command,
        }
    }

    /// Drive the lid directly. State and telemetry are left alone.
    pub fn actuate(&mut self, direction: Direction) -> Result<ActuationReport> {
        self.motor.actuate(direction)
    }

    fn open_lid(&mut self, timestamp: &str, trigger: Trigger, log: &mut CycleLog) {
        if let Err(e) = self.motor.actuate(Direction::Open) {
            tracing::error!(error = ?e, ?trigger, "lid open actuation failed");
        }
        self.emit(
            &TelemetryEvent::LidOpened {
                timestamp: timestamp.to_string(),
            },
            log,
        );
        self.state.last_open_epoch = Some(self.clock.unix_secs());
        self.state.is_raining = true;
        self.state.lid_open = true;
        log.actions.push(LidAction::Opened(trigger));
    }

    fn close_lid(&mut self, timestamp: &str, trigger: Trigger, log: &mut CycleLog) {
        if let Err(e) = self.motor.actuate(Direction::Close) {
            tracing::error!(error = ?e, ?trigger, "lid close actuation failed");
        }
        let volume = self.read_volume();
        self.state.volume_liters = volume;

        if let Some(opened_at) = self.state.last_open_epoch {
            let open_secs = elapsed_secs(opened_at, self.clock.unix_secs());
            self.emit(
                &TelemetryEvent::TankReading {
                    timestamp: timestamp.to_string(),
                    open_duration_secs: open_secs,
                    water_level_liters: volume,
                },
                log,
            );
        }
        self.emit(
            &TelemetryEvent::LidClosed {
                timestamp: timestamp.to_string(),
            },
            log,
        );
        self.state.is_raining = false;
        self.state.lid_open = false;
        self.state.last_open_epoch = None;
        self.emit(
            &TelemetryEvent::CurrentLevel {
                timestamp: timestamp.to_string(),
                current_level_liters: volume,
            },
            log,
        );
        log.actions.push(LidAction::Closed(trigger));
    }

    fn emit(&mut self, event: &TelemetryEvent, log: &mut CycleLog) {
        match self
            .telemetry
            .send(self.http.as_mut(), self.link.as_mut(), event)
        {
            SendOutcome::Delivered { .. } => log.delivered += 1,
            SendOutcome::Dropped => log.dropped += 1,
        }
    }

    fn read_volume(&mut self) -> f32 {
        match self.volume.read() {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "volume read failed; using sentinel");
                VOLUME_SENTINEL_L
            }
        }
    }

    fn timestamp(&self) -> String {
        local_timestamp(self.clock.unix_secs(), self.cfg.utc_offset_hours)
    }

    fn report_interval_secs(&self) -> i64 {
        i64::try_from(self.cfg.report_interval_secs).unwrap_or(i64::MAX)
    }
}
