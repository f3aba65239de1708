#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core rain-lid logic (hardware-agnostic).
//!
//! This crate decides when a rain-collection tank lid opens and closes. All
//! hardware and network interactions go through the `raincatch_traits` seams.
//!
//! ## Architecture
//!
//! - **Volume**: averaged ultrasonic ranging to litres (`volume` module)
//! - **Rain**: local sensor OR remote weather report (`rain`, `weather`)
//! - **Motor**: open-loop stepper travel (`motor` module)
//! - **Telemetry**: event records with bounded immediate retry (`telemetry`)
//! - **Control**: the `LidController` state machine (`controller` module)
//!
//! ## Cycle order
//!
//! Each cycle reads volume, fuses rain, applies the rain decision, sends the
//! periodic report when due, then applies the dashboard override. The
//! override always runs last, so it wins when the two disagree.

pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod lid_override;
pub mod mocks;
pub mod motor;
pub mod rain;
pub mod remote;
pub mod status;
pub mod telemetry;
pub mod time;
pub mod util;
pub mod volume;
pub mod weather;

pub use builder::{Devices, LidControllerBuilder, Missing, Set, build_controller};
pub use config::{ControllerCfg, MotorCfg, RainCfg, SensingCfg, Settings, TelemetryCfg};
pub use controller::LidController;
pub use error::{BuildError, LidError, Report, Result};
pub use lid_override::LidOverrideCommand;
pub use motor::{ActuationReport, Direction, MotorActuator};
pub use rain::{RainFusion, RainSignal};
pub use status::{CycleReport, Diagnostics, LidAction, LidState, TankState, Trigger};
pub use telemetry::{Endpoint, SendOutcome, TelemetryClient, TelemetryEvent};
pub use volume::{VolumeEstimator, VolumeModel};
