/*
 * Control core for the lane-following car.
 *
 * The upstream vision board drives a 4-bit command onto four input pins. This
 * crate turns that command, together with an ultrasonic range reading, into
 * drive and steering PWM plus a rear indicator. Time is fed in from outside as
 * ticks so that every state machine in here can be exercised on the host; the
 * firmware binary (`src/main.rs`, `firmware` feature) is the only code that
 * touches the actual device.
 */

#![cfg_attr(not(test), no_std)]

pub mod logging;

pub mod command;
pub mod compliance;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod motion;
pub mod outputs;
pub mod ranging;
pub mod sampler;
pub mod ticks;

pub use command::{Command, SteerTier, TrafficSignal};
pub use compliance::{ComplianceAction, ComplianceState};
pub use config::ControlConfig;
pub use controller::{ControlAuthority, Controller, VehicleIo};
pub use error::ConfigError;
pub use events::{EventBatch, PendingEvents};
pub use motion::VehicleDriveState;
pub use outputs::{Drive, DriveDirection, Outputs, Steering};
pub use ticks::TickSource;
