/*
 * Ultrasonic ranging.
 *
 * A measurement starts with a short trigger pulse. The elapsed-range counter
 * starts on the pulse's trailing edge and stops on the falling edge of the
 * echo. Only one measurement may be in flight: the sensor cannot tell two
 * echoes apart.
 *
 * The reading is only ever compared against two thresholds. Clear of the near
 * threshold lets a stopped car go, inside the far threshold stops a moving
 * one. Anything between the two changes nothing, so a car sitting right at
 * the boundary does not oscillate.
 *
 * If the echo never comes the measurement is dropped after a few control
 * ticks, so a sensor glitch costs one reading instead of all later ones.
 */

use crate::config::ControlConfig;
use crate::motion::VehicleDriveState;
use crate::ticks::{ElapsedRangeCounter, SaturatingCounter};

/// Something that can fire the trigger pulse.
pub trait TriggerPulse {
    /// Emit the pulse and return the microsecond timestamp of its trailing
    /// edge.
    fn pulse_trigger(&mut self) -> u32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionRequest {
    StartAcceleration,
    Stop,
}

pub struct Ranger {
    counter: ElapsedRangeCounter,
    /// Control ticks since the pulse, while in flight.
    age: SaturatingCounter,
    echo_timeout_ticks: Option<u16>,
}

impl Ranger {
    pub fn new(echo_timeout_ticks: Option<u16>) -> Self {
        Ranger {
            counter: ElapsedRangeCounter::new(),
            age: SaturatingCounter::new(),
            echo_timeout_ticks,
        }
    }

    pub fn in_flight(&self) -> bool {
        self.counter.is_running()
    }

    /// Fire a measurement unless one is already in flight. Returns whether a
    /// pulse went out.
    pub fn request_trigger<P: TriggerPulse>(&mut self, pin: &mut P) -> bool {
        if self.in_flight() {
            crate::log_trace!("trigger skipped, measurement in flight");
            return false;
        }
        let trailing_edge_us = pin.pulse_trigger();
        self.counter.start(trailing_edge_us);
        self.age.reset();
        true
    }

    /// The echo line fell. Returns elapsed raw ticks, or `None` for an edge
    /// nobody asked for.
    pub fn on_echo(&mut self, now_us: u32) -> Option<u16> {
        self.counter.stop(now_us)
    }

    /// Age the in-flight measurement, abandoning it once the echo timeout
    /// passes.
    pub fn on_control_tick(&mut self) {
        if !self.in_flight() {
            return;
        }
        let age = self.age.increment();
        if let Some(timeout) = self.echo_timeout_ticks {
            if age >= timeout {
                crate::log_warn!("no echo after {} control ticks, dropping measurement", age);
                self.counter.cancel();
            }
        }
    }
}

pub fn classify(
    elapsed: u16,
    state: VehicleDriveState,
    config: &ControlConfig,
) -> Option<MotionRequest> {
    if elapsed > config.near_threshold_ticks && state == VehicleDriveState::Stopped {
        Some(MotionRequest::StartAcceleration)
    } else if elapsed < config.far_threshold_ticks && state < VehicleDriveState::Stopped {
        Some(MotionRequest::Stop)
    } else {
        None
    }
}
