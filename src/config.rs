/*
 * Timing and threshold constants.
 *
 * These numbers are part of the contract with the vision board and the
 * ultrasonic sensor, so they are protocol constants rather than tunables.
 * `ControlConfig` only exists so that tests and other boards can build a
 * controller with a different set, and so that a nonsensical set is refused
 * at boot instead of driving the car.
 */

use crate::error::ConfigError;

/// Period of the control tick.
pub const CONTROL_TICK_MS: u16 = 10;
/// Period of the braking cutoff tick and of the debounce tick.
pub const MS_TICK_MS: u16 = 1;
/// One raw tick of the elapsed-range counter.
pub const RANGE_TICK_US: u32 = 64;
/// Width of the ultrasonic trigger pulse.
pub const TRIGGER_PULSE_US: u64 = 10;

/// A stop or red-light code must be seen this long before the car reacts.
pub const DEBOUNCE_MS: u16 = 150;
/// Control ticks spent in `Accelerating` before settling to `Accelerated`.
pub const ACCELERATION_TICKS: u16 = 50;
/// Length of the reverse braking pulse before the motor is cut.
pub const BRAKE_CUTOFF_MS: u16 = 200;
/// Ranging trigger cadence, in control ticks.
pub const TRIGGER_EVERY_TICKS: u16 = 6;
/// Control ticks an armed measurement may wait for its echo.
pub const ECHO_TIMEOUT_TICKS: u16 = 5;

/// Echo longer than this (raw ticks) means the road ahead is clear.
pub const NEAR_THRESHOLD_TICKS: u16 = 45;
/// Echo shorter than this (raw ticks) means an obstacle.
pub const FAR_THRESHOLD_TICKS: u16 = 40;

/// Standstill at a stop sign before creeping forward, in milliseconds like
/// every other compliance duration: half a second, not 500 control ticks.
/// Any pause is allowed; this one outlasts the braking pulse so the car is
/// fully stopped before the creep.
pub const STOP_PAUSE_MS: u16 = 500;
/// A cleared red light has to stay cleared this long.
pub const RED_LIGHT_CONFIRM_MS: u16 = 50;
/// Hold after a compliance sequence during which the signal is ignored.
pub const SUPPRESSION_MS: u16 = 700;

/// Drive duty while cruising (everything but `Accelerated`), percent.
pub const CRUISE_DUTY: u8 = 40;
/// Drive duty once `Accelerated`, percent.
pub const FULL_DUTY: u8 = 100;
/// Reverse duty of the braking pulse, percent.
pub const BRAKE_DUTY: u8 = 100;
/// Steering deflection per turn tier, percent of full deflection.
pub const STEER_TIERS: [u8; 3] = [30, 60, 90];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlConfig {
    pub debounce_ms: u16,
    pub acceleration_ticks: u16,
    pub brake_cutoff_ms: u16,
    pub trigger_every_ticks: u16,
    /// `None` keeps an armed measurement waiting forever for its echo.
    pub echo_timeout_ticks: Option<u16>,
    pub near_threshold_ticks: u16,
    pub far_threshold_ticks: u16,
    pub stop_pause_ms: u16,
    pub red_light_confirm_ms: u16,
    pub suppression_ms: u16,
}

impl ControlConfig {
    pub const DEFAULT: ControlConfig = ControlConfig {
        debounce_ms: DEBOUNCE_MS,
        acceleration_ticks: ACCELERATION_TICKS,
        brake_cutoff_ms: BRAKE_CUTOFF_MS,
        trigger_every_ticks: TRIGGER_EVERY_TICKS,
        echo_timeout_ticks: Some(ECHO_TIMEOUT_TICKS),
        near_threshold_ticks: NEAR_THRESHOLD_TICKS,
        far_threshold_ticks: FAR_THRESHOLD_TICKS,
        stop_pause_ms: STOP_PAUSE_MS,
        red_light_confirm_ms: RED_LIGHT_CONFIRM_MS,
        suppression_ms: SUPPRESSION_MS,
    };

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.far_threshold_ticks >= self.near_threshold_ticks {
            return Err(ConfigError::NoHysteresisBand {
                far: self.far_threshold_ticks,
                near: self.near_threshold_ticks,
            });
        }
        if self.trigger_every_ticks == 0 {
            return Err(ConfigError::ZeroTriggerCadence);
        }
        if self.brake_cutoff_ms == 0 {
            return Err(ConfigError::ZeroBrakeCutoff);
        }
        if self.suppression_ms == 0 {
            return Err(ConfigError::ZeroSuppression);
        }
        match self.echo_timeout_ticks {
            Some(timeout) if timeout == 0 || timeout >= self.trigger_every_ticks => {
                Err(ConfigError::EchoTimeoutOutOfRange {
                    timeout,
                    cadence: self.trigger_every_ticks,
                })
            }
            _ => Ok(()),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
