/*
 * What the controller wants the motors and lights to do.
 *
 * The controller never writes pins. It keeps one `Outputs` value current and
 * the firmware's actuator task maps it onto PWM channels and direction pins,
 * much like a traffic light's red/amber/green booleans are mapped onto LEDs.
 */

use crate::config::{BRAKE_DUTY, CRUISE_DUTY, FULL_DUTY};
use crate::motion::VehicleDriveState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriveDirection {
    Off,
    Forward,
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Drive {
    pub direction: DriveDirection,
    /// Percent, 0..=100.
    pub duty: u8,
}

impl Drive {
    pub const OFF: Drive = Drive {
        direction: DriveDirection::Off,
        duty: 0,
    };

    pub fn forward(duty: u8) -> Self {
        Drive {
            direction: DriveDirection::Forward,
            duty: duty.min(100),
        }
    }

    pub fn reverse(duty: u8) -> Self {
        Drive {
            direction: DriveDirection::Reverse,
            duty: duty.min(100),
        }
    }
}

/// Steering deflection in percent of full travel. Positive is right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Steering(i8);

impl Steering {
    pub const CENTER: Steering = Steering(0);
    pub const LIMIT: u8 = 90;

    pub fn right(percent: u8) -> Self {
        Steering(percent.min(Self::LIMIT) as i8)
    }

    pub fn left(percent: u8) -> Self {
        Steering(-(percent.min(Self::LIMIT) as i8))
    }

    pub fn percent(self) -> i8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Outputs {
    pub drive: Drive,
    pub steering: Steering,
    pub rear_indicator: bool,
}

impl Outputs {
    /// Motor cut, rear light on.
    pub fn stopped() -> Self {
        Outputs {
            drive: Drive::OFF,
            steering: Steering::CENTER,
            rear_indicator: true,
        }
    }

    /// Reverse braking pulse, rear light on.
    pub fn braking() -> Self {
        Outputs {
            drive: Drive::reverse(BRAKE_DUTY),
            steering: Steering::CENTER,
            rear_indicator: true,
        }
    }

    pub fn driving(duty: u8, steering: Steering) -> Self {
        Outputs {
            drive: Drive::forward(duty),
            steering,
            rear_indicator: false,
        }
    }
}

impl Default for Outputs {
    fn default() -> Self {
        Self::stopped()
    }
}

/// Full duty once the car has settled, cruise duty otherwise.
pub fn drive_duty(state: VehicleDriveState) -> u8 {
    match state {
        VehicleDriveState::Accelerated => FULL_DUTY,
        _ => CRUISE_DUTY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steering_is_signed_and_clamped() {
        assert_eq!(Steering::right(60).percent(), 60);
        assert_eq!(Steering::left(30).percent(), -30);
        assert_eq!(Steering::right(120).percent(), 90);
        assert_eq!(Steering::left(120).percent(), -90);
    }

    #[test]
    fn rear_indicator_follows_the_stop_states() {
        assert!(Outputs::stopped().rear_indicator);
        assert!(Outputs::braking().rear_indicator);
        assert!(!Outputs::driving(40, Steering::CENTER).rear_indicator);
    }

    #[test]
    fn braking_reverses_the_drive() {
        assert_eq!(Outputs::braking().drive, Drive::reverse(100));
    }

    #[test]
    fn only_a_settled_car_gets_full_duty() {
        assert_eq!(drive_duty(VehicleDriveState::Accelerated), 100);
        assert_eq!(drive_duty(VehicleDriveState::Accelerating), 40);
    }
}
