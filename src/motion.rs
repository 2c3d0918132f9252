/*
 * Drive-motor state machine.
 *
 *   Accelerating --(acceleration ticks)--> Accelerated
 *   Accelerated  --(stop)--> Stopping --(cutoff elapsed)--> Stopped
 *   Accelerating --(stop)--> Stopped
 *   Stopped      --(start)--> Accelerating
 *
 * The order of the states matters: everything below `Stopping` is drivable,
 * and ranging may only stop a car that is below `Stopped`.
 *
 * Only a car at full duty gets the reverse braking pulse. A car that is still
 * accelerating is running at cruise duty and is simply cut off.
 *
 * This module only tracks state. Arming the cutoff tick and driving the
 * outputs is left to the controller, which acts on the returned outcome.
 */

use crate::ticks::SaturatingCounter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VehicleDriveState {
    Accelerating,
    Accelerated,
    Stopping,
    Stopped,
}

impl VehicleDriveState {
    pub fn is_drivable(self) -> bool {
        self < VehicleDriveState::Stopping
    }
}

/// What a stop request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopOutcome {
    /// Entered `Stopping`; the cutoff tick must be armed.
    Braking,
    /// Went straight to `Stopped`.
    CutOff,
    /// Already stopping or stopped.
    Ignored,
}

pub struct VehicleMotion {
    state: VehicleDriveState,
    acceleration: SaturatingCounter,
    acceleration_ticks: u16,
}

impl VehicleMotion {
    pub fn new(acceleration_ticks: u16) -> Self {
        VehicleMotion {
            state: VehicleDriveState::Stopped,
            acceleration: SaturatingCounter::new(),
            acceleration_ticks,
        }
    }

    pub fn state(&self) -> VehicleDriveState {
        self.state
    }

    /// Returns whether the car actually started.
    pub fn start_acceleration(&mut self) -> bool {
        if self.state != VehicleDriveState::Stopped {
            return false;
        }
        self.acceleration.reset();
        self.transition(VehicleDriveState::Accelerating);
        true
    }

    pub fn request_stop(&mut self) -> StopOutcome {
        match self.state {
            VehicleDriveState::Accelerated => {
                self.transition(VehicleDriveState::Stopping);
                StopOutcome::Braking
            }
            VehicleDriveState::Accelerating => {
                self.transition(VehicleDriveState::Stopped);
                StopOutcome::CutOff
            }
            VehicleDriveState::Stopping | VehicleDriveState::Stopped => StopOutcome::Ignored,
        }
    }

    /// Count one control tick. Returns true on the tick that settles the car
    /// into `Accelerated`.
    pub fn on_control_tick(&mut self) -> bool {
        let elapsed = self.acceleration.increment();
        if self.state == VehicleDriveState::Accelerating && elapsed >= self.acceleration_ticks {
            self.transition(VehicleDriveState::Accelerated);
            return true;
        }
        false
    }

    /// The braking pulse is over.
    pub fn finish_braking(&mut self) {
        if self.state == VehicleDriveState::Stopping {
            self.transition(VehicleDriveState::Stopped);
        }
    }

    fn transition(&mut self, next: VehicleDriveState) {
        crate::log_info!("drive state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accelerated() -> VehicleMotion {
        let mut motion = VehicleMotion::new(50);
        motion.start_acceleration();
        for _ in 0..50 {
            motion.on_control_tick();
        }
        assert_eq!(motion.state(), VehicleDriveState::Accelerated);
        motion
    }

    #[test]
    fn starts_stopped() {
        assert_eq!(VehicleMotion::new(50).state(), VehicleDriveState::Stopped);
    }

    #[test]
    fn drivable_states_are_below_stopping() {
        assert!(VehicleDriveState::Accelerating.is_drivable());
        assert!(VehicleDriveState::Accelerated.is_drivable());
        assert!(!VehicleDriveState::Stopping.is_drivable());
        assert!(!VehicleDriveState::Stopped.is_drivable());
    }

    #[test]
    fn acceleration_takes_the_full_tick_count() {
        let mut motion = VehicleMotion::new(50);
        assert!(motion.start_acceleration());
        for _ in 0..49 {
            assert!(!motion.on_control_tick());
            assert_eq!(motion.state(), VehicleDriveState::Accelerating);
        }
        assert!(motion.on_control_tick());
        assert_eq!(motion.state(), VehicleDriveState::Accelerated);
    }

    #[test]
    fn start_is_ignored_unless_stopped() {
        let mut motion = accelerated();
        assert!(!motion.start_acceleration());
        assert_eq!(motion.state(), VehicleDriveState::Accelerated);

        motion.request_stop();
        assert!(!motion.start_acceleration());
        assert_eq!(motion.state(), VehicleDriveState::Stopping);
    }

    #[test]
    fn stopping_at_full_duty_brakes() {
        let mut motion = accelerated();
        assert_eq!(motion.request_stop(), StopOutcome::Braking);
        assert_eq!(motion.state(), VehicleDriveState::Stopping);

        assert_eq!(motion.request_stop(), StopOutcome::Ignored);
        motion.finish_braking();
        assert_eq!(motion.state(), VehicleDriveState::Stopped);
        assert_eq!(motion.request_stop(), StopOutcome::Ignored);
    }

    #[test]
    fn stopping_while_accelerating_cuts_off() {
        let mut motion = VehicleMotion::new(50);
        motion.start_acceleration();
        assert_eq!(motion.request_stop(), StopOutcome::CutOff);
        assert_eq!(motion.state(), VehicleDriveState::Stopped);
    }

    #[test]
    fn restart_rewinds_acceleration() {
        let mut motion = VehicleMotion::new(50);
        motion.start_acceleration();
        for _ in 0..40 {
            motion.on_control_tick();
        }
        motion.request_stop();
        motion.start_acceleration();
        for _ in 0..49 {
            motion.on_control_tick();
        }
        assert_eq!(motion.state(), VehicleDriveState::Accelerating);
    }
}
