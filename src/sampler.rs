/*
 * Command sampling and dispatch, run on every control tick while the car is
 * autonomous.
 *
 * Driving codes act immediately. Stop and red-light codes are debounced: the
 * vision board flickers between codes while a sign enters the frame, so a
 * traffic-control code only counts once it has been observed continuously
 * for the debounce window.
 *
 * The sampler only runs while the car is autonomous. When a compliance
 * sequence hands control back, `reset` forgets the code sampled before it, so
 * a sign that is in view at that point gets a fresh debounce window.
 */

use crate::command::{Command, TrafficSignal};
use crate::motion::VehicleDriveState;
use crate::outputs::{Outputs, Steering, drive_duty};
use crate::ticks::{TickSource, TickSources};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Dispatch {
    /// Drive with these outputs.
    Drive(Outputs),
    /// Ask the drive motor to stop.
    Stop,
    /// A traffic-control code was confirmed.
    Engage(TrafficSignal),
    /// Not drivable: show the stopped outputs.
    ShowStopped,
    /// Not drivable: keep the braking outputs up.
    ShowStopping,
    /// Keep whatever is on the outputs.
    Hold,
}

pub struct Sampler {
    previous: Command,
    debounce_ms: u16,
}

impl Sampler {
    pub fn new(debounce_ms: u16) -> Self {
        Sampler {
            // The vision board idles on the lane-end code.
            previous: Command::LaneEnd,
            debounce_ms,
        }
    }

    /// Forget the last sampled code, as if the vision board had just come up.
    pub fn reset(&mut self) {
        self.previous = Command::LaneEnd;
    }

    pub fn previous(&self) -> Command {
        self.previous
    }

    pub fn sample(
        &mut self,
        current: Command,
        state: VehicleDriveState,
        ticks: &mut TickSources,
    ) -> Dispatch {
        let changed = current != self.previous;
        if changed && !current.is_traffic_control() {
            ticks.disable(TickSource::Debounce);
        }

        let dispatch = match state {
            VehicleDriveState::Stopped => Dispatch::ShowStopped,
            VehicleDriveState::Stopping => Dispatch::ShowStopping,
            VehicleDriveState::Accelerating | VehicleDriveState::Accelerated => {
                self.dispatch(current, changed, state, ticks)
            }
        };

        self.previous = current;
        dispatch
    }

    fn dispatch(
        &mut self,
        current: Command,
        changed: bool,
        state: VehicleDriveState,
        ticks: &mut TickSources,
    ) -> Dispatch {
        let duty = drive_duty(state);
        match current {
            Command::Forward => Dispatch::Drive(Outputs::driving(duty, Steering::CENTER)),
            Command::Right(tier) => {
                Dispatch::Drive(Outputs::driving(duty, Steering::right(tier.percent())))
            }
            Command::Left(tier) => {
                Dispatch::Drive(Outputs::driving(duty, Steering::left(tier.percent())))
            }
            Command::Stop => self.debounce(TrafficSignal::Stop, changed, ticks),
            Command::RedLight => self.debounce(TrafficSignal::RedLight, changed, ticks),
            Command::LaneEnd | Command::Unrecognized(_) => {
                crate::log_debug!("stopping on {:?}", current);
                Dispatch::Stop
            }
        }
    }

    fn debounce(
        &self,
        signal: TrafficSignal,
        changed: bool,
        ticks: &mut TickSources,
    ) -> Dispatch {
        if changed || !ticks.is_enabled(TickSource::Debounce) {
            ticks.enable(TickSource::Debounce);
            return Dispatch::Hold;
        }

        if ticks.count(TickSource::Debounce) >= self.debounce_ms {
            ticks.disable(TickSource::Debounce);
            return Dispatch::Engage(signal);
        }
        Dispatch::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::SteerTier;
    use crate::config::DEBOUNCE_MS;

    fn debounce_ms(ticks: &mut TickSources, ms: u16) {
        for _ in 0..ms {
            ticks.tick(TickSource::Debounce);
        }
    }

    #[test]
    fn steering_follows_the_tier() {
        let mut sampler = Sampler::new(DEBOUNCE_MS);
        let mut ticks = TickSources::new();
        let dispatch = sampler.sample(
            Command::Right(SteerTier::Mid),
            VehicleDriveState::Accelerated,
            &mut ticks,
        );
        assert_eq!(
            dispatch,
            Dispatch::Drive(Outputs::driving(100, Steering::right(60)))
        );

        let dispatch = sampler.sample(
            Command::Left(SteerTier::High),
            VehicleDriveState::Accelerating,
            &mut ticks,
        );
        assert_eq!(
            dispatch,
            Dispatch::Drive(Outputs::driving(40, Steering::left(90)))
        );
    }

    #[test]
    fn unknown_codes_stop_in_any_drivable_state() {
        for code in [7, 10, 11, 12, 13, 14, 15] {
            for state in [VehicleDriveState::Accelerating, VehicleDriveState::Accelerated] {
                let mut sampler = Sampler::new(DEBOUNCE_MS);
                let mut ticks = TickSources::new();
                let dispatch = sampler.sample(Command::from_port(code), state, &mut ticks);
                assert_eq!(dispatch, Dispatch::Stop);
            }
        }
    }

    #[test]
    fn nothing_dispatches_while_not_drivable() {
        let mut sampler = Sampler::new(DEBOUNCE_MS);
        let mut ticks = TickSources::new();
        assert_eq!(
            sampler.sample(Command::Forward, VehicleDriveState::Stopped, &mut ticks),
            Dispatch::ShowStopped
        );
        assert_eq!(
            sampler.sample(Command::Stop, VehicleDriveState::Stopping, &mut ticks),
            Dispatch::ShowStopping
        );
        assert_eq!(sampler.previous(), Command::Stop);
        assert!(!ticks.is_enabled(TickSource::Debounce));
    }

    #[test]
    fn traffic_code_must_hold_for_the_debounce_window() {
        let mut sampler = Sampler::new(DEBOUNCE_MS);
        let mut ticks = TickSources::new();
        let state = VehicleDriveState::Accelerated;

        assert_eq!(sampler.sample(Command::Stop, state, &mut ticks), Dispatch::Hold);
        assert!(ticks.is_enabled(TickSource::Debounce));

        debounce_ms(&mut ticks, DEBOUNCE_MS - 1);
        assert_eq!(sampler.sample(Command::Stop, state, &mut ticks), Dispatch::Hold);

        debounce_ms(&mut ticks, 1);
        assert_eq!(
            sampler.sample(Command::Stop, state, &mut ticks),
            Dispatch::Engage(TrafficSignal::Stop)
        );
        assert!(!ticks.is_enabled(TickSource::Debounce));
    }

    #[test]
    fn a_change_restarts_the_debounce_window() {
        let mut sampler = Sampler::new(DEBOUNCE_MS);
        let mut ticks = TickSources::new();
        let state = VehicleDriveState::Accelerated;

        sampler.sample(Command::RedLight, state, &mut ticks);
        debounce_ms(&mut ticks, 140);
        sampler.sample(Command::Forward, state, &mut ticks);
        sampler.sample(Command::RedLight, state, &mut ticks);
        debounce_ms(&mut ticks, 140);
        assert_eq!(sampler.sample(Command::RedLight, state, &mut ticks), Dispatch::Hold);

        debounce_ms(&mut ticks, 10);
        assert_eq!(
            sampler.sample(Command::RedLight, state, &mut ticks),
            Dispatch::Engage(TrafficSignal::RedLight)
        );
    }

    #[test]
    fn reset_starts_a_fresh_debounce_window() {
        let mut sampler = Sampler::new(DEBOUNCE_MS);
        let mut ticks = TickSources::new();
        let state = VehicleDriveState::Accelerated;

        sampler.sample(Command::Stop, state, &mut ticks);
        debounce_ms(&mut ticks, DEBOUNCE_MS);
        assert_eq!(
            sampler.sample(Command::Stop, state, &mut ticks),
            Dispatch::Engage(TrafficSignal::Stop)
        );

        sampler.reset();
        assert_eq!(sampler.previous(), Command::LaneEnd);
        assert_eq!(sampler.sample(Command::Stop, state, &mut ticks), Dispatch::Hold);
        assert!(ticks.is_enabled(TickSource::Debounce));
        debounce_ms(&mut ticks, DEBOUNCE_MS - 1);
        assert_eq!(sampler.sample(Command::Stop, state, &mut ticks), Dispatch::Hold);
        debounce_ms(&mut ticks, 1);
        assert_eq!(
            sampler.sample(Command::Stop, state, &mut ticks),
            Dispatch::Engage(TrafficSignal::Stop)
        );
    }

    #[test]
    fn a_code_first_seen_while_stopped_is_debounced_once_drivable() {
        let mut sampler = Sampler::new(DEBOUNCE_MS);
        let mut ticks = TickSources::new();

        sampler.sample(Command::Stop, VehicleDriveState::Stopped, &mut ticks);
        let state = VehicleDriveState::Accelerating;
        assert_eq!(sampler.sample(Command::Stop, state, &mut ticks), Dispatch::Hold);
        debounce_ms(&mut ticks, DEBOUNCE_MS);
        assert_eq!(
            sampler.sample(Command::Stop, state, &mut ticks),
            Dispatch::Engage(TrafficSignal::Stop)
        );
    }
}
