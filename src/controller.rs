/*
 * The controller owns every piece of control state and exposes one method per
 * event source: the three ticks and the echo edge. The firmware's control loop
 * takes an `EventBatch` from the interrupt side and feeds it in through
 * `service`, so all state is written from a single place.
 *
 * Two authorities share the car. While autonomous, ranging decides stop/go and
 * the command port steers. Once a stop sign or red light is confirmed, the
 * compliance script owns the car until its suppression hold has run out.
 */

use crate::command::{Command, TrafficSignal};
use crate::compliance::{Compliance, ComplianceAction, ComplianceState};
use crate::config::ControlConfig;
use crate::error::ConfigError;
use crate::events::EventBatch;
use crate::motion::{StopOutcome, VehicleDriveState, VehicleMotion};
use crate::outputs::{Outputs, Steering, drive_duty};
use crate::ranging::{self, MotionRequest, Ranger, TriggerPulse};
use crate::sampler::{Dispatch, Sampler};
use crate::ticks::{SaturatingCounter, TickSource, TickSources};

/// The pins the controller reads or pulses directly.
pub trait VehicleIo: TriggerPulse {
    /// Raw value of the command port. Only the low nibble is used.
    fn read_command(&mut self) -> u8;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlAuthority {
    Autonomous,
    SignalDriven,
}

pub struct Controller {
    config: ControlConfig,
    ticks: TickSources,
    motion: VehicleMotion,
    ranger: Ranger,
    trigger_cadence: SaturatingCounter,
    sampler: Sampler,
    compliance: Compliance,
    authority: ControlAuthority,
    outputs: Outputs,
}

impl Controller {
    pub fn new(config: ControlConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Controller {
            ticks: TickSources::new(),
            motion: VehicleMotion::new(config.acceleration_ticks),
            ranger: Ranger::new(config.echo_timeout_ticks),
            trigger_cadence: SaturatingCounter::new(),
            sampler: Sampler::new(config.debounce_ms),
            compliance: Compliance::new(&config),
            authority: ControlAuthority::Autonomous,
            outputs: Outputs::stopped(),
            config,
        })
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn drive_state(&self) -> VehicleDriveState {
        self.motion.state()
    }

    pub fn authority(&self) -> ControlAuthority {
        self.authority
    }

    pub fn compliance_state(&self) -> ComplianceState {
        self.compliance.state()
    }

    pub fn compliance_phase(&self) -> u8 {
        self.compliance.phase()
    }

    pub fn outputs(&self) -> Outputs {
        self.outputs
    }

    pub fn ranging_in_flight(&self) -> bool {
        self.ranger.in_flight()
    }

    pub fn tick_enabled(&self, source: TickSource) -> bool {
        self.ticks.is_enabled(source)
    }

    /// Apply everything the interrupt side latched since the last iteration.
    pub fn service<IO: VehicleIo>(&mut self, batch: EventBatch, io: &mut IO) {
        for _ in 0..batch.ticks(TickSource::Debounce) {
            self.on_debounce_tick();
        }
        for _ in 0..batch.ticks(TickSource::Cutoff) {
            self.on_cutoff_tick();
        }
        if let Some(now_us) = batch.echo_at_us {
            self.on_echo(now_us);
        }
        for _ in 0..batch.ticks(TickSource::Control) {
            self.on_control_tick(io);
        }
    }

    /// 1 ms braking tick. Cuts the motor once the braking pulse has run its
    /// course.
    pub fn on_cutoff_tick(&mut self) {
        let Some(elapsed) = self.ticks.tick(TickSource::Cutoff) else {
            return;
        };
        if elapsed >= self.config.brake_cutoff_ms {
            self.ticks.disable(TickSource::Cutoff);
            self.motion.finish_braking();
            self.outputs = Outputs::stopped();
        }
    }

    /// 1 ms debounce tick.
    pub fn on_debounce_tick(&mut self) {
        self.ticks.tick(TickSource::Debounce);
    }

    /// Falling edge on the echo line.
    pub fn on_echo(&mut self, now_us: u32) {
        let Some(elapsed) = self.ranger.on_echo(now_us) else {
            return;
        };
        if self.authority != ControlAuthority::Autonomous {
            return;
        }
        match ranging::classify(elapsed, self.motion.state(), &self.config) {
            Some(MotionRequest::StartAcceleration) => {
                crate::log_debug!("range {} clear, starting", elapsed);
                self.motion.start_acceleration();
            }
            Some(MotionRequest::Stop) => {
                crate::log_debug!("range {} obstacle, stopping", elapsed);
                self.request_stop();
            }
            None => {}
        }
    }

    /// 10 ms control tick.
    pub fn on_control_tick<IO: VehicleIo>(&mut self, io: &mut IO) {
        self.ticks.tick(TickSource::Control);
        let check_due = self.compliance.on_control_tick();

        if self.authority == ControlAuthority::Autonomous {
            self.ranger.on_control_tick();
            if self.trigger_cadence.increment() >= self.config.trigger_every_ticks {
                self.trigger_cadence.reset();
                self.ranger.request_trigger(io);
            }

            self.motion.on_control_tick();

            let command = Command::from_port(io.read_command());
            let dispatch = self.sampler.sample(
                command,
                self.motion.state(),
                &mut self.ticks,
            );
            self.apply(dispatch);
        }

        if check_due {
            let command = Command::from_port(io.read_command());
            match self.compliance.check(command) {
                ComplianceAction::Creep => {
                    let duty = drive_duty(self.motion.state());
                    self.outputs = Outputs::driving(duty, Steering::CENTER);
                }
                ComplianceAction::Release => {
                    crate::log_info!("compliance done, back to autonomous");
                    self.authority = ControlAuthority::Autonomous;
                    self.sampler.reset();
                }
                ComplianceAction::None => {}
            }
        }
    }

    fn apply(&mut self, dispatch: Dispatch) {
        match dispatch {
            Dispatch::Drive(outputs) => self.outputs = outputs,
            Dispatch::Stop => self.request_stop(),
            Dispatch::Engage(signal) => self.engage(signal),
            Dispatch::ShowStopped => self.outputs = Outputs::stopped(),
            Dispatch::ShowStopping => self.outputs = Outputs::braking(),
            Dispatch::Hold => {}
        }
    }

    fn engage(&mut self, signal: TrafficSignal) {
        self.authority = ControlAuthority::SignalDriven;
        self.compliance.engage(signal);
        self.request_stop();
    }

    fn request_stop(&mut self) {
        match self.motion.request_stop() {
            StopOutcome::Braking => {
                self.ticks.enable(TickSource::Cutoff);
                self.outputs = Outputs::braking();
            }
            StopOutcome::CutOff => self.outputs = Outputs::stopped(),
            StopOutcome::Ignored => {}
        }
    }
}
