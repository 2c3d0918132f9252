/*
 * Stop-sign and red-light behaviour.
 *
 * Once a traffic-control code has been confirmed the controller hands the car
 * over to this module. It steps through a short script, one phase check at a
 * time. A phase check is due once the elapsed counter reaches the required
 * duration of the current phase. A required duration of zero means "check on
 * every control tick", which is how the phases that wait for the signal to
 * disappear poll the input.
 *
 * Stop sign:  pause, creep forward once, wait for the sign to leave view.
 * Red light:  wait for the light to go, confirm it stayed gone, otherwise go
 *             back to waiting.
 * Both end in a suppression hold in which the signal is ignored, so the same
 * sign still in view does not restart the script.
 */

use crate::command::{Command, TrafficSignal};
use crate::config::{CONTROL_TICK_MS, ControlConfig};
use crate::ticks::SaturatingCounter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ComplianceState {
    Idle,
    HandlingStop,
    HandlingRedLight,
    SuppressingSignal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ComplianceAction {
    /// Nothing to actuate.
    None,
    /// Roll forward at cruise duty.
    Creep,
    /// The hold is over; hand control back.
    Release,
}

/// The highest phase any sequence reaches.
pub const LAST_PHASE: u8 = 1;

struct Step {
    state: ComplianceState,
    phase: u8,
    required_ms: u16,
    action: ComplianceAction,
}

pub struct Compliance {
    state: ComplianceState,
    phase: u8,
    required_ms: u16,
    elapsed_ms: SaturatingCounter,
    stop_pause_ms: u16,
    red_light_confirm_ms: u16,
    suppression_ms: u16,
}

impl Compliance {
    pub fn new(config: &ControlConfig) -> Self {
        Compliance {
            state: ComplianceState::Idle,
            phase: 0,
            required_ms: 0,
            elapsed_ms: SaturatingCounter::new(),
            stop_pause_ms: config.stop_pause_ms,
            red_light_confirm_ms: config.red_light_confirm_ms,
            suppression_ms: config.suppression_ms,
        }
    }

    pub fn state(&self) -> ComplianceState {
        self.state
    }

    pub fn phase(&self) -> u8 {
        self.phase
    }

    pub fn required_ms(&self) -> u16 {
        self.required_ms
    }

    pub fn is_idle(&self) -> bool {
        self.state == ComplianceState::Idle
    }

    pub fn engage(&mut self, signal: TrafficSignal) {
        let (state, required_ms) = match signal {
            TrafficSignal::Stop => (ComplianceState::HandlingStop, self.stop_pause_ms),
            TrafficSignal::RedLight => (ComplianceState::HandlingRedLight, 0),
        };
        crate::log_info!("compliance engaged for {:?}", signal);
        self.state = state;
        self.phase = 0;
        self.required_ms = required_ms;
        self.restart_elapsed();
    }

    /// Advance the elapsed counter by one control tick. Returns whether a
    /// phase check is due.
    pub fn on_control_tick(&mut self) -> bool {
        let elapsed_ms = self.elapsed_ms.advance(CONTROL_TICK_MS);
        self.state != ComplianceState::Idle && elapsed_ms >= self.required_ms
    }

    /// Run one phase check against what the input port shows right now.
    pub fn check(&mut self, current: Command) -> ComplianceAction {
        let step = self.next_step(current);
        if step.state != self.state || step.phase != self.phase {
            crate::log_info!(
                "compliance {:?}/{} -> {:?}/{}",
                self.state,
                self.phase,
                step.state,
                step.phase
            );
        }
        self.state = step.state;
        self.phase = step.phase;
        self.required_ms = step.required_ms;
        self.restart_elapsed();
        step.action
    }

    /*
     * Determine the next step, without changing the step that we are in.
     */
    fn next_step(&self, current: Command) -> Step {
        let stop_in_view = current == Command::Stop;
        let red_in_view = current == Command::RedLight;

        match (self.state, self.phase) {
            (ComplianceState::HandlingStop, 0) => Step {
                state: ComplianceState::HandlingStop,
                phase: 1,
                required_ms: 0,
                action: ComplianceAction::Creep,
            },
            (ComplianceState::HandlingStop, _) if stop_in_view => self.stay(),
            (ComplianceState::HandlingStop, _) => self.suppress(),

            (ComplianceState::HandlingRedLight, 0) if red_in_view => self.stay(),
            (ComplianceState::HandlingRedLight, 0) => Step {
                state: ComplianceState::HandlingRedLight,
                phase: 1,
                required_ms: self.red_light_confirm_ms,
                action: ComplianceAction::None,
            },
            (ComplianceState::HandlingRedLight, _) if red_in_view => Step {
                state: ComplianceState::HandlingRedLight,
                phase: 0,
                required_ms: 0,
                action: ComplianceAction::None,
            },
            (ComplianceState::HandlingRedLight, _) => self.suppress(),

            (ComplianceState::SuppressingSignal, _) => Step {
                state: ComplianceState::Idle,
                phase: 0,
                required_ms: 0,
                action: ComplianceAction::Release,
            },
            (ComplianceState::Idle, _) => self.stay(),
        }
    }

    fn stay(&self) -> Step {
        Step {
            state: self.state,
            phase: self.phase,
            required_ms: self.required_ms,
            action: ComplianceAction::None,
        }
    }

    fn suppress(&self) -> Step {
        Step {
            state: ComplianceState::SuppressingSignal,
            phase: 0,
            required_ms: self.suppression_ms,
            action: ComplianceAction::None,
        }
    }

    fn restart_elapsed(&mut self) {
        self.elapsed_ms.reset();
    }
}
