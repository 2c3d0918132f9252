//! Simulated car: a millisecond clock feeding the controller through the same
//! `PendingEvents` latch the firmware uses.

#![allow(dead_code)]

use avrc::config::RANGE_TICK_US;
use avrc::ranging::TriggerPulse;
use avrc::{
    ControlAuthority, ComplianceState, ControlConfig, Controller, Outputs, PendingEvents,
    TickSource, VehicleDriveState, VehicleIo,
};

pub struct FakeIo {
    pub port: u8,
    pub now_us: u32,
    pub pulses: Vec<u32>,
}

impl TriggerPulse for FakeIo {
    fn pulse_trigger(&mut self) -> u32 {
        self.pulses.push(self.now_us);
        self.now_us
    }
}

impl VehicleIo for FakeIo {
    fn read_command(&mut self) -> u8 {
        self.port
    }
}

pub struct Car {
    pub controller: Controller,
    pub events: PendingEvents,
    pub io: FakeIo,
    pub now_ms: u32,
    /// Echo length the sensor reports, in raw ticks. `None` drops every echo.
    pub range: Option<u16>,
    answered_pulses: usize,
}

impl Car {
    pub fn new() -> Self {
        Self::with_config(ControlConfig::DEFAULT)
    }

    pub fn with_config(config: ControlConfig) -> Self {
        Car {
            controller: Controller::new(config).expect("valid config"),
            events: PendingEvents::new(),
            io: FakeIo {
                port: 0,
                now_us: 0,
                pulses: Vec::new(),
            },
            now_ms: 0,
            range: Some(60),
            answered_pulses: 0,
        }
    }

    /// Advance the clock by one millisecond and run one loop iteration.
    pub fn step(&mut self) {
        self.now_ms += 1;
        self.io.now_us = self.now_ms * 1_000;

        self.events.raise_tick(TickSource::Cutoff);
        self.events.raise_tick(TickSource::Debounce);
        if self.now_ms % 10 == 0 {
            self.events.raise_tick(TickSource::Control);
        }

        let batch = self.events.take();
        self.controller.service(batch, &mut self.io);

        // The echo for a fresh pulse lands before the next iteration.
        while self.answered_pulses < self.io.pulses.len() {
            let trailing_edge_us = self.io.pulses[self.answered_pulses];
            self.answered_pulses += 1;
            if let Some(range) = self.range {
                self.events
                    .raise_echo(trailing_edge_us + u32::from(range) * RANGE_TICK_US);
            }
        }
    }

    pub fn run_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.step();
        }
    }

    /// Step until `done` holds, returning the milliseconds it took.
    pub fn run_until(&mut self, limit_ms: u32, mut done: impl FnMut(&Car) -> bool) -> u32 {
        for elapsed in 1..=limit_ms {
            self.step();
            if done(self) {
                return elapsed;
            }
        }
        panic!("condition not reached within {limit_ms} ms");
    }

    /// Step to just past the next control tick.
    pub fn run_to_control_tick(&mut self) {
        self.step();
        while self.now_ms % 10 != 0 {
            self.step();
        }
    }

    /// Drive off from boot and settle at full duty.
    pub fn accelerated() -> Self {
        let mut car = Car::new();
        car.run_until(2_000, |car| car.state() == VehicleDriveState::Accelerated);
        car
    }

    pub fn state(&self) -> VehicleDriveState {
        self.controller.drive_state()
    }

    pub fn authority(&self) -> ControlAuthority {
        self.controller.authority()
    }

    pub fn compliance(&self) -> ComplianceState {
        self.controller.compliance_state()
    }

    pub fn outputs(&self) -> Outputs {
        self.controller.outputs()
    }
}
