/*
 * The I/O module for the car.
 *
 * This module owns the actual pins on the board. The intention is for this
 * module to be the only part of the program that is device-specific, so the
 * control core can be tested on the host.
 *
 * It exports the sensor side (command nibble and ultrasonic trigger), which the
 * control loop reads and pulses directly, and an actuator task that receives
 * `Outputs` over a channel and drives the PWM and direction pins. The echo task
 * only latches the edge; the control loop does the rest.
 */

use avrc::config::TRIGGER_PULSE_US;
use avrc::ranging::TriggerPulse;
use avrc::{DriveDirection, Outputs, PendingEvents, VehicleIo};
use embassy_futures::select::{Either, select};
use embassy_stm32::{
    exti::ExtiInput,
    gpio::{Input, Level, Output},
    peripherals::TIM3,
    timer::simple_pwm::SimplePwm,
};
use embassy_sync::{
    blocking_mutex::raw::{CriticalSectionRawMutex, ThreadModeRawMutex},
    channel::Receiver,
    signal::Signal,
};
use embassy_time::{Duration, Instant, Ticker, block_for};

pub const CHANNEL_CAPACITY: usize = 4;

const HEARTBEAT: Duration = Duration::from_millis(500);

/// Microsecond timestamp, truncated to the 32 bits the range counter uses.
pub fn now_us() -> u32 {
    Instant::now().as_micros() as u32
}

pub struct Sensors {
    pub command: [Input<'static>; 4],
    pub trigger: Output<'static>,
}

impl TriggerPulse for Sensors {
    fn pulse_trigger(&mut self) -> u32 {
        self.trigger.set_high();
        block_for(Duration::from_micros(TRIGGER_PULSE_US));
        self.trigger.set_low();
        now_us()
    }
}

impl VehicleIo for Sensors {
    fn read_command(&mut self) -> u8 {
        self.command
            .iter()
            .enumerate()
            .fold(0, |nibble, (bit, pin)| nibble | (u8::from(pin.is_high()) << bit))
    }
}

pub struct Actuators {
    pub pwm: SimplePwm<'static, TIM3>,
    pub drive_forward: Output<'static>,
    pub drive_reverse: Output<'static>,
    pub steer_right: Output<'static>,
    pub steer_left: Output<'static>,
    pub rear_indicator: Output<'static>,
    pub onboard_led: Output<'static>,
}

impl Actuators {
    fn apply(&mut self, outputs: &Outputs) {
        // Direction pins go low first so the bridge never sees both legs on.
        self.drive_forward.set_low();
        self.drive_reverse.set_low();
        self.steer_right.set_low();
        self.steer_left.set_low();

        let mut drive = self.pwm.ch1();
        match outputs.drive.direction {
            DriveDirection::Off => drive.set_duty_cycle_fully_off(),
            DriveDirection::Forward | DriveDirection::Reverse => {
                drive.set_duty_cycle_percent(outputs.drive.duty)
            }
        }

        let steering = outputs.steering.percent();
        self.pwm.ch2().set_duty_cycle_percent(steering.unsigned_abs());

        match outputs.drive.direction {
            DriveDirection::Off => {}
            DriveDirection::Forward => self.drive_forward.set_high(),
            DriveDirection::Reverse => self.drive_reverse.set_high(),
        }
        if steering > 0 {
            self.steer_right.set_high();
        } else if steering < 0 {
            self.steer_left.set_high();
        }

        light(&mut self.rear_indicator, outputs.rear_indicator);
    }
}

fn light(led: &mut Output, on: bool) {
    led.set_level(if on { Level::High } else { Level::Low });
}

#[embassy_executor::task]
pub async fn actuator_task(
    outputs: Receiver<'static, ThreadModeRawMutex, Outputs, CHANNEL_CAPACITY>,
    mut actuators: Actuators,
) -> ! {
    actuators.pwm.ch1().enable();
    actuators.pwm.ch2().enable();
    actuators.apply(&Outputs::stopped());

    let mut heartbeat = Ticker::every(HEARTBEAT);
    let mut heartbeat_on = false;

    loop {
        match select(outputs.receive(), heartbeat.next()).await {
            Either::First(next) => actuators.apply(&next),
            Either::Second(_) => {
                heartbeat_on = !heartbeat_on;
                // the on-board LED is active-low
                light(&mut actuators.onboard_led, !heartbeat_on);
            }
        }
    }
}

#[embassy_executor::task]
pub async fn echo_task(
    mut echo: ExtiInput<'static>,
    events: &'static PendingEvents,
    wake: &'static Signal<CriticalSectionRawMutex, ()>,
) -> ! {
    loop {
        echo.wait_for_falling_edge().await;
        events.raise_echo(now_us());
        wake.signal(());
    }
}
