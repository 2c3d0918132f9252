#![no_std]
#![no_main]

// https://github.com/embassy-rs/embassy/blob/main/examples/stm32f4/src/bin/multiprio.rs

use avrc::{ControlConfig, Controller, PendingEvents, TickSource, config};
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_stm32::{
    exti::{Channel, ExtiInput},
    gpio::{Input, Level, Output, OutputType, Pin, Pull, Speed},
    interrupt,
    interrupt::{InterruptExt, Priority},
    time::khz,
    timer::simple_pwm::{PwmPin, SimplePwm},
};
use embassy_sync::{
    blocking_mutex::raw::{CriticalSectionRawMutex, ThreadModeRawMutex},
    channel::Channel as OutputChannel,
    signal::Signal,
};
use embassy_time::{Duration, Ticker};
use {defmt_rtt as _, panic_halt as _};

mod io;
use io::{Actuators, CHANNEL_CAPACITY, Sensors};

static EVENTS: PendingEvents = PendingEvents::new();
static WAKE: Signal<CriticalSectionRawMutex, ()> = Signal::new();
static OUTPUTS: OutputChannel<ThreadModeRawMutex, avrc::Outputs, CHANNEL_CAPACITY> =
    OutputChannel::new();

// Tick and echo tasks stand in for interrupt handlers, so they run on an
// executor that preempts the control loop.
static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn UART4() {
    unsafe { EXECUTOR_HIGH.on_interrupt() }
}

#[embassy_executor::task(pool_size = 3)]
async fn tick_task(source: TickSource, period: Duration) -> ! {
    let mut ticker = Ticker::every(period);
    loop {
        ticker.next().await;
        EVENTS.raise_tick(source);
        WAKE.signal(());
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let peripherals = embassy_stm32::init(Default::default());

    let mut controller = Controller::new(ControlConfig::DEFAULT).unwrap();
    avrc::log_info!("controller up: {:?}", controller.config());

    let mut sensors = Sensors {
        command: [
            Input::new(peripherals.PA0, Pull::Down),
            Input::new(peripherals.PA1, Pull::Down),
            Input::new(peripherals.PA2, Pull::Down),
            Input::new(peripherals.PA3, Pull::Down),
        ],
        trigger: Output::new(peripherals.PC6, Level::Low, Speed::High),
    };

    let pwm = SimplePwm::new(
        peripherals.TIM3,
        Some(PwmPin::new_ch1(peripherals.PA6, OutputType::PushPull)),
        Some(PwmPin::new_ch2(peripherals.PA7, OutputType::PushPull)),
        None,
        None,
        khz(10),
        Default::default(),
    );
    let actuators = Actuators {
        pwm,
        drive_forward: Output::new(peripherals.PC0, Level::Low, Speed::Low),
        drive_reverse: Output::new(peripherals.PC1, Level::Low, Speed::Low),
        steer_left: Output::new(peripherals.PC2, Level::Low, Speed::Low),
        steer_right: Output::new(peripherals.PC3, Level::Low, Speed::Low),
        rear_indicator: Output::new(peripherals.PC5, Level::Low, Speed::Low),
        onboard_led: Output::new(peripherals.PE12, Level::High, Speed::Low),
    };

    let echo = ExtiInput::new(
        peripherals.PE4.degrade(),
        peripherals.EXTI4.degrade(),
        Pull::None,
    );

    interrupt::UART4.set_priority(Priority::P6);
    let high = EXECUTOR_HIGH.start(interrupt::UART4);
    let ms = Duration::from_millis(u64::from(config::MS_TICK_MS));
    let control = Duration::from_millis(u64::from(config::CONTROL_TICK_MS));
    high.spawn(tick_task(TickSource::Cutoff, ms)).unwrap();
    high.spawn(tick_task(TickSource::Control, control)).unwrap();
    high.spawn(tick_task(TickSource::Debounce, ms)).unwrap();
    high.spawn(io::echo_task(echo, &EVENTS, &WAKE)).unwrap();

    spawner
        .spawn(io::actuator_task(OUTPUTS.receiver(), actuators))
        .unwrap();

    let mut applied = controller.outputs();
    loop {
        WAKE.wait().await;
        let batch = EVENTS.take();
        if batch.is_empty() {
            continue;
        }
        controller.service(batch, &mut sensors);

        let outputs = controller.outputs();
        if outputs != applied {
            OUTPUTS.send(outputs).await;
            applied = outputs;
        }
    }
}
