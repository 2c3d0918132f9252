/*
 * The car runs on three periodic ticks: a 1 ms braking-cutoff tick, the 10 ms
 * control tick, and a 1 ms debounce tick. On the board each one is its own
 * timer that gets started and stopped around the operation that needs it. Here
 * that becomes a descriptor per source: whether the source is running and how
 * far its counter has got. Ticks that arrive for a stopped source are dropped,
 * exactly as a stopped hardware timer would never fire.
 *
 * Counters saturate instead of wrapping. They are only ever compared against
 * thresholds, and a wrapped counter would match a threshold a second time.
 *
 * The elapsed-range counter is different: it is free-running between the
 * trailing edge of the trigger pulse and the echo edge, so it is modelled from
 * two timestamps instead of being ticked.
 */

use enum_ordinalize::Ordinalize;

use crate::config::RANGE_TICK_US;

#[derive(Ordinalize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(usize)]
pub enum TickSource {
    /// 1 ms, runs only while braking.
    Cutoff,
    /// 10 ms, always running.
    Control,
    /// 1 ms, runs while a traffic-control code is being confirmed.
    Debounce,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaturatingCounter(u16);

impl SaturatingCounter {
    pub const fn new() -> Self {
        SaturatingCounter(0)
    }

    #[inline]
    pub fn increment(&mut self) -> u16 {
        self.0 = self.0.saturating_add(1);
        self.0
    }

    #[inline]
    pub fn advance(&mut self, by: u16) -> u16 {
        self.0 = self.0.saturating_add(by);
        self.0
    }

    #[inline]
    pub fn reset(&mut self) {
        self.0 = 0;
    }

    #[inline]
    pub fn get(&self) -> u16 {
        self.0
    }
}

#[derive(Copy, Clone)]
struct TimerDescriptor {
    enabled: bool,
    count: SaturatingCounter,
}

impl TimerDescriptor {
    const fn new(enabled: bool) -> Self {
        TimerDescriptor {
            enabled,
            count: SaturatingCounter::new(),
        }
    }
}

pub struct TickSources {
    timers: [TimerDescriptor; TickSource::VARIANT_COUNT],
}

impl TickSources {
    pub const fn new() -> Self {
        let mut timers = [TimerDescriptor::new(false); TickSource::VARIANT_COUNT];
        timers[TickSource::Control as usize] = TimerDescriptor::new(true);
        TickSources { timers }
    }

    /// Start a source from zero. Restarting a running source also rewinds it.
    pub fn enable(&mut self, source: TickSource) {
        self.timers[source.ordinal()] = TimerDescriptor::new(true);
    }

    /// Stop a source. The control tick cannot be stopped.
    pub fn disable(&mut self, source: TickSource) {
        if source != TickSource::Control {
            self.timers[source.ordinal()].enabled = false;
        }
    }

    pub fn is_enabled(&self, source: TickSource) -> bool {
        self.timers[source.ordinal()].enabled
    }

    /// Count one period of `source`, returning the new count, or `None` if
    /// the source is stopped.
    pub fn tick(&mut self, source: TickSource) -> Option<u16> {
        let timer = &mut self.timers[source.ordinal()];
        timer.enabled.then(|| timer.count.increment())
    }

    pub fn count(&self, source: TickSource) -> u16 {
        self.timers[source.ordinal()].count.get()
    }
}

impl Default for TickSources {
    fn default() -> Self {
        Self::new()
    }
}

/// Free-running counter between the trigger's trailing edge and the echo
/// edge, in raw 64 µs ticks. Timestamps come from a 32-bit microsecond clock
/// and may wrap between start and stop.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElapsedRangeCounter {
    started_at_us: Option<u32>,
}

impl ElapsedRangeCounter {
    pub const fn new() -> Self {
        ElapsedRangeCounter {
            started_at_us: None,
        }
    }

    pub fn start(&mut self, now_us: u32) {
        self.started_at_us = Some(now_us);
    }

    /// Stop the counter and read it. `None` if it was never started.
    pub fn stop(&mut self, now_us: u32) -> Option<u16> {
        let started_at_us = self.started_at_us.take()?;
        let elapsed_us = now_us.wrapping_sub(started_at_us);
        let ticks = elapsed_us / RANGE_TICK_US;
        Some(u16::try_from(ticks).unwrap_or(u16::MAX))
    }

    /// Drop a running measurement without reading it.
    pub fn cancel(&mut self) {
        self.started_at_us = None;
    }

    pub fn is_running(&self) -> bool {
        self.started_at_us.is_some()
    }
}
