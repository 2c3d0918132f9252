/*
 * Hand-off between the interrupt side and the control loop.
 *
 * Tick and echo handlers must not touch controller state. They only latch what
 * happened here, and the control loop takes the whole latch once per
 * iteration. Each field has exactly one writer on each side: handlers only
 * add, the loop only swaps back to zero. Nothing needs to be masked for longer
 * than a single atomic operation.
 *
 * Ticks are counted rather than flagged so that a slow loop iteration does not
 * swallow milliseconds of braking or debounce time.
 */

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

use enum_ordinalize::Ordinalize;

use crate::ticks::TickSource;

pub struct PendingEvents {
    ticks: [AtomicU16; TickSource::VARIANT_COUNT],
    echo: AtomicBool,
    echo_at_us: AtomicU32,
}

/// Everything that happened since the previous `take`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EventBatch {
    pub ticks: [u16; TickSource::VARIANT_COUNT],
    /// Timestamp of the echo edge, if one arrived.
    pub echo_at_us: Option<u32>,
}

impl EventBatch {
    pub fn ticks(&self, source: TickSource) -> u16 {
        self.ticks[source.ordinal()]
    }

    pub fn is_empty(&self) -> bool {
        self.echo_at_us.is_none() && self.ticks.iter().all(|&count| count == 0)
    }
}

impl PendingEvents {
    pub const fn new() -> Self {
        PendingEvents {
            ticks: [const { AtomicU16::new(0) }; TickSource::VARIANT_COUNT],
            echo: AtomicBool::new(false),
            echo_at_us: AtomicU32::new(0),
        }
    }

    pub fn raise_tick(&self, source: TickSource) {
        let _ = self.ticks[source.ordinal()].fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |count| Some(count.saturating_add(1)),
        );
    }

    /// Latch an echo edge. A second edge before the loop runs replaces the
    /// first, since only one measurement can be in flight.
    pub fn raise_echo(&self, now_us: u32) {
        self.echo_at_us.store(now_us, Ordering::Relaxed);
        self.echo.store(true, Ordering::Release);
    }

    pub fn take(&self) -> EventBatch {
        let mut batch = EventBatch::default();
        for (source, count) in self.ticks.iter().enumerate() {
            batch.ticks[source] = count.swap(0, Ordering::AcqRel);
        }
        if self.echo.swap(false, Ordering::Acquire) {
            batch.echo_at_us = Some(self.echo_at_us.load(Ordering::Relaxed));
        }
        batch
    }
}

impl Default for PendingEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_drains_the_latch() {
        let events = PendingEvents::new();
        events.raise_tick(TickSource::Control);
        events.raise_tick(TickSource::Cutoff);
        events.raise_tick(TickSource::Cutoff);
        events.raise_echo(4_242);

        let batch = events.take();
        assert_eq!(batch.ticks(TickSource::Control), 1);
        assert_eq!(batch.ticks(TickSource::Cutoff), 2);
        assert_eq!(batch.ticks(TickSource::Debounce), 0);
        assert_eq!(batch.echo_at_us, Some(4_242));

        assert!(events.take().is_empty());
    }

    #[test]
    fn later_echo_replaces_earlier_one() {
        let events = PendingEvents::new();
        events.raise_echo(100);
        events.raise_echo(200);
        assert_eq!(events.take().echo_at_us, Some(200));
    }

    #[test]
    fn tick_counts_saturate() {
        let events = PendingEvents::new();
        events.ticks[TickSource::Debounce.ordinal()].store(u16::MAX, Ordering::Relaxed);
        events.raise_tick(TickSource::Debounce);
        assert_eq!(events.take().ticks(TickSource::Debounce), u16::MAX);
    }
}
