use crate::hal::time::{Milliseconds, Now};
use core::sync::atomic::{AtomicU32, Ordering};

/// Millisecond clock advanced from a periodic timer interrupt.
///
/// Only the timer interrupt calls [`TickCounter::tick`], so the counter has
/// a single writer and needs no read-modify-write atomics (which not every
/// Cortex-M core provides).
pub struct TickCounter {
    ticks: AtomicU32,
    period: Milliseconds,
}

impl TickCounter {
    pub const fn new(period: Milliseconds) -> Self { Self { ticks: AtomicU32::new(0), period } }

    /// Body of the timer interrupt handler.
    pub fn tick(&self) {
        let ticks = self.ticks.load(Ordering::Relaxed);
        self.ticks.store(ticks.wrapping_add(1), Ordering::Release);
    }

    pub fn ticks(&self) -> u32 { self.ticks.load(Ordering::Acquire) }
}

impl Now for TickCounter {
    fn now(&self) -> Milliseconds { Milliseconds(self.ticks().wrapping_mul(self.period.0)) }
}
