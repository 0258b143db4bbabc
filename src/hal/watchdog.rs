//! Watchdog timer interface.
use crate::hal::time::Milliseconds;

/// Target implementations must mark `halt` and `reset` `#[inline(always)]`:
/// both are called by the in-place reflash routine, `reset` after the
/// program memory has already been rewritten.
pub trait Watchdog {
    /// Restarts the watchdog countdown.
    fn pat(&mut self);

    /// Stops the watchdog entirely.
    fn halt(&mut self);

    /// Arms the watchdog with a short `timeout` and waits for it to reset
    /// the device. Never returns.
    fn reset(&mut self, timeout: Milliseconds) -> !;
}
