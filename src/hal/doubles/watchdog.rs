use crate::hal::{time::Milliseconds, watchdog::Watchdog};
use std::panic::{self, AssertUnwindSafe};

/// Unwind payload standing in for a hardware reset.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WatchdogReset {
    pub timeout: Milliseconds,
}

#[derive(Debug, Default)]
pub struct MockWatchdog {
    pub pats: usize,
    pub halted: bool,
}

impl Watchdog for MockWatchdog {
    fn pat(&mut self) { self.pats += 1; }

    fn halt(&mut self) { self.halted = true; }

    fn reset(&mut self, timeout: Milliseconds) -> ! { panic::panic_any(WatchdogReset { timeout }) }
}

/// Runs `operation`, expecting it to end in a watchdog reset. Returns the
/// timeout the reset was armed with.
pub fn expect_reset<R>(operation: impl FnOnce() -> R) -> Milliseconds {
    match panic::catch_unwind(AssertUnwindSafe(operation)) {
        Ok(_) => panic!("Operation returned instead of resetting the device"),
        Err(payload) => match payload.downcast::<WatchdogReset>() {
            Ok(reset) => reset.timeout,
            Err(other) => panic::resume_unwind(other),
        },
    }
}
