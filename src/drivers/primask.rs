use crate::hal::interrupt::Interrupts;
use cortex_m::register::primask;

/// Global interrupt mask over the PRIMASK register.
///
/// Each `disable` pushes the previous mask state onto a bit stack, so up to
/// 32 nested critical sections restore correctly.
#[derive(Default)]
pub struct PrimaskInterrupts {
    previously_enabled: u32,
}

impl Interrupts for PrimaskInterrupts {
    #[inline(always)]
    fn disable(&mut self) {
        let enabled = primask::read().is_active();
        cortex_m::interrupt::disable();
        self.previously_enabled = (self.previously_enabled << 1) | enabled as u32;
    }

    #[inline(always)]
    fn restore(&mut self) {
        let enabled = self.previously_enabled & 1 != 0;
        self.previously_enabled >>= 1;
        if enabled {
            // NOTE(Safety): Only re-enables interrupts that were enabled
            // when the matching critical section began.
            unsafe { cortex_m::interrupt::enable() };
        }
    }
}
