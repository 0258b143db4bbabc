//! Global interrupt masking.

/// Masks and unmasks every interrupt on the core.
///
/// `disable` remembers whether interrupts were enabled so that `restore`
/// returns to that state; critical sections nest by construction, since the
/// outer section restores last.
///
/// Target implementations must mark `disable` `#[inline(always)]`, since
/// the in-place reflash routine calls it before rewriting program memory.
pub trait Interrupts {
    fn disable(&mut self);
    fn restore(&mut self);
}
