//! Convenience bitwise operations.

/// Simple check for particular bits being set or cleared.
pub trait BitFlags {
    fn is_set(&self, bit: u8) -> bool;
    fn is_clear(&self, bit: u8) -> bool;
}

/// Blanket implementation for any types convertible to u32.
impl<U: Copy + Into<u32>> BitFlags for U {
    fn is_set(&self, bit: u8) -> bool {
        assert!(bit < 32);
        ((*self).into() & (1u32 << bit)) != 0
    }

    fn is_clear(&self, bit: u8) -> bool { !self.is_set(bit) }
}

/// Packs a sequence of flags into a bit field, first flag in bit 0.
pub fn pack_flags(flags: &[bool]) -> u32 {
    assert!(flags.len() <= 32);
    flags.iter().enumerate().filter(|&(_, &set)| set).fold(0, |bits, (bit, _)| bits | (1 << bit))
}
