//! Interface to a segmented, word-programmable NOR flash controller.
//!
//! The primitives are deliberately raw: erasing a segment, programming a
//! single word and polling the busy flag. Anything higher level (critical
//! sections, verification, image copies) is built on top of them by the
//! update engine, because one of its routines runs while the program it
//! belongs to is being overwritten.
use core::ops::{Add, Sub};

/// Value of a freshly erased flash word.
pub const ERASED_WORD: u16 = 0xFFFF;

/// Size in bytes of the programmable unit.
pub const WORD_SIZE: usize = 2;

/// Absolute address in the flash address space.
#[derive(Copy, Clone, Debug, Default, Ord, PartialOrd, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub struct Address(pub u32);

impl Add<usize> for Address {
    type Output = Address;
    #[inline(always)]
    fn add(self, rhs: usize) -> Self::Output { Address(self.0 + rhs as u32) }
}

impl Sub<Address> for Address {
    type Output = usize;
    fn sub(self, rhs: Address) -> Self::Output { self.0.saturating_sub(rhs.0) as usize }
}

impl From<Address> for usize {
    fn from(address: Address) -> Self { address.0 as usize }
}

impl Address {
    pub fn is_word_aligned(self) -> bool { self.0 as usize % WORD_SIZE == 0 }
}

/// Raw flash controller operations.
///
/// Implementations for a target that reflashes its own program memory
/// should mark every method `#[inline(always)]`: the in-place reflash
/// routine may not branch into code living in the region it rewrites.
pub trait Controller {
    /// Reads raw bytes from the memory mapped flash.
    fn read(&self, address: Address, bytes: &mut [u8]);

    /// Reads a single little-endian word.
    #[inline(always)]
    fn read_word(&self, address: Address) -> u16 {
        let mut bytes = [0u8; WORD_SIZE];
        self.read(address, &mut bytes);
        u16::from_le_bytes(bytes)
    }

    /// Whether an erase or program operation is still in progress.
    fn is_busy(&self) -> bool;

    /// Allows erase and program operations.
    fn unlock(&mut self);

    /// Forbids erase and program operations.
    fn lock(&mut self);

    /// Starts erasing the segment containing `address`.
    fn erase_segment(&mut self, address: Address);

    /// Starts programming a word. Programming can only clear bits.
    fn program_word(&mut self, address: Address, word: u16);
}
