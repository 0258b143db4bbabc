use crate::hal::flash::{self, Address, WORD_SIZE};
use std::cell::Cell;

/// How many `is_busy` polls an erase or program operation keeps the
/// fake controller busy for. Exercises the callers' wait loops.
const BUSY_POLLS: u32 = 2;

/// Segmented NOR flash living in memory.
///
/// Erasing sets a whole segment to `0xFF` and programming can only clear
/// bits, like real NOR cells. Erasing or programming while the controller
/// is locked, or programming a misaligned word, panics.
pub struct FakeFlash {
    base: Address,
    segment_size: usize,
    data: Vec<u8>,
    locked: bool,
    busy: Cell<u32>,
    erases: Vec<Address>,
    writes: usize,
}

impl FakeFlash {
    pub fn new(base: Address, length: usize, segment_size: usize) -> Self {
        assert_eq!(length % segment_size, 0);
        Self {
            base,
            segment_size,
            data: vec![0xFF; length],
            locked: true,
            busy: Cell::new(0),
            erases: Vec::new(),
            writes: 0,
        }
    }

    /// Places bytes directly in memory, bypassing the controller.
    pub fn load(&mut self, address: Address, bytes: &[u8]) {
        let offset = self.offset(address);
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn bytes(&self, address: Address, length: usize) -> &[u8] {
        let offset = self.offset(address);
        &self.data[offset..offset + length]
    }

    /// Segments erased so far, in order.
    pub fn erases(&self) -> &[Address] { &self.erases }

    /// Number of words programmed so far.
    pub fn writes(&self) -> usize { self.writes }

    pub fn is_locked(&self) -> bool { self.locked }

    fn offset(&self, address: Address) -> usize {
        assert!(address >= self.base, "Address {:?} below fake flash", address);
        let offset = address - self.base;
        assert!(offset <= self.data.len(), "Address {:?} beyond fake flash", address);
        offset
    }

    fn start_operation(&mut self) {
        assert!(!self.locked, "Flash operation attempted while locked");
        assert_eq!(self.busy.get(), 0, "Flash operation attempted while busy");
        self.busy.set(BUSY_POLLS);
    }
}

impl flash::Controller for FakeFlash {
    fn read(&self, address: Address, bytes: &mut [u8]) {
        let offset = self.offset(address);
        bytes.copy_from_slice(&self.data[offset..offset + bytes.len()]);
    }

    fn is_busy(&self) -> bool {
        let remaining = self.busy.get();
        self.busy.set(remaining.saturating_sub(1));
        remaining > 0
    }

    fn unlock(&mut self) { self.locked = false; }

    fn lock(&mut self) { self.locked = true; }

    fn erase_segment(&mut self, address: Address) {
        self.start_operation();
        let start = self.offset(address) / self.segment_size * self.segment_size;
        self.data[start..start + self.segment_size].iter_mut().for_each(|b| *b = 0xFF);
        self.erases.push(self.base + start);
    }

    fn program_word(&mut self, address: Address, word: u16) {
        self.start_operation();
        assert!(address.is_word_aligned(), "Misaligned word write at {:?}", address);
        let offset = self.offset(address);
        self.data[offset..offset + WORD_SIZE]
            .iter_mut()
            .zip(word.to_le_bytes().iter())
            .for_each(|(cell, bits)| *cell &= bits);
        self.writes += 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hal::flash::Controller;

    #[test]
    fn programming_only_clears_bits_until_erased() {
        // Given
        let mut flash = FakeFlash::new(Address(0x1000), 1024, 512);
        flash.unlock();

        // When
        flash.program_word(Address(0x1002), 0x0FF0);
        while flash.is_busy() {}
        flash.program_word(Address(0x1002), 0xF00F);
        while flash.is_busy() {}

        // Then
        assert_eq!(flash.read_word(Address(0x1002)), 0x0000);

        // When
        flash.erase_segment(Address(0x1010));
        while flash.is_busy() {}

        // Then
        assert_eq!(flash.read_word(Address(0x1002)), 0xFFFF);
        assert_eq!(flash.erases(), &[Address(0x1000)]);
        assert_eq!(flash.writes(), 2);
    }

    #[test]
    #[should_panic]
    fn erasing_locked_flash_panics() {
        let mut flash = FakeFlash::new(Address(0), 512, 512);
        flash.erase_segment(Address(0));
    }
}
