use super::{FirmwareBlock, FirmwareUpdater};
use crate::{
    error::Error,
    hal::{
        flash::{self, WORD_SIZE},
        interrupt::Interrupts,
        watchdog::Watchdog,
    },
};

impl<F, I, W> FirmwareUpdater<F, I, W>
where
    F: flash::Controller,
    I: Interrupts,
    W: Watchdog,
{
    /// Programs one firmware block and reads it back.
    ///
    /// A block starting on a segment boundary erases that segment first, so
    /// blocks are expected in ascending order. Only whole words are
    /// programmed; a trailing odd byte is still verified.
    pub fn write_and_verify_block(&mut self, block: &FirmwareBlock<'_>) -> Result<(), Error> {
        self.check_block_bounds(block)?;

        if self.layout.is_segment_aligned(block.address) {
            self.with_unlocked_flash(|flash| flash.erase_segment(block.address));
        }

        for (index, bytes) in block.data.chunks_exact(WORD_SIZE).enumerate() {
            let address = block.address + index * WORD_SIZE;
            let word = u16::from_le_bytes([bytes[0], bytes[1]]);
            self.with_unlocked_flash(|flash| flash.program_word(address, word));
        }

        self.verify_block(block).map_err(|error| {
            warn!("Firmware block at {:?} failed verification", block.address);
            error
        })
    }

    /// The block must be word aligned and end strictly below the program
    /// currently executing.
    fn check_block_bounds(&self, block: &FirmwareBlock<'_>) -> Result<(), Error> {
        let program_start = usize::from(self.layout.program_start);
        let start = usize::from(block.address);
        let end = start + block.data.len();
        if !block.address.is_word_aligned() || start >= program_start || end >= program_start {
            warn!("Rejecting firmware block at {:?}", block.address);
            return Err(Error::AddressInvalid);
        }
        Ok(())
    }

    fn verify_block(&self, block: &FirmwareBlock<'_>) -> Result<(), Error> {
        const CHUNK_SIZE: usize = 32;
        let mut buffer = [0u8; CHUNK_SIZE];
        for (index, expected) in block.data.chunks(CHUNK_SIZE).enumerate() {
            let actual = &mut buffer[..expected.len()];
            self.flash.read(block.address + index * CHUNK_SIZE, actual);
            if actual != expected {
                return Err(Error::WriteVerificationFailed);
            }
        }
        Ok(())
    }
}
