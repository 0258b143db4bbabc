//! Firmware image layout and integrity.
//!
//! Two images of identical size live at fixed addresses: the primary image
//! the device executes, and a backup image that firmware blocks are staged
//! into and that the primary is restored from. Each image carries the
//! checksum of everything but its final word in that final word.
use crate::{
    devices::crc::{Checksum, CRC_SIZE},
    error::Error,
    hal::{
        flash::{self, Address, WORD_SIZE},
        time::Milliseconds,
    },
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Bank {
    Backup,
    Primary,
}

/// Where the images live and how the flash around them is organised.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ImageLayout {
    pub backup: Address,
    pub primary: Address,
    /// Size of each image, in bytes.
    pub length: usize,
    pub segment_size: usize,
    /// Start of the code currently executing. Firmware blocks may not
    /// reach it.
    pub program_start: Address,
    /// Delay of the reset that concludes a reflash.
    pub reset_timeout: Milliseconds,
}

impl ImageLayout {
    pub fn start(&self, bank: Bank) -> Address {
        match bank {
            Bank::Backup => self.backup,
            Bank::Primary => self.primary,
        }
    }

    pub fn segments(&self) -> usize { self.length / self.segment_size }

    pub fn is_segment_aligned(&self, address: Address) -> bool {
        usize::from(address) % self.segment_size == 0
    }

    /// Checks the layout is one the update engine can work with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.segment_size == 0 || self.segment_size % WORD_SIZE != 0 {
            return Err(Error::ConfigurationError("Segment size must be a whole number of words"));
        }
        if self.length < self.segment_size || self.length % self.segment_size != 0 {
            return Err(Error::ConfigurationError("Images must span whole segments"));
        }
        if !self.is_segment_aligned(self.backup) || !self.is_segment_aligned(self.primary) {
            return Err(Error::ConfigurationError("Images must start on a segment boundary"));
        }
        let overlapping = self.backup < self.primary + self.length
            && self.primary < self.backup + self.length;
        if overlapping {
            return Err(Error::ConfigurationError("Images overlap"));
        }
        if self.program_start < self.backup + self.length {
            return Err(Error::ConfigurationError("Program must start above the backup image"));
        }
        Ok(())
    }
}

/// Whether the image at `start` carries the checksum of its contents in its
/// final word.
pub fn is_valid<F: flash::Controller>(flash: &F, start: Address, length: usize) -> bool {
    const CHUNK_SIZE: usize = 64;
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut checksum = Checksum::new();
    let covered = length - CRC_SIZE;

    let mut offset = 0;
    while offset < covered {
        let chunk = &mut buffer[..CHUNK_SIZE.min(covered - offset)];
        flash.read(start + offset, chunk);
        checksum.update(chunk);
        offset += chunk.len();
    }

    flash.read_word(start + covered) == checksum.value()
}
