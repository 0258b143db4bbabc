//! 16-bit CRC used both by bus frames and by firmware images.
//!
//! The checksum uses the reflected X.25 polynomial and is always stored
//! little-endian right after the range it covers. Firmware images carry it
//! in their final word, written there by the image tool.
use crc::crc16::{self, Hasher16};

/// Size in bytes of a stored checksum.
pub const CRC_SIZE: usize = 2;

/// Incremental checksum over discontiguous chunks.
pub struct Checksum {
    digest: crc16::Digest,
}

impl Default for Checksum {
    fn default() -> Self { Self::new() }
}

impl Checksum {
    pub fn new() -> Self { Self { digest: crc16::Digest::new(crc16::X25) } }

    pub fn update(&mut self, bytes: &[u8]) { self.digest.write(bytes); }

    pub fn value(&self) -> u16 { self.digest.sum16() }
}

pub fn checksum(bytes: &[u8]) -> u16 {
    let mut checksum = Checksum::new();
    checksum.update(bytes);
    checksum.value()
}

/// Computes the checksum of `buffer[..length]` and stores it in
/// `buffer[length..length + CRC_SIZE]`.
///
/// # Panics
/// If the buffer has no room for the checksum.
pub fn generate(buffer: &mut [u8], length: usize) {
    let value = checksum(&buffer[..length]);
    buffer[length..length + CRC_SIZE].copy_from_slice(&value.to_le_bytes());
}

/// Whether the checksum stored after `buffer[..length]` is wrong or missing.
pub fn is_invalid(buffer: &[u8], length: usize) -> bool {
    match buffer.get(length..length + CRC_SIZE) {
        Some(stored) => u16::from_le_bytes([stored[0], stored[1]]) != checksum(&buffer[..length]),
        None => true,
    }
}
