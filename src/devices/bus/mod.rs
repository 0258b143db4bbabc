//! Half-duplex supervisor bus.
//!
//! Frames on the wire look like this (multi-byte fields little-endian):
//!
//! ```text
//! START | source | target | command | length | payload.. | crc16 | END
//! ```
//!
//! `length` counts every byte from `source` through the checksum, and the
//! checksum covers `source` through the end of the payload. Replies carry
//! `ACK` or `NACK` in the `command` position.
//!
//! Bytes are accumulated by the UART interrupt handlers into a
//! [`BusSession`] shared with the main loop, which polls a [`Transport`]
//! for validated frames and answers them through [`Request`] and [`Reply`].
use crate::hal::time::{Milliseconds, U32Ext};

mod frame;
mod reply;
mod session;
mod transport;

pub use frame::{encode, Frame};
pub use reply::{Reply, Request};
pub use session::{BusSession, Phase, Transmission};
pub use transport::{LinkMonitor, Transport};

pub const START: u8 = 0x02;
pub const END: u8 = 0x03;
pub const ACK: u8 = 0x06;
pub const NACK: u8 = 0x15;

pub const SOURCE_INDEX: usize = 1;
pub const TARGET_INDEX: usize = 2;
pub const COMMAND_INDEX: usize = 3;
pub const LENGTH_INDEX: usize = 4;
pub const PAYLOAD_INDEX: usize = 5;

/// Smallest meaningful `length` field: header and checksum, no payload.
pub const MIN_LENGTH: usize = 6;

/// Largest payload a single frame can carry.
pub const MAX_PAYLOAD: usize = u8::MAX as usize - MIN_LENGTH;

/// Bytes in a frame that are not payload.
pub const FRAME_OVERHEAD: usize = MIN_LENGTH + 2;

/// Shared receive/transmit buffer size. Fits the longest frame a `length`
/// byte can describe.
pub const BUFFER_SIZE: usize = u8::MAX as usize + 2;

static_assertions::const_assert_eq!(MAX_PAYLOAD + FRAME_OVERHEAD, BUFFER_SIZE);

/// Addressing and timing of the bus interface.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BusConfig {
    /// This device's bus address. Frames for anyone else are ignored.
    pub address: u8,
    /// Quiet time between the end of a received frame and driving the line.
    pub turnaround_guard: Milliseconds,
    /// Longest silence tolerated between two bytes of the same frame.
    pub byte_gap_timeout: Milliseconds,
    /// Time the driver stays enabled after the last byte is handed over.
    pub transmit_hold: Milliseconds,
    /// Silence after which the supervisor is considered gone.
    pub link_timeout: Milliseconds,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            address: 0x20,
            turnaround_guard: 8.ms(),
            byte_gap_timeout: 8.ms(),
            transmit_hold: 0.ms(),
            link_timeout: 30.s().into(),
        }
    }
}

#[cfg(test)]
pub(crate) use transport::test as testing;
