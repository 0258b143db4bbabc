use super::{
    COMMAND_INDEX, END, FRAME_OVERHEAD, LENGTH_INDEX, MAX_PAYLOAD, MIN_LENGTH, PAYLOAD_INDEX,
    SOURCE_INDEX, START, TARGET_INDEX,
};
use crate::{devices::crc, error::Error};

/// View into a complete frame, from the start marker to the end marker.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Frame<'a> {
    bytes: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Wraps bytes already known to hold a well formed frame.
    pub(super) fn new(bytes: &'a [u8]) -> Self {
        debug_assert!(bytes.len() >= FRAME_OVERHEAD);
        Self { bytes }
    }

    /// Validates a standalone frame: markers, length and checksum.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, Error> {
        if bytes.len() < FRAME_OVERHEAD || bytes[0] != START {
            return Err(Error::FrameLengthInvalid);
        }
        let length = bytes[LENGTH_INDEX] as usize;
        if length < MIN_LENGTH || bytes.len() != length + 2 {
            return Err(Error::FrameLengthInvalid);
        }
        if bytes[length + 1] != END {
            return Err(Error::FrameTerminatorInvalid);
        }
        if crc::is_invalid(&bytes[SOURCE_INDEX..], length - crc::CRC_SIZE) {
            return Err(Error::FrameCrcInvalid);
        }
        Ok(Self { bytes })
    }

    pub fn source(&self) -> u8 { self.bytes[SOURCE_INDEX] }
    pub fn target(&self) -> u8 { self.bytes[TARGET_INDEX] }

    /// Command byte, or `ACK`/`NACK` for replies.
    pub fn command(&self) -> u8 { self.bytes[COMMAND_INDEX] }

    pub fn payload(&self) -> &'a [u8] {
        &self.bytes[PAYLOAD_INDEX..self.bytes.len() - crc::CRC_SIZE - 1]
    }
}

/// Builds a complete frame into `output`, returning its size.
pub fn encode(
    source: u8,
    target: u8,
    command: u8,
    payload: &[u8],
    output: &mut [u8],
) -> Result<usize, Error> {
    let size = payload.len() + FRAME_OVERHEAD;
    if payload.len() > MAX_PAYLOAD || output.len() < size {
        return Err(Error::PayloadMalformed);
    }

    output[0] = START;
    output[SOURCE_INDEX] = source;
    output[TARGET_INDEX] = target;
    output[COMMAND_INDEX] = command;
    output[LENGTH_INDEX] = (payload.len() + MIN_LENGTH) as u8;
    output[PAYLOAD_INDEX..PAYLOAD_INDEX + payload.len()].copy_from_slice(payload);
    crc::generate(&mut output[SOURCE_INDEX..], PAYLOAD_INDEX - SOURCE_INDEX + payload.len());
    output[size - 1] = END;
    Ok(size)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::devices::bus::BUFFER_SIZE;

    #[test]
    fn encoded_frame_has_expected_layout() {
        // Given
        let mut output = [0u8; 16];

        // When
        let size = encode(0x01, 0x20, 0x09, &[0x10], &mut output).unwrap();

        // Then
        assert_eq!(size, 9);
        assert_eq!(&output[..6], &[START, 0x01, 0x20, 0x09, 7, 0x10]);
        assert_eq!(output[8], END);
        let frame = Frame::parse(&output[..size]).unwrap();
        assert_eq!(frame.source(), 0x01);
        assert_eq!(frame.target(), 0x20);
        assert_eq!(frame.command(), 0x09);
        assert_eq!(frame.payload(), &[0x10]);
    }

    #[test]
    fn largest_payload_fills_the_buffer() {
        let payload = [0x5A; MAX_PAYLOAD];
        let mut output = [0u8; BUFFER_SIZE];

        let size = encode(0x01, 0x20, 0x08, &payload, &mut output).unwrap();

        assert_eq!(size, BUFFER_SIZE);
        assert_eq!(output[LENGTH_INDEX], u8::MAX);
        assert_eq!(Frame::parse(&output).unwrap().payload().len(), MAX_PAYLOAD);
        assert_eq!(
            encode(0x01, 0x20, 0x08, &[0; MAX_PAYLOAD + 1], &mut [0u8; 300]),
            Err(Error::PayloadMalformed)
        );
    }

    #[test]
    fn parsing_rejects_damaged_frames() {
        let mut output = [0u8; 16];
        let size = encode(0x01, 0x20, 0x09, &[0x01, 0x02], &mut output).unwrap();
        let frame = &output[..size];

        let mut bad_terminator = frame.to_vec();
        bad_terminator[size - 1] = 0x00;
        assert_eq!(Frame::parse(&bad_terminator), Err(Error::FrameTerminatorInvalid));

        let mut bad_payload = frame.to_vec();
        bad_payload[PAYLOAD_INDEX] ^= 0xFF;
        assert_eq!(Frame::parse(&bad_payload), Err(Error::FrameCrcInvalid));

        assert_eq!(Frame::parse(&frame[..size - 1]), Err(Error::FrameLengthInvalid));
    }
}
