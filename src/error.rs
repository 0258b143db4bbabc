//! Error type for the water treatment controller as a whole.

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Error {
    ConfigurationError(&'static str),

    /// Frame addressed to another device.
    FrameMisaddressed,
    /// Frame whose final byte is not the end marker.
    FrameTerminatorInvalid,
    /// Frame declaring a length too short for a header and checksum.
    FrameLengthInvalid,
    /// Frame whose checksum does not match its contents.
    FrameCrcInvalid,

    CommandUnknown(u8),
    LocationUnknown(u8),
    /// Payload too short or otherwise impossible to decode.
    PayloadMalformed,

    /// Firmware block outside the writable region, or misaligned.
    AddressInvalid,
    /// Read back of a firmware block differs from what was sent.
    WriteVerificationFailed,
    /// Firmware image failing its checksum.
    ImageCrcInvalid,
}

impl Error {
    /// Status byte reported to the supervisor for firmware update errors.
    pub fn update_status(&self) -> Option<u8> {
        match self {
            Error::AddressInvalid => Some(21),
            Error::WriteVerificationFailed => Some(22),
            Error::ImageCrcInvalid => Some(23),
            _ => None,
        }
    }
}
