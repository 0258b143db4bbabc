use std::fmt::{self, Display, Formatter};

pub enum Error {
    FileReadFailed,
    FileWriteFailed,
    LengthInvalid(usize),
    ImageTooLarge { size: usize, capacity: usize },
    SizeMismatch { size: usize, expected: usize },
    ChecksumMismatch { stored: u16, computed: u16 },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        use Error::*;
        match self {
            FileReadFailed => write!(f, "Failed to read image file."),
            FileWriteFailed => write!(f, "Failed to write image file."),
            LengthInvalid(length) => {
                write!(f, "Image length {} is not a whole number of words.", length)
            }
            ImageTooLarge { size, capacity } => write!(
                f,
                "Firmware is {} bytes, but only {} fit before the checksum.",
                size, capacity
            ),
            SizeMismatch { size, expected } => {
                write!(f, "Image is {} bytes, expected exactly {}.", size, expected)
            }
            ChecksumMismatch { stored, computed } => write!(
                f,
                "Stored checksum 0x{:04x} does not match computed checksum 0x{:04x}.",
                stored, computed
            ),
        }
    }
}
