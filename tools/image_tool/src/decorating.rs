use crate::error::Error;
use byteorder::{ByteOrder, LittleEndian};
use crc::crc16::{self, Hasher16};

/// Value of erased flash, used to pad images.
pub const ERASED_BYTE: u8 = 0xFF;
const CHECKSUM_SIZE: usize = 2;

fn checksum(bytes: &[u8]) -> u16 {
    let mut digest = crc16::Digest::new(crc16::X25);
    digest.write(bytes);
    digest.sum16()
}

fn check_length(length: usize) -> Result<(), Error> {
    if length < CHECKSUM_SIZE || length % 2 != 0 {
        return Err(Error::LengthInvalid(length));
    }
    Ok(())
}

/// Pads the firmware with the erased pattern to `length` bytes and stores
/// the checksum of everything before the final word in that final word.
pub fn decorate(firmware: &mut Vec<u8>, length: usize) -> Result<u16, Error> {
    check_length(length)?;
    let capacity = length - CHECKSUM_SIZE;
    if firmware.len() > capacity {
        return Err(Error::ImageTooLarge { size: firmware.len(), capacity });
    }

    firmware.resize(length, ERASED_BYTE);
    let crc = checksum(&firmware[..capacity]);
    LittleEndian::write_u16(&mut firmware[capacity..], crc);
    Ok(crc)
}

/// Checks a decorated image, returning its checksum.
pub fn verify(image: &[u8], length: usize) -> Result<u16, Error> {
    check_length(length)?;
    if image.len() != length {
        return Err(Error::SizeMismatch { size: image.len(), expected: length });
    }

    let capacity = length - CHECKSUM_SIZE;
    let stored = LittleEndian::read_u16(&image[capacity..]);
    let computed = checksum(&image[..capacity]);
    if stored != computed {
        return Err(Error::ChecksumMismatch { stored, computed });
    }
    Ok(computed)
}

#[cfg(test)]
mod test {
    use super::*;

    const LENGTH: usize = 0x2000;

    #[test]
    fn decorated_image_is_padded_and_verifies() {
        // Given
        let mut image = vec![0x12, 0x34, 0x56];

        // When
        let crc = decorate(&mut image, LENGTH).ok().unwrap();

        // Then
        assert_eq!(image.len(), LENGTH);
        assert_eq!(&image[..3], &[0x12, 0x34, 0x56]);
        assert!(image[3..LENGTH - 2].iter().all(|&b| b == ERASED_BYTE));
        assert_eq!(verify(&image, LENGTH).ok(), Some(crc));
    }

    #[test]
    fn decorated_image_is_accepted_by_the_device() {
        let mut image: Vec<u8> = (0..5000u32).map(|i| (i * 7) as u8).collect();

        decorate(&mut image, LENGTH).ok().unwrap();

        assert!(!wts_lib::devices::crc::is_invalid(&image, LENGTH - 2));
    }

    #[test]
    fn oversized_firmware_is_rejected() {
        let mut image = vec![0u8; LENGTH - 1];
        assert!(matches!(decorate(&mut image, LENGTH), Err(Error::ImageTooLarge { .. })));

        let mut image = vec![0u8; LENGTH - 2];
        assert!(decorate(&mut image, LENGTH).is_ok());
    }

    #[test]
    fn tampered_image_fails_verification() {
        // Given
        let mut image = vec![0xA5; 100];
        decorate(&mut image, LENGTH).ok().unwrap();

        // When
        image[10] ^= 0x01;

        // Then
        assert!(matches!(verify(&image, LENGTH), Err(Error::ChecksumMismatch { .. })));
        assert!(matches!(verify(&image[1..], LENGTH), Err(Error::SizeMismatch { .. })));
    }

    #[test]
    fn odd_lengths_are_rejected() {
        let mut image = vec![];
        assert!(matches!(decorate(&mut image, 0x1FFF), Err(Error::LengthInvalid(0x1FFF))));
    }
}
