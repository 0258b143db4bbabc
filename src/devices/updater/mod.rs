//! Firmware update engine.
//!
//! New firmware reaches the device as a sequence of blocks written into the
//! backup image, then a reflash trigger that copies the backup over the
//! primary image in place and resets. At boot, a startup check repairs
//! whichever image is damaged from the other one.
use crate::{
    devices::image::{self, Bank, ImageLayout},
    error::Error,
    hal::{
        flash::{self, Address},
        interrupt::Interrupts,
        watchdog::Watchdog,
    },
    utilities::guard::Guard,
};

mod block;
mod reflash;
mod startup;

pub use reflash::rewrite_primary;
pub use startup::StartupOutcome;

/// Update operations the command dispatcher relies on.
pub trait FirmwareUpdate {
    /// Writes and verifies one block of firmware.
    fn write_block(&mut self, block: &FirmwareBlock<'_>) -> Result<(), Error>;

    /// Rewrites the primary image from the backup and resets the device.
    /// Only returns if the backup fails its integrity check, with the
    /// reason for refusing.
    fn reflash(&mut self) -> Error;

    /// Whether the startup check left a damaged image behind.
    fn flash_error(&self) -> bool;
}

/// One firmware block command: `address:u16 | len:u8 | data[len]`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FirmwareBlock<'a> {
    pub address: Address,
    pub data: &'a [u8],
}

impl<'a> FirmwareBlock<'a> {
    const HEADER_SIZE: usize = 3;

    pub fn parse(bytes: &'a [u8]) -> Result<Self, Error> {
        let header = bytes.get(..Self::HEADER_SIZE).ok_or(Error::PayloadMalformed)?;
        let address = Address(u16::from_le_bytes([header[0], header[1]]) as u32);
        let length = header[2] as usize;
        let data = bytes
            .get(Self::HEADER_SIZE..Self::HEADER_SIZE + length)
            .ok_or(Error::PayloadMalformed)?;
        Ok(Self { address, data })
    }
}

pub struct FirmwareUpdater<F, I, W>
where
    F: flash::Controller,
    I: Interrupts,
    W: Watchdog,
{
    flash: F,
    interrupts: I,
    watchdog: W,
    layout: ImageLayout,
    flash_error: bool,
}

impl<F, I, W> FirmwareUpdater<F, I, W>
where
    F: flash::Controller,
    I: Interrupts,
    W: Watchdog,
{
    pub fn new(flash: F, interrupts: I, watchdog: W, layout: ImageLayout) -> Result<Self, Error> {
        layout.validate()?;
        Ok(Self { flash, interrupts, watchdog, layout, flash_error: false })
    }

    pub fn layout(&self) -> &ImageLayout { &self.layout }

    pub fn flash(&self) -> &F { &self.flash }

    pub fn interrupts(&self) -> &I { &self.interrupts }

    pub fn watchdog(&self) -> &W { &self.watchdog }

    pub fn pat_watchdog(&mut self) { self.watchdog.pat(); }

    pub fn image_is_valid(&self, bank: Bank) -> bool {
        image::is_valid(&self.flash, self.layout.start(bank), self.layout.length)
    }

    /// Runs one erase or program operation with interrupts masked and the
    /// controller unlocked, and waits for it to finish.
    fn with_unlocked_flash<R>(&mut self, operation: impl FnOnce(&mut F) -> R) -> R {
        let _critical_section = Guard::new(&mut self.interrupts, |i| i.disable(), |i| i.restore());
        let mut flash = Guard::new(&mut self.flash, |f| f.unlock(), |f| f.lock());
        let result = operation(&mut *flash);
        while flash.is_busy() {}
        result
    }
}

impl<F, I, W> FirmwareUpdate for FirmwareUpdater<F, I, W>
where
    F: flash::Controller,
    I: Interrupts,
    W: Watchdog,
{
    fn write_block(&mut self, block: &FirmwareBlock<'_>) -> Result<(), Error> {
        self.write_and_verify_block(block)
    }

    fn reflash(&mut self) -> Error { self.restore_primary() }

    fn flash_error(&self) -> bool { self.flash_error }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::{
        devices::image::test::{flash_for, layout},
        hal::{
            doubles::{flash::FakeFlash, interrupt::MockInterrupts, watchdog::MockWatchdog},
            flash::Controller as _,
        },
    };

    pub type TestUpdater = FirmwareUpdater<FakeFlash, MockInterrupts, MockWatchdog>;

    pub fn updater_with(flash: FakeFlash) -> TestUpdater {
        FirmwareUpdater::new(flash, MockInterrupts::default(), MockWatchdog::default(), layout())
            .unwrap()
    }

    pub fn updater() -> TestUpdater { updater_with(flash_for(&layout())) }

    #[test]
    fn block_command_decodes_header_and_data() {
        let block = FirmwareBlock::parse(&[0x00, 0xC2, 0x04, 1, 2, 3, 4, 0xEE]).unwrap();
        assert_eq!(block.address, Address(0xC200));
        assert_eq!(block.data, &[1, 2, 3, 4]);
    }

    #[test]
    fn truncated_block_command_is_malformed() {
        assert_eq!(FirmwareBlock::parse(&[0x00, 0xC2]), Err(Error::PayloadMalformed));
        assert_eq!(FirmwareBlock::parse(&[0x00, 0xC2, 0x04, 1, 2, 3]), Err(Error::PayloadMalformed));
    }

    #[test]
    fn unsound_layout_is_refused() {
        let broken = ImageLayout { primary: layout().backup, ..layout() };
        let result = FirmwareUpdater::new(
            flash_for(&layout()),
            MockInterrupts::default(),
            MockWatchdog::default(),
            broken,
        );
        assert!(result.is_err());
    }

    #[test]
    fn flash_operations_run_unlocked_inside_critical_section() {
        // Given
        let mut updater = updater();

        // When
        let locked_during = updater.with_unlocked_flash(|flash| {
            flash.program_word(Address(0xC000), 0x1234);
            flash.is_locked()
        });

        // Then
        assert!(!locked_during);
        assert!(updater.flash().is_locked());
        assert!(updater.interrupts().enabled);
        assert_eq!(updater.interrupts().disables, 1);
    }
}
