use super::FirmwareUpdater;
use crate::{
    devices::image::{Bank, ImageLayout},
    error::Error,
    hal::{
        flash::{self, ERASED_WORD, WORD_SIZE},
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
    /// Copies the backup image over the primary image and resets.
    ///
    /// Returns only if the backup image fails its integrity check, in which
    /// case nothing is touched.
    pub fn restore_primary(&mut self) -> Error {
        if !self.image_is_valid(Bank::Backup) {
            warn!("Backup image invalid, refusing to reflash");
            return Error::ImageCrcInvalid;
        }
        info!("Backup image valid, rewriting primary image");
        rewrite_primary(&mut self.flash, &mut self.interrupts, &mut self.watchdog, &self.layout)
    }
}

/// Rewrites the primary image with the backup image, then resets.
///
/// This overwrites the very code (vector table included) the device is
/// running, so from the moment interrupts are masked it must not branch
/// anywhere outside itself. Every loop is written out by hand and, on
/// target, the routine is placed in `.data`, which the runtime copies to
/// RAM before `main`. The hal primitives it calls (`Interrupts::disable`,
/// `Watchdog::halt` and `Watchdog::reset`, and every `flash::Controller`
/// method) must be `#[inline(always)]` in the target implementations.
///
/// Segments that already match the backup are left alone, and only words
/// differing from the erased pattern are programmed. Running it again after
/// an interruption (or twice in a row) is therefore safe, and the second
/// run touches nothing.
#[inline(never)]
#[cfg_attr(target_arch = "arm", link_section = ".data.rewrite_primary")]
pub fn rewrite_primary<F, I, W>(
    flash: &mut F,
    interrupts: &mut I,
    watchdog: &mut W,
    layout: &ImageLayout,
) -> !
where
    F: flash::Controller,
    I: Interrupts,
    W: Watchdog,
{
    interrupts.disable();
    watchdog.halt();
    flash.unlock();

    let mut segment = 0;
    while segment < layout.length {
        let segment_end = segment + layout.segment_size;

        let mut offset = segment;
        let mut up_to_date = true;
        while offset < segment_end {
            if flash.read_word(layout.backup + offset) != flash.read_word(layout.primary + offset) {
                up_to_date = false;
                break;
            }
            offset += WORD_SIZE;
        }

        if !up_to_date {
            flash.erase_segment(layout.primary + segment);
            while flash.is_busy() {}

            offset = segment;
            while offset < segment_end {
                let word = flash.read_word(layout.backup + offset);
                if word != ERASED_WORD {
                    flash.program_word(layout.primary + offset, word);
                    while flash.is_busy() {}
                }
                offset += WORD_SIZE;
            }
        }

        segment = segment_end;
    }

    flash.lock();
    watchdog.reset(layout.reset_timeout)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        devices::{
            image::test::{flash_for, image, layout},
            updater::test::updater_with,
        },
        hal::{doubles::watchdog::expect_reset, time::U32Ext},
    };

    #[test]
    fn invalid_backup_is_refused_without_touching_flash() {
        // Given
        let layout = layout();
        let mut flash = flash_for(&layout);
        let mut backup = image(layout.length, 3);
        backup[10] ^= 0xFF;
        flash.load(layout.backup, &backup);
        let mut updater = updater_with(flash);

        // When
        let refusal = updater.restore_primary();

        // Then
        assert_eq!(refusal, Error::ImageCrcInvalid);
        assert_eq!(refusal.update_status(), Some(23));
        assert_eq!(updater.flash().writes(), 0);
        assert!(updater.flash().erases().is_empty());
        assert!(!updater.watchdog().halted);
    }

    #[test]
    fn valid_backup_replaces_primary_and_resets() {
        // Given
        let layout = layout();
        let mut flash = flash_for(&layout);
        let backup = image(layout.length, 3);
        flash.load(layout.backup, &backup);
        flash.load(layout.primary, &image(layout.length, 9));
        let mut updater = updater_with(flash);

        // When
        let timeout = expect_reset(|| updater.restore_primary());

        // Then
        assert_eq!(timeout, 64.ms());
        assert_eq!(updater.flash().bytes(layout.primary, layout.length), &backup[..]);
        assert!(updater.image_is_valid(Bank::Primary));
        assert!(updater.flash().is_locked());
        assert!(updater.watchdog().halted);
        assert!(!updater.interrupts().enabled);
        assert_eq!(updater.flash().bytes(layout.backup, layout.length), &backup[..]);
    }

    #[test]
    fn erased_words_are_not_programmed() {
        // Given a backup that is mostly erased
        let layout = layout();
        let mut flash = flash_for(&layout);
        let mut backup = vec![0xFF; layout.length];
        backup[..4].copy_from_slice(&[0x01, 0x02, 0x03, 0x04]);
        crate::devices::crc::generate(&mut backup, layout.length - 2);
        flash.load(layout.backup, &backup);
        flash.load(layout.primary, &[0u8; 0x2000]);
        let mut updater = updater_with(flash);

        // When
        expect_reset(|| updater.restore_primary());

        // Then only the two leading words and the checksum word are written
        assert_eq!(updater.flash().erases().len(), layout.segments());
        assert_eq!(updater.flash().writes(), 3);
        assert!(updater.image_is_valid(Bank::Primary));
    }

    #[test]
    fn second_reflash_writes_nothing() {
        // Given
        let layout = layout();
        let mut flash = flash_for(&layout);
        let backup = image(layout.length, 5);
        flash.load(layout.backup, &backup);
        let mut updater = updater_with(flash);
        expect_reset(|| updater.restore_primary());
        let after_first = updater.flash().bytes(layout.primary, layout.length).to_vec();

        // When
        let mut flash = flash_for(&layout);
        flash.load(layout.backup, &backup);
        flash.load(layout.primary, &after_first);
        let mut updater = updater_with(flash);
        expect_reset(|| updater.restore_primary());

        // Then
        assert_eq!(updater.flash().writes(), 0);
        assert!(updater.flash().erases().is_empty());
        assert_eq!(updater.flash().bytes(layout.primary, layout.length), &after_first[..]);
        assert_eq!(after_first, backup);
    }

    #[test]
    fn interrupted_reflash_completes_when_retriggered() {
        // Given a primary image that was half rewritten when power failed:
        // the first segments match the backup, one is erased mid-way
        let layout = layout();
        let backup = image(layout.length, 11);
        let mut primary = image(layout.length, 12);
        primary[..0x800].copy_from_slice(&backup[..0x800]);
        primary[0x800..0xA00].iter_mut().for_each(|b| *b = 0xFF);
        primary[0x800..0x810].copy_from_slice(&backup[0x800..0x810]);
        let mut flash = flash_for(&layout);
        flash.load(layout.backup, &backup);
        flash.load(layout.primary, &primary);
        let mut updater = updater_with(flash);

        // When
        expect_reset(|| updater.restore_primary());

        // Then
        assert_eq!(updater.flash().bytes(layout.primary, layout.length), &backup[..]);
        assert!(!updater.flash().erases().contains(&(layout.primary + 0x200)));
        assert!(updater.flash().erases().contains(&(layout.primary + 0x800)));
    }
}
