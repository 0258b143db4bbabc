use super::FirmwareUpdater;
use crate::{
    devices::image::Bank,
    hal::{
        flash::{self, ERASED_WORD, WORD_SIZE},
        interrupt::Interrupts,
        watchdog::Watchdog,
    },
};

/// Result of the boot time image check, for the caller's logs and tests.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum StartupOutcome {
    /// Both images passed their integrity check.
    Intact,
    /// The backup image was damaged and has been rebuilt from the primary.
    BackupRepaired,
    /// An image is damaged and could not be repaired. The flash error flag
    /// is set and the device runs on regardless.
    Degraded,
}

impl<F, I, W> FirmwareUpdater<F, I, W>
where
    F: flash::Controller,
    I: Interrupts,
    W: Watchdog,
{
    /// Checks both images and repairs whichever is damaged from the other.
    ///
    /// Must run before interrupts are enabled. A damaged primary image is
    /// restored from the backup, which ends in a reset; the check then runs
    /// again on the next boot. If the backup is damaged too, the flash
    /// error flag is set instead. A damaged backup next to a valid primary
    /// is rebuilt from the primary.
    pub fn startup_check(&mut self) -> StartupOutcome {
        if !self.image_is_valid(Bank::Primary) {
            warn!("Primary image invalid, restoring it from backup");
            let refusal = self.restore_primary();
            error!("Unable to restore primary image: {:?}", refusal);
            self.flash_error = true;
            return StartupOutcome::Degraded;
        }

        if !self.image_is_valid(Bank::Backup) {
            warn!("Backup image invalid, rebuilding it from primary");
            self.save_primary_to_backup();
            if !self.image_is_valid(Bank::Backup) {
                error!("Backup image still invalid after rebuild");
                self.flash_error = true;
                return StartupOutcome::Degraded;
            }
            info!("Backup image rebuilt");
            return StartupOutcome::BackupRepaired;
        }

        StartupOutcome::Intact
    }

    fn save_primary_to_backup(&mut self) {
        let (primary, backup) = (self.layout.primary, self.layout.backup);
        for segment in (0..self.layout.length).step_by(self.layout.segment_size) {
            self.watchdog.pat();
            self.with_unlocked_flash(|flash| flash.erase_segment(backup + segment));
            let segment_end = segment + self.layout.segment_size;
            for offset in (segment..segment_end).step_by(WORD_SIZE) {
                let word = self.flash.read_word(primary + offset);
                if word != ERASED_WORD {
                    self.with_unlocked_flash(|flash| flash.program_word(backup + offset, word));
                }
            }
        }
    }
}
