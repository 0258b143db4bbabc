//! This sub-crate contains the board configuration of the water treatment
//! controller firmware.
//!
//! NOTE: This code is not included anywhere from the firmware itself! This
//! is a dependency of the firmware **build script**, which deserializes a
//! configuration file, validates it and generates the constants module the
//! firmware includes.
use anyhow::{bail, ensure, Result};
use serde::{Deserialize, Serialize};

pub mod codegen;

/// Largest text a string location can serve: a frame payload, minus the
/// location byte and the null terminator.
pub const MAX_IDENTITY_LENGTH: usize = 247;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    pub bus: BusConfiguration,
    pub memory: MemoryConfiguration,
    pub identity: IdentityConfiguration,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusConfiguration {
    pub address: u8,
    pub turnaround_guard_ms: u32,
    pub byte_gap_timeout_ms: u32,
    pub transmit_hold_ms: u32,
    pub link_timeout_s: u32,
}

impl Default for BusConfiguration {
    fn default() -> Self {
        Self {
            address: 0x20,
            turnaround_guard_ms: 8,
            byte_gap_timeout_ms: 8,
            transmit_hold_ms: 0,
            link_timeout_s: 30,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfiguration {
    pub backup_image: u32,
    pub primary_image: u32,
    pub image_length: u32,
    pub segment_size: u32,
    pub program_start: u32,
    pub reset_timeout_ms: u32,
}

impl Default for MemoryConfiguration {
    fn default() -> Self {
        Self {
            backup_image: 0xC000,
            primary_image: 0xE000,
            image_length: 0x2000,
            segment_size: 512,
            program_start: 0xE000,
            reset_timeout_ms: 64,
        }
    }
}

impl MemoryConfiguration {
    pub fn backup_end(&self) -> u32 { self.backup_image + self.image_length }
    pub fn primary_end(&self) -> u32 { self.primary_image + self.image_length }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IdentityConfiguration {
    pub software_version: u16,
    pub firmware_id: String,
    pub target_device: String,
}

impl Default for IdentityConfiguration {
    fn default() -> Self {
        Self {
            software_version: 0x0100,
            firmware_id: String::from("WTS-RC Controller Firmware"),
            target_device: String::from("WTS-RC"),
        }
    }
}

impl Configuration {
    /// Rejects configurations the firmware could not run with.
    pub fn validate(&self) -> Result<()> {
        self.bus.validate()?;
        self.memory.validate()?;
        self.identity.validate()
    }
}

impl BusConfiguration {
    fn validate(&self) -> Result<()> {
        ensure!(self.turnaround_guard_ms > 0, "Turnaround guard must not be zero");
        ensure!(self.byte_gap_timeout_ms > 0, "Byte gap timeout must not be zero");
        ensure!(self.link_timeout_s > 0, "Link timeout must not be zero");
        Ok(())
    }
}

impl MemoryConfiguration {
    fn validate(&self) -> Result<()> {
        let segment = self.segment_size;
        ensure!(segment > 0 && segment % 2 == 0, "Segment size must be a non-zero number of words");
        ensure!(
            self.image_length >= segment && self.image_length % segment == 0,
            "Image length must be a whole number of segments"
        );
        ensure!(
            self.backup_image % segment == 0 && self.primary_image % segment == 0,
            "Images must start on a segment boundary"
        );
        ensure!(self.reset_timeout_ms > 0, "Reset timeout must not be zero");

        let overlapping = self.backup_image < self.primary_end() && self.primary_image < self.backup_end();
        if overlapping {
            bail!(
                "Backup image [{:#06x}..{:#06x}) overlaps primary image [{:#06x}..{:#06x})",
                self.backup_image,
                self.backup_end(),
                self.primary_image,
                self.primary_end()
            );
        }
        ensure!(
            (self.primary_image..self.primary_end()).contains(&self.program_start),
            "Program start {:#06x} must lie inside the primary image",
            self.program_start
        );
        ensure!(
            self.program_start >= self.backup_end(),
            "Program start {:#06x} must lie above the backup image",
            self.program_start
        );
        Ok(())
    }
}

impl IdentityConfiguration {
    fn validate(&self) -> Result<()> {
        for (name, text) in [("Firmware id", &self.firmware_id), ("Target device", &self.target_device)] {
            ensure!(!text.contains('\0'), "{} may not contain null characters", name);
            ensure!(
                text.len() <= MAX_IDENTITY_LENGTH,
                "{} is longer than {} bytes",
                name,
                MAX_IDENTITY_LENGTH
            );
        }
        Ok(())
    }
}
