//! Control and status records exchanged with the supervisor.
//!
//! Both travel as packed little-endian structures. Bit fields are exposed
//! as named booleans and only packed or unpacked at the wire boundary.
use crate::{
    error::Error,
    utilities::bitwise::{pack_flags, BitFlags},
};

pub const CONTROL_RECORD_SIZE: usize = 10;
pub const STATUS_RECORD_SIZE: usize = 54;

/// Actuator enables commanded by the supervisor.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ControlFlags {
    pub demin_fill_valve: bool,
    pub demin_purge_valve: bool,
    pub demin_fill_pump: bool,
    pub demin_polish_pump: bool,
    pub condensate_pump: bool,
    pub steam: bool,
    pub cooling_air: bool,
}

impl ControlFlags {
    pub fn from_bits(bits: u16) -> Self {
        Self {
            demin_fill_valve: bits.is_set(0),
            demin_purge_valve: bits.is_set(1),
            demin_fill_pump: bits.is_set(2),
            demin_polish_pump: bits.is_set(3),
            condensate_pump: bits.is_set(4),
            steam: bits.is_set(5),
            cooling_air: bits.is_set(6),
        }
    }

    pub fn bits(&self) -> u16 {
        pack_flags(&[
            self.demin_fill_valve,
            self.demin_purge_valve,
            self.demin_fill_pump,
            self.demin_polish_pump,
            self.condensate_pump,
            self.steam,
            self.cooling_air,
        ]) as u16
    }
}

/// Everything the supervisor can command in one control write.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ActuatorControls {
    pub flags: ControlFlags,
    /// Steam flow in µl/min, only honoured while steam is enabled.
    pub steam_flow: u16,
    pub cooling_air_valve_position: i16,
    pub pwm1: u16,
    pub pwm2: u16,
}

impl ActuatorControls {
    /// Every valve closed, every pump stopped, every setpoint zero.
    pub fn all_off() -> Self { Self::default() }

    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        let bytes = bytes.get(..CONTROL_RECORD_SIZE).ok_or(Error::PayloadMalformed)?;
        let word = |index: usize| u16::from_le_bytes([bytes[index], bytes[index + 1]]);
        Ok(Self {
            flags: ControlFlags::from_bits(word(0)),
            steam_flow: word(2),
            cooling_air_valve_position: word(4) as i16,
            pwm1: word(6),
            pwm2: word(8),
        })
    }

    pub fn to_bytes(&self) -> [u8; CONTROL_RECORD_SIZE] {
        let mut bytes = [0u8; CONTROL_RECORD_SIZE];
        let words = [
            self.flags.bits(),
            self.steam_flow,
            self.cooling_air_valve_position as u16,
            self.pwm1,
            self.pwm2,
        ];
        bytes.chunks_exact_mut(2).zip(words.iter()).for_each(|(chunk, word)| {
            chunk.copy_from_slice(&word.to_le_bytes());
        });
        bytes
    }

    /// Steam flow the generator should actually run at.
    pub fn steam_flow_setpoint(&self) -> u16 {
        if self.flags.steam {
            self.steam_flow
        } else {
            0
        }
    }
}

/// Debounced digital inputs.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InputFlags {
    pub tank_high: bool,
    pub tank_low: bool,
    pub condensate_high: bool,
    pub condensate_low: bool,
    pub spare: bool,
    pub leaks: [bool; 4],
    pub leak_detector_present: bool,
}

impl InputFlags {
    pub fn bits(&self) -> u16 {
        let [leak1, leak2, leak3, leak4] = self.leaks;
        pack_flags(&[
            self.tank_high,
            self.tank_low,
            self.condensate_high,
            self.condensate_low,
            self.spare,
            leak1,
            leak2,
            leak3,
            leak4,
            self.leak_detector_present,
        ]) as u16
    }
}

/// Filtered analogue inputs, in wire order.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AnalogueReadings {
    pub probe1_conductivity: u16,
    pub probe1_temperature: u16,
    pub probe2_conductivity: u16,
    pub probe2_temperature: u16,
    pub spare1: u16,
    pub water_meter: u16,
    pub supply_3v6: u16,
    pub reserved: u16,
    pub supply_24v: u16,
    pub polish_pump_current: u16,
    pub condensate_pump_current: u16,
    pub supply_5v: u16,
    pub supply_1v2: u16,
    pub fill_solenoid_current: u16,
    pub purge_solenoid_current: u16,
    pub boost_pump_current: u16,
}

impl AnalogueReadings {
    pub fn as_array(&self) -> [u16; 16] {
        [
            self.probe1_conductivity,
            self.probe1_temperature,
            self.probe2_conductivity,
            self.probe2_temperature,
            self.spare1,
            self.water_meter,
            self.supply_3v6,
            self.reserved,
            self.supply_24v,
            self.polish_pump_current,
            self.condensate_pump_current,
            self.supply_5v,
            self.supply_1v2,
            self.fill_solenoid_current,
            self.purge_solenoid_current,
            self.boost_pump_current,
        ]
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Uptime {
    /// Timer ticks within the current minute.
    pub ticks: u16,
    pub minutes: u32,
}

/// Process state as sampled by the acquisition collaborators.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessSnapshot {
    pub uptime: Uptime,
    pub cpu_temperature: u16,
    pub inputs: InputFlags,
    pub raw_port_inputs: [u8; 5],
    pub filter_overflows: u8,
    pub cooling_air_position: u16,
    pub analogue: AnalogueReadings,
}

/// The status record returned by control/status reads.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StatusReport {
    pub software_version: u16,
    pub crc_errors: u16,
    pub snapshot: ProcessSnapshot,
}

impl StatusReport {
    pub fn to_bytes(&self) -> [u8; STATUS_RECORD_SIZE] {
        let mut bytes = [0u8; STATUS_RECORD_SIZE];
        let mut cursor = 0usize;
        let mut put = |field: &[u8]| {
            bytes[cursor..cursor + field.len()].copy_from_slice(field);
            cursor += field.len();
        };

        let snapshot = &self.snapshot;
        put(&self.software_version.to_le_bytes());
        put(&snapshot.uptime.ticks.to_le_bytes());
        put(&snapshot.uptime.minutes.to_le_bytes());
        put(&self.crc_errors.to_le_bytes());
        put(&snapshot.cpu_temperature.to_le_bytes());
        put(&snapshot.inputs.bits().to_le_bytes());
        put(&snapshot.raw_port_inputs);
        put(&[snapshot.filter_overflows]);
        put(&snapshot.cooling_air_position.to_le_bytes());
        snapshot.analogue.as_array().iter().for_each(|reading| put(&reading.to_le_bytes()));
        bytes
    }
}
