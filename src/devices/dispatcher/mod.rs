//! Command dispatcher.
//!
//! Every validated frame carries a command (`READ`, `WRITE` or
//! `WRITE_THEN_READ`) and, as its first payload byte, the location it
//! targets. The dispatcher serves the pair and answers with an `ACK` reply
//! starting with the served location, or with a bare `NACK` when the pair
//! is unknown or the payload cannot be decoded.
use crate::{
    devices::{
        bus::{Frame, Request},
        updater::{FirmwareBlock, FirmwareUpdate},
    },
    error::Error,
};
use core::convert::TryFrom;
use records::{ActuatorControls, ProcessSnapshot, StatusReport};

pub mod records;

/// Diagnostic served instead of the status record when the startup check
/// left a damaged image behind.
pub const FLASH_ERROR_DIAGNOSTIC: &str = "Bad CRC";

/// Process side of the board: actuator outputs and acquisition.
pub trait Plant {
    fn apply(&mut self, controls: &ActuatorControls);
    fn snapshot(&mut self) -> ProcessSnapshot;
    fn indicate_alarm(&mut self, _active: bool) {}
}

/// Identity strings and version served over the bus.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub software_version: u16,
    pub firmware_id: &'static str,
    pub compiler_version: &'static str,
    pub target_device: &'static str,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    Write = 0x08,
    Read = 0x09,
    WriteThenRead = 0x0A,
}

impl TryFrom<u8> for Command {
    type Error = Error;
    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x08 => Ok(Command::Write),
            0x09 => Ok(Command::Read),
            0x0A => Ok(Command::WriteThenRead),
            other => Err(Error::CommandUnknown(other)),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
#[repr(u8)]
pub enum Location {
    FirmwareId = 0x01,
    CompilerVersion = 0x02,
    TargetDevice = 0x03,
    ControlStatus = 0x10,
    FirmwareBlock = 0x11,
    Reflash = 0x12,
}

impl TryFrom<u8> for Location {
    type Error = Error;
    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(Location::FirmwareId),
            0x02 => Ok(Location::CompilerVersion),
            0x03 => Ok(Location::TargetDevice),
            0x10 => Ok(Location::ControlStatus),
            0x11 => Ok(Location::FirmwareBlock),
            0x12 => Ok(Location::Reflash),
            other => Err(Error::LocationUnknown(other)),
        }
    }
}

/// What to answer, decided before the request is consumed.
#[derive(Copy, Clone, Debug, PartialEq)]
enum Response {
    Text(Location, &'static str),
    ControlApplied,
    Status(StatusReport),
    FlashError,
    UpdateStatus(Location, u8),
}

pub struct Dispatcher<PL: Plant, FU: FirmwareUpdate> {
    plant: PL,
    updater: FU,
    identity: Identity,
}

impl<PL: Plant, FU: FirmwareUpdate> Dispatcher<PL, FU> {
    pub fn new(plant: PL, updater: FU, identity: Identity) -> Self {
        Self { plant, updater, identity }
    }

    pub fn plant(&self) -> &PL { &self.plant }
    pub fn plant_mut(&mut self) -> &mut PL { &mut self.plant }
    pub fn updater(&self) -> &FU { &self.updater }
    pub fn updater_mut(&mut self) -> &mut FU { &mut self.updater }
    pub fn identity(&self) -> &Identity { &self.identity }

    /// Serves one request and schedules its reply.
    pub fn dispatch(&mut self, request: Request<'_>) {
        let crc_errors = request.crc_errors();
        let response = self.execute(request.frame(), crc_errors);

        match response {
            Ok(Response::Text(location, text)) => {
                request.ack().push_u8(location as u8).push_str(text);
            }
            Ok(Response::ControlApplied) => {
                request.ack().push_u8(Location::TargetDevice as u8);
            }
            Ok(Response::Status(report)) => {
                request.ack().push_u8(Location::ControlStatus as u8).push_bytes(&report.to_bytes());
            }
            Ok(Response::FlashError) => {
                request.nack().push_str(FLASH_ERROR_DIAGNOSTIC);
            }
            Ok(Response::UpdateStatus(location, status)) => {
                request.ack().push_u8(location as u8).push_u8(status);
            }
            Err(error) => {
                warn!("Command failed: {:?}", error);
                request.nack();
            }
        }
    }

    fn execute(&mut self, frame: Frame<'_>, crc_errors: u16) -> Result<Response, Error> {
        let command = Command::try_from(frame.command())?;
        let (&location, data) = frame.payload().split_first().ok_or(Error::PayloadMalformed)?;
        let location = Location::try_from(location)?;

        match (command, location) {
            (Command::Read, Location::FirmwareId) => {
                Ok(Response::Text(location, self.identity.firmware_id))
            }
            (Command::Read, Location::CompilerVersion) => {
                Ok(Response::Text(location, self.identity.compiler_version))
            }
            (Command::Read, Location::TargetDevice) => {
                Ok(Response::Text(location, self.identity.target_device))
            }
            (Command::Read, Location::ControlStatus) => Ok(self.status(crc_errors)),
            (Command::Write, Location::ControlStatus) => {
                self.apply_controls(data)?;
                Ok(Response::ControlApplied)
            }
            (Command::WriteThenRead, Location::ControlStatus) => {
                self.apply_controls(data)?;
                Ok(self.status(crc_errors))
            }
            (Command::Write, Location::FirmwareBlock) => {
                let block = FirmwareBlock::parse(data)?;
                let status = match self.updater.write_block(&block) {
                    Ok(()) => 0,
                    Err(error) => error.update_status().ok_or(error)?,
                };
                Ok(Response::UpdateStatus(location, status))
            }
            (Command::Write, Location::Reflash) => {
                info!("Reflash requested");
                let refusal = self.updater.reflash();
                let status = refusal.update_status().ok_or(refusal)?;
                Ok(Response::UpdateStatus(location, status))
            }
            _ => Err(Error::LocationUnknown(location as u8)),
        }
    }

    fn apply_controls(&mut self, data: &[u8]) -> Result<(), Error> {
        let controls = ActuatorControls::parse(data)?;
        self.plant.apply(&controls);
        Ok(())
    }

    fn status(&mut self, crc_errors: u16) -> Response {
        if self.updater.flash_error() {
            return Response::FlashError;
        }
        Response::Status(StatusReport {
            software_version: self.identity.software_version,
            crc_errors,
            snapshot: self.plant.snapshot(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        devices::{
            bus::{
                testing::{request, Bus, DEVICE},
                Frame, ACK, NACK,
            },
            image::test::{flash_for, image, layout},
            updater::test::{updater_with, TestUpdater},
        },
        hal::{doubles::plant::MockPlant, flash::Address},
    };

    const IDENTITY: Identity = Identity {
        software_version: 0x4109,
        firmware_id: "WTS Controller",
        compiler_version: "rustc 1.56.0",
        target_device: "WTS-RC",
    };

    #[derive(Debug, Default)]
    struct MockUpdater {
        blocks: Vec<(Address, Vec<u8>)>,
        block_result: Option<Error>,
        reflashes: usize,
        flash_error: bool,
    }

    impl FirmwareUpdate for MockUpdater {
        fn write_block(&mut self, block: &FirmwareBlock<'_>) -> Result<(), Error> {
            self.blocks.push((block.address, block.data.to_vec()));
            self.block_result.map_or(Ok(()), Err)
        }

        fn reflash(&mut self) -> Error {
            self.reflashes += 1;
            Error::ImageCrcInvalid
        }

        fn flash_error(&self) -> bool { self.flash_error }
    }

    fn dispatcher() -> Dispatcher<MockPlant, MockUpdater> {
        Dispatcher::new(MockPlant::default(), MockUpdater::default(), IDENTITY)
    }

    /// Sends one frame through the bus, dispatches it and returns the reply.
    fn exchange<FU: FirmwareUpdate>(
        bus: &mut Bus,
        dispatcher: &mut Dispatcher<MockPlant, FU>,
        command: u8,
        payload: &[u8],
    ) -> Vec<u8> {
        bus.deliver_frame(command, payload);
        let request = bus.transport.poll().expect("No frame received");
        dispatcher.dispatch(request);
        bus.transmit()
    }

    fn steam_controls() -> [u8; 11] {
        let controls = ActuatorControls {
            flags: records::ControlFlags { steam: true, ..Default::default() },
            steam_flow: 500,
            ..Default::default()
        };
        let mut payload = [0u8; 11];
        payload[0] = Location::ControlStatus as u8;
        payload[1..].copy_from_slice(&controls.to_bytes());
        payload
    }

    #[test]
    fn identity_strings_are_served_with_their_location() {
        let mut bus = Bus::new();
        let mut dispatcher = dispatcher();

        for (location, text) in [
            (Location::FirmwareId, IDENTITY.firmware_id),
            (Location::CompilerVersion, IDENTITY.compiler_version),
            (Location::TargetDevice, IDENTITY.target_device),
        ]
        .iter()
        {
            let reply = exchange(&mut bus, &mut dispatcher, 0x09, &[*location as u8]);
            let reply = Frame::parse(&reply).unwrap();
            assert_eq!(reply.command(), ACK);
            assert_eq!(reply.payload()[0], *location as u8);
            assert_eq!(&reply.payload()[1..], [text.as_bytes(), &[0u8][..]].concat().as_slice());
        }
    }

    #[test]
    fn control_write_applies_and_acknowledges() {
        // Given
        let mut bus = Bus::new();
        let mut dispatcher = dispatcher();

        // When
        let reply = exchange(&mut bus, &mut dispatcher, 0x08, &steam_controls());

        // Then
        let reply = Frame::parse(&reply).unwrap();
        assert_eq!(reply.command(), ACK);
        assert_eq!(reply.payload(), &[Location::TargetDevice as u8]);
        assert_eq!(dispatcher.plant().latest().unwrap().steam_flow_setpoint(), 500);
        assert_eq!(dispatcher.plant().snapshots, 0);
    }

    #[test]
    fn write_then_read_reports_snapshot_taken_after_applying() {
        // Given
        let mut bus = Bus::new();
        let mut dispatcher = dispatcher();

        // When
        let reply = exchange(&mut bus, &mut dispatcher, 0x0A, &steam_controls());

        // Then
        let reply = Frame::parse(&reply).unwrap();
        assert_eq!(reply.command(), ACK);
        let payload = reply.payload();
        assert_eq!(payload.len(), 1 + records::STATUS_RECORD_SIZE);
        assert_eq!(payload[0], Location::ControlStatus as u8);
        let record = &payload[1..];
        assert_eq!(&record[0..2], &IDENTITY.software_version.to_le_bytes());
        // spare 1 analogue reading, echoed by the plant double
        assert_eq!(&record[30..32], &500u16.to_le_bytes());
        assert_eq!(dispatcher.plant().applied.len(), 1);
        assert_eq!(dispatcher.plant().snapshots, 1);
    }

    #[test]
    fn status_read_carries_crc_error_count() {
        // Given a corrupted frame first
        let mut bus = Bus::new();
        let mut dispatcher = dispatcher();
        let mut corrupted = request(DEVICE, 0x09, &[0x10]);
        corrupted[5] ^= 0x01;
        bus.deliver(&corrupted);
        assert!(bus.transport.poll().is_none());
        bus.transmit();

        // When
        let reply = exchange(&mut bus, &mut dispatcher, 0x09, &[Location::ControlStatus as u8]);

        // Then
        let reply = Frame::parse(&reply).unwrap();
        assert_eq!(reply.command(), ACK);
        assert_eq!(&reply.payload()[1 + 8..1 + 10], &[1, 0]);
    }

    #[test]
    fn unknown_commands_and_locations_are_nacked() {
        let mut bus = Bus::new();
        let mut dispatcher = dispatcher();

        for (command, payload) in [
            (0x07u8, &[0x01u8][..]),
            (0x09, &[0x42][..]),
            (0x09, &[][..]),
            (0x08, &[Location::FirmwareId as u8, 0x00][..]),
            (0x09, &[Location::FirmwareBlock as u8][..]),
            (0x0A, &[Location::Reflash as u8][..]),
        ]
        .iter()
        {
            let reply = exchange(&mut bus, &mut dispatcher, *command, payload);
            let reply = Frame::parse(&reply).unwrap();
            assert_eq!(reply.command(), NACK);
            assert!(reply.payload().is_empty());
        }
        assert!(dispatcher.plant().applied.is_empty());
        assert_eq!(dispatcher.updater().reflashes, 0);
    }

    #[test]
    fn truncated_payloads_are_nacked_without_side_effects() {
        let mut bus = Bus::new();
        let mut dispatcher = dispatcher();

        let short_control = exchange(&mut bus, &mut dispatcher, 0x08, &steam_controls()[..8]);
        let short_block = exchange(&mut bus, &mut dispatcher, 0x08, &[0x11, 0x00, 0xC2, 0x04, 1, 2]);

        assert_eq!(Frame::parse(&short_control).unwrap().command(), NACK);
        assert_eq!(Frame::parse(&short_block).unwrap().command(), NACK);
        assert!(dispatcher.plant().applied.is_empty());
        assert!(dispatcher.updater().blocks.is_empty());
    }

    #[test]
    fn firmware_block_outcome_is_reported_as_status_byte() {
        // Given
        let mut bus = Bus::new();
        let mut dispatcher = dispatcher();
        let block = [0x11, 0x00, 0xC2, 0x02, 0xAA, 0xBB];

        // When
        let accepted = exchange(&mut bus, &mut dispatcher, 0x08, &block);
        dispatcher.updater_mut().block_result = Some(Error::WriteVerificationFailed);
        let failed = exchange(&mut bus, &mut dispatcher, 0x08, &block);

        // Then
        assert_eq!(Frame::parse(&accepted).unwrap().payload(), &[0x11, 0]);
        assert_eq!(Frame::parse(&failed).unwrap().payload(), &[0x11, 22]);
        assert_eq!(Frame::parse(&failed).unwrap().command(), ACK);
        assert_eq!(dispatcher.updater().blocks[0], (Address(0xC200), vec![0xAA, 0xBB]));
    }

    #[test]
    fn refused_reflash_is_reported_as_status_byte() {
        let mut bus = Bus::new();
        let mut dispatcher = dispatcher();

        let reply = exchange(&mut bus, &mut dispatcher, 0x08, &[Location::Reflash as u8]);

        let reply = Frame::parse(&reply).unwrap();
        assert_eq!(reply.command(), ACK);
        assert_eq!(reply.payload(), &[0x12, 23]);
        assert_eq!(dispatcher.updater().reflashes, 1);
    }

    #[test]
    fn firmware_blocks_reach_flash_through_the_updater() {
        // Given
        let mut bus = Bus::new();
        let mut dispatcher = Dispatcher::new(MockPlant::default(), updater_with(flash_for(&layout())), IDENTITY);

        // When a block lands in the backup image, then one at the program start
        let written = exchange(&mut bus, &mut dispatcher, 0x08, &[0x11, 0x00, 0xC2, 0x04, 1, 2, 3, 4]);
        let refused = exchange(&mut bus, &mut dispatcher, 0x08, &[0x11, 0x00, 0xE0, 0x02, 1, 2]);

        // Then
        assert_eq!(Frame::parse(&written).unwrap().payload(), &[0x11, 0]);
        assert_eq!(Frame::parse(&refused).unwrap().payload(), &[0x11, 21]);
        assert_eq!(dispatcher.updater().flash().bytes(Address(0xC200), 4), &[1, 2, 3, 4]);
    }

    #[test]
    fn damaged_images_turn_every_status_read_into_bad_crc() {
        // Given both images damaged at boot
        let layout = layout();
        let mut backup = image(layout.length, 7);
        backup[3] ^= 0x10;
        let mut flash = flash_for(&layout);
        flash.load(layout.backup, &backup);
        let mut updater: TestUpdater = updater_with(flash);
        updater.startup_check();
        let mut bus = Bus::new();
        let mut dispatcher = Dispatcher::new(MockPlant::default(), updater, IDENTITY);

        // When
        let read = exchange(&mut bus, &mut dispatcher, 0x09, &[0x10]);
        let write_then_read = exchange(&mut bus, &mut dispatcher, 0x0A, &steam_controls());
        let identity = exchange(&mut bus, &mut dispatcher, 0x09, &[0x01]);

        // Then
        for reply in [read, write_then_read].iter() {
            let reply = Frame::parse(reply).unwrap();
            assert_eq!(reply.command(), NACK);
            assert_eq!(reply.payload(), b"Bad CRC\0");
        }
        assert_eq!(Frame::parse(&identity).unwrap().command(), ACK);
    }

    #[test]
    fn every_request_gets_exactly_one_reply() {
        let mut bus = Bus::new();
        let mut dispatcher = dispatcher();

        let reply = exchange(&mut bus, &mut dispatcher, 0x09, &[0x01]);

        assert!(Frame::parse(&reply).is_ok());
        assert!(bus.transmit().is_empty());
    }
}
