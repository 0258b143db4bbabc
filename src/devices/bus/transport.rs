use super::{
    reply::{Reply, Request},
    session::{BusSession, Phase},
    BusConfig, END, LENGTH_INDEX, MIN_LENGTH, NACK, SOURCE_INDEX, TARGET_INDEX,
};
use crate::{
    devices::{crc, traits::BusUart},
    error::Error,
    hal::{
        gpio::OutputPin,
        serial::Event,
        time::{Milliseconds, Now},
    },
};

/// Tracks when the supervisor was last answered with an `ACK`.
#[derive(Copy, Clone, Debug)]
pub struct LinkMonitor {
    timeout: Milliseconds,
    last_ack: Option<Milliseconds>,
}

impl LinkMonitor {
    pub fn new(timeout: Milliseconds) -> Self { Self { timeout, last_ack: None } }

    pub fn refresh(&mut self, now: Milliseconds) { self.last_ack = Some(now); }

    /// The link counts as lost until the first `ACK` goes out.
    pub fn is_lost(&self, now: Milliseconds) -> bool {
        match self.last_ack {
            Some(last_ack) => now - last_ack >= self.timeout,
            None => true,
        }
    }
}

/// Main loop side of the supervisor bus.
///
/// Owns the UART controls and the RS-485 driver enable line, and walks the
/// [`BusSession`] through its round trip: frame in, validation, dispatch,
/// turnaround guard, transmission, hold, back to receiving.
pub struct Transport<'s, U, P, C>
where
    U: BusUart,
    P: OutputPin,
    C: Now,
{
    session: &'s BusSession,
    uart: U,
    driver_enable: P,
    clock: C,
    config: BusConfig,
    link: LinkMonitor,
}

impl<'s, U, P, C> Transport<'s, U, P, C>
where
    U: BusUart,
    P: OutputPin,
    C: Now,
{
    pub fn new(
        session: &'s BusSession,
        mut uart: U,
        mut driver_enable: P,
        clock: C,
        config: BusConfig,
    ) -> Self {
        driver_enable.set_low();
        session.resume_receiving();
        uart.unlisten(Event::Txe);
        uart.listen(Event::Rxne);
        Self { session, uart, driver_enable, clock, link: LinkMonitor::new(config.link_timeout), config }
    }

    /// Advances the bus state machine and returns the next validated frame,
    /// if one is complete. Call once per main loop iteration.
    ///
    /// A returned request must be answered before the next poll; until
    /// then, reception stays disabled.
    pub fn poll(&mut self) -> Option<Request<'_>> {
        let now = self.clock.now();
        self.drive_direction(now);
        self.accept_frame(now)
    }

    /// Whether the supervisor has gone quiet for longer than the link timeout.
    pub fn link_lost(&self) -> bool { self.link.is_lost(self.clock.now()) }

    pub fn crc_errors(&self) -> u16 { self.session.crc_errors() }

    pub fn phase(&self) -> Phase { self.session.phase() }

    fn drive_direction(&mut self, now: Milliseconds) {
        match self.session.phase() {
            Phase::Turnaround if self.session.deadline_reached(now) => {
                self.driver_enable.set_high();
                self.session.set_phase(Phase::Transmitting);
                self.uart.listen(Event::Txe);
            }
            Phase::Holding
                if self.session.deadline_reached(now) && self.uart.is_transmit_complete() =>
            {
                self.driver_enable.set_low();
                self.session.resume_receiving();
                // Discard whatever the receiver latched while we were driving.
                self.uart.read().ok();
                self.uart.listen(Event::Rxne);
            }
            _ => {}
        }
    }

    fn accept_frame(&mut self, now: Milliseconds) -> Option<Request<'_>> {
        if self.session.phase() != Phase::Receiving {
            return None;
        }

        let size = match self.complete_frame_size() {
            Some(size) => size,
            None => {
                if self.session.received() > 0 && self.session.deadline_reached(now) {
                    debug!("Byte gap expired, abandoning partial frame");
                    self.session.abandon_frame();
                }
                return None;
            }
        };

        if let Err(error) = self.check_envelope(size) {
            warn!("Dropping frame: {:?}", error);
            self.session.abandon_frame();
            return None;
        }

        self.uart.unlisten(Event::Rxne);
        self.session.begin_dispatch();

        // NOTE(Safety): Dispatching phase; the view is released before
        // any reply is composed.
        let frame = unsafe { self.session.frame(size) };
        if crc::is_invalid(&frame[SOURCE_INDEX..], frame[LENGTH_INDEX] as usize - crc::CRC_SIZE) {
            let requester = frame[SOURCE_INDEX];
            let errors = self.session.record_crc_error();
            warn!("Frame checksum invalid ({:?} so far)", errors);
            Reply::start(
                self.session,
                self.config.address,
                requester,
                NACK,
                &self.clock,
                self.config.turnaround_guard,
            )
            .finalize();
            return None;
        }

        Some(Request::new(
            self.session,
            &mut self.link,
            &self.clock,
            self.config.address,
            size,
            self.config.turnaround_guard,
        ))
    }

    /// Total size of the frame in the buffer, once all of it has arrived.
    fn complete_frame_size(&self) -> Option<usize> {
        let received = self.session.received();
        if received <= LENGTH_INDEX {
            return None;
        }
        let size = self.session.byte(LENGTH_INDEX) as usize + 2;
        (received >= size).then(|| size)
    }

    fn check_envelope(&self, size: usize) -> Result<(), Error> {
        if size < MIN_LENGTH + 2 {
            return Err(Error::FrameLengthInvalid);
        }
        if self.session.byte(TARGET_INDEX) != self.config.address {
            return Err(Error::FrameMisaddressed);
        }
        if self.session.byte(size - 1) != END {
            return Err(Error::FrameTerminatorInvalid);
        }
        Ok(())
    }
}
