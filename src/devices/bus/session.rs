//! State shared between the UART interrupt handlers and the main loop.
//!
//! The buffer is owned by whoever the current [`Phase`] designates:
//!
//! * `Receiving`: the receive interrupt appends bytes past the cursor;
//!   the main loop only reads bytes below it.
//! * `Dispatching`: the main loop, exclusively. Receive interrupts are
//!   masked and ignored.
//! * `Turnaround`, `Holding`: nobody touches the buffer.
//! * `Transmitting`: the transmit interrupt, read only.
//!
//! Ownership is handed over by storing the phase with `Release` ordering
//! after the last buffer access, and taken by loading it with `Acquire`.
use super::{BusConfig, BUFFER_SIZE, START};
use crate::hal::{
    serial::{self, Event},
    time::Milliseconds,
};
use core::{
    cell::UnsafeCell,
    sync::atomic::{AtomicU16, AtomicU32, AtomicU8, AtomicUsize, Ordering},
};
use nb::block;

/// Position of the session in the request/reply round trip. This is also
/// the state of the bus direction: the line driver is enabled exactly
/// during `Transmitting` and `Holding`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
#[repr(u8)]
pub enum Phase {
    Receiving = 0,
    Dispatching = 1,
    Turnaround = 2,
    Transmitting = 3,
    Holding = 4,
}

impl Phase {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Phase::Dispatching,
            2 => Phase::Turnaround,
            3 => Phase::Transmitting,
            4 => Phase::Holding,
            _ => Phase::Receiving,
        }
    }
}

/// Next byte for the transmit interrupt to shift out.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transmission {
    Byte(u8),
    /// Final byte of the reply. The transmit interrupt should be
    /// disabled once it is handed over.
    Last(u8),
}

pub struct BusSession {
    buffer: UnsafeCell<[u8; BUFFER_SIZE]>,
    phase: AtomicU8,
    rx_cursor: AtomicUsize,
    tx_cursor: AtomicUsize,
    tx_size: AtomicUsize,
    deadline: AtomicU32,
    crc_errors: AtomicU16,
    byte_gap_timeout: Milliseconds,
    transmit_hold: Milliseconds,
}

// NOTE(Safety): Every access to `buffer` is gated by `phase`, which
// gives exclusive write access to at most one context at a time (see
// module documentation). All other fields are atomics.
unsafe impl Sync for BusSession {}

impl BusSession {
    pub const fn new(config: BusConfig) -> Self {
        Self {
            buffer: UnsafeCell::new([0; BUFFER_SIZE]),
            phase: AtomicU8::new(Phase::Receiving as u8),
            rx_cursor: AtomicUsize::new(0),
            tx_cursor: AtomicUsize::new(0),
            tx_size: AtomicUsize::new(0),
            deadline: AtomicU32::new(0),
            crc_errors: AtomicU16::new(0),
            byte_gap_timeout: config.byte_gap_timeout,
            transmit_hold: config.transmit_hold,
        }
    }

    pub fn phase(&self) -> Phase { Phase::from_raw(self.phase.load(Ordering::Acquire)) }

    /// Frames dropped so far because of a checksum mismatch.
    pub fn crc_errors(&self) -> u16 { self.crc_errors.load(Ordering::Relaxed) }

    /// Receive interrupt entry point: one byte arrived at `now`.
    pub fn receive(&self, byte: u8, now: Milliseconds) {
        if self.phase() != Phase::Receiving {
            return;
        }

        let index = self.rx_cursor.load(Ordering::Relaxed);
        if index == 0 && byte != START {
            return;
        }
        if index >= BUFFER_SIZE {
            // Nothing completed a frame in time; look for the next start.
            self.rx_cursor.store(0, Ordering::Release);
            return;
        }

        self.deadline.store((now + self.byte_gap_timeout).0, Ordering::Relaxed);
        // NOTE(Safety): In the receiving phase this handler is the only
        // writer, and only writes at or above the published cursor.
        unsafe { self.write_byte(index, byte) };
        self.rx_cursor.store(index + 1, Ordering::Release);
    }

    /// Transmit interrupt entry point: returns the byte to send, if any.
    pub fn transmit(&self, now: Milliseconds) -> Option<Transmission> {
        if self.phase() != Phase::Transmitting {
            return None;
        }

        let index = self.tx_cursor.load(Ordering::Relaxed);
        let size = self.tx_size.load(Ordering::Relaxed);
        if index >= size {
            return None;
        }

        // NOTE(Safety): Read-only access during the transmitting phase.
        let byte = unsafe { self.read_byte(index) };
        self.tx_cursor.store(index + 1, Ordering::Relaxed);

        if index + 1 < size {
            Some(Transmission::Byte(byte))
        } else {
            self.deadline.store((now + self.transmit_hold).0, Ordering::Relaxed);
            self.set_phase(Phase::Holding);
            Some(Transmission::Last(byte))
        }
    }

    /// Body of the UART receive interrupt handler. Line errors drop the byte.
    pub fn service_receive<R: serial::Read>(&self, rx: &mut R, now: Milliseconds) {
        if let Ok(byte) = rx.read() {
            self.receive(byte, now);
        }
    }

    /// Body of the UART transmit interrupt handler.
    pub fn service_transmit<T: serial::Write + serial::Listen>(&self, tx: &mut T, now: Milliseconds) {
        match self.transmit(now) {
            Some(Transmission::Byte(byte)) => {
                block!(tx.write(byte)).ok();
            }
            Some(Transmission::Last(byte)) => {
                block!(tx.write(byte)).ok();
                tx.unlisten(Event::Txe);
            }
            None => tx.unlisten(Event::Txe),
        }
    }

    pub(super) fn set_phase(&self, phase: Phase) { self.phase.store(phase as u8, Ordering::Release) }

    pub(super) fn received(&self) -> usize { self.rx_cursor.load(Ordering::Acquire) }

    /// Reads a received byte below the receive cursor.
    pub(super) fn byte(&self, index: usize) -> u8 {
        debug_assert!(index < self.received() || self.phase() != Phase::Receiving);
        // NOTE(Safety): Bytes below the published cursor are never
        // written again while receiving.
        unsafe { self.read_byte(index) }
    }

    pub(super) fn deadline_reached(&self, now: Milliseconds) -> bool {
        now.has_reached(Milliseconds(self.deadline.load(Ordering::Relaxed)))
    }

    pub(super) fn abandon_frame(&self) { self.rx_cursor.store(0, Ordering::Release); }

    /// Hands the buffer to the main loop. Receive interrupts must already
    /// be masked.
    pub(super) fn begin_dispatch(&self) {
        self.set_phase(Phase::Dispatching);
        self.rx_cursor.store(0, Ordering::Release);
    }

    /// NOTE(Safety): Only valid during the dispatching phase, and the
    /// slice must be dropped before the buffer is written again.
    pub(super) unsafe fn frame(&self, length: usize) -> &[u8] {
        debug_assert_eq!(self.phase(), Phase::Dispatching);
        &(&*self.buffer.get())[..length]
    }

    /// NOTE(Safety): Only valid during the dispatching phase, with no
    /// other reference into the buffer alive.
    #[allow(clippy::mut_from_ref)]
    pub(super) unsafe fn buffer_mut(&self) -> &mut [u8; BUFFER_SIZE] {
        debug_assert_eq!(self.phase(), Phase::Dispatching);
        &mut *self.buffer.get()
    }

    /// Publishes a composed reply of `size` bytes, to be sent once
    /// `deadline` passes.
    pub(super) fn arm_transmission(&self, size: usize, deadline: Milliseconds) {
        self.tx_size.store(size, Ordering::Relaxed);
        self.tx_cursor.store(0, Ordering::Relaxed);
        self.deadline.store(deadline.0, Ordering::Relaxed);
        self.set_phase(Phase::Turnaround);
    }

    pub(super) fn resume_receiving(&self) {
        self.tx_size.store(0, Ordering::Relaxed);
        self.tx_cursor.store(0, Ordering::Relaxed);
        self.rx_cursor.store(0, Ordering::Relaxed);
        self.set_phase(Phase::Receiving);
    }

    pub(super) fn record_crc_error(&self) -> u16 {
        let errors = self.crc_errors().wrapping_add(1);
        self.crc_errors.store(errors, Ordering::Relaxed);
        errors
    }

    unsafe fn read_byte(&self, index: usize) -> u8 {
        core::ptr::read_volatile(self.buffer.get().cast::<u8>().add(index))
    }

    unsafe fn write_byte(&self, index: usize, byte: u8) {
        core::ptr::write_volatile(self.buffer.get().cast::<u8>().add(index), byte)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hal::{doubles::serial::MockUart, time::U32Ext};

    #[test]
    fn receiver_skips_noise_until_start_marker() {
        // Given
        let session = BusSession::new(BusConfig::default());

        // When
        for byte in [0x00, 0x55, 0x03, START, 0x01].iter() {
            session.receive(*byte, Milliseconds(0));
        }

        // Then
        assert_eq!(session.received(), 2);
        assert_eq!(session.byte(0), START);
        assert_eq!(session.byte(1), 0x01);
    }

    #[test]
    fn receiver_rearms_byte_gap_deadline() {
        let session = BusSession::new(BusConfig::default());

        session.receive(START, Milliseconds(100));
        assert!(!session.deadline_reached(Milliseconds(107)));
        assert!(session.deadline_reached(Milliseconds(108)));

        session.receive(0x01, Milliseconds(105));
        assert!(!session.deadline_reached(Milliseconds(108)));
    }

    #[test]
    fn receiver_resynchronizes_on_buffer_overflow() {
        // Given
        let session = BusSession::new(BusConfig::default());
        session.receive(START, Milliseconds(0));
        (1..BUFFER_SIZE).for_each(|_| session.receive(0xAA, Milliseconds(0)));
        assert_eq!(session.received(), BUFFER_SIZE);

        // When
        session.receive(0xAA, Milliseconds(0));

        // Then
        assert_eq!(session.received(), 0);
    }

    #[test]
    fn receiver_ignores_bytes_outside_receiving_phase() {
        let session = BusSession::new(BusConfig::default());
        session.begin_dispatch();

        session.receive(START, Milliseconds(0));

        assert_eq!(session.received(), 0);
    }

    #[test]
    fn transmitter_shifts_reply_then_holds() {
        // Given
        let session = BusSession::new(BusConfig { transmit_hold: 2.ms(), ..BusConfig::default() });
        session.begin_dispatch();
        unsafe { session.buffer_mut()[..3].copy_from_slice(&[0x0A, 0x0B, 0x0C]) };
        session.arm_transmission(3, Milliseconds(8));
        let mut uart = MockUart::default();

        // When the phase is still turnaround, nothing is sent
        session.service_transmit(&mut uart, Milliseconds(0));
        assert!(uart.take_transmitted().is_empty());

        // When
        session.set_phase(Phase::Transmitting);
        uart.state().tx_listening = true;
        (0..3).for_each(|_| session.service_transmit(&mut uart, Milliseconds(10)));

        // Then
        assert_eq!(uart.take_transmitted(), vec![0x0A, 0x0B, 0x0C]);
        assert!(!uart.is_listening(Event::Txe));
        assert_eq!(session.phase(), Phase::Holding);
        assert!(!session.deadline_reached(Milliseconds(11)));
        assert!(session.deadline_reached(Milliseconds(12)));
    }

    #[test]
    fn crc_error_counter_wraps() {
        let session = BusSession::new(BusConfig::default());
        session.crc_errors.store(u16::MAX, Ordering::Relaxed);
        assert_eq!(session.record_crc_error(), 0);
    }
}
