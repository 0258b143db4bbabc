use super::{
    session::BusSession, transport::LinkMonitor, Frame, ACK, COMMAND_INDEX, END, LENGTH_INDEX,
    MAX_PAYLOAD, NACK, PAYLOAD_INDEX, SOURCE_INDEX, START, TARGET_INDEX,
};
use crate::{
    devices::crc,
    hal::time::{Milliseconds, Now},
};

/// A validated frame waiting for its answer.
///
/// The frame lives in the shared buffer, which the reply is composed into,
/// so answering consumes the request. A request dropped without an answer
/// is answered with a bare `NACK`, since no frame may go unanswered.
pub struct Request<'a> {
    session: &'a BusSession,
    link: &'a mut LinkMonitor,
    address: u8,
    requester: u8,
    size: usize,
    clock: &'a dyn Now,
    guard: Milliseconds,
    now: Milliseconds,
    answered: bool,
}

impl<'a> Request<'a> {
    pub(super) fn new(
        session: &'a BusSession,
        link: &'a mut LinkMonitor,
        clock: &'a dyn Now,
        address: u8,
        size: usize,
        guard: Milliseconds,
    ) -> Self {
        let now = clock.now();
        // NOTE(Safety): Requests only exist during the dispatching phase.
        let requester = unsafe { session.frame(size) }[SOURCE_INDEX];
        Self { session, link, address, requester, size, clock, guard, now, answered: false }
    }

    pub fn frame(&self) -> Frame<'_> {
        // NOTE(Safety): The buffer is not written until the request is
        // consumed, which ends this borrow.
        Frame::new(unsafe { self.session.frame(self.size) })
    }

    /// Checksum failures counted by the transport so far.
    pub fn crc_errors(&self) -> u16 { self.session.crc_errors() }

    /// Starts an `ACK` reply, which also proves the supervisor link alive.
    pub fn ack(mut self) -> Reply<'a> {
        self.link.refresh(self.now);
        self.reply(ACK)
    }

    pub fn nack(mut self) -> Reply<'a> { self.reply(NACK) }

    fn reply(&mut self, status: u8) -> Reply<'a> {
        self.answered = true;
        Reply::start(self.session, self.address, self.requester, status, self.clock, self.guard)
    }
}

impl<'a> Drop for Request<'a> {
    fn drop(&mut self) {
        if !self.answered {
            self.reply(NACK);
        }
    }
}

/// Reply under composition in the shared buffer.
///
/// Payload beyond what a frame can carry is not written; a reply that
/// overflowed goes out as a bare `NACK` instead. Dropping the reply
/// finalizes it.
pub struct Reply<'a> {
    session: &'a BusSession,
    cursor: usize,
    clock: &'a dyn Now,
    guard: Milliseconds,
    overflowed: bool,
    finalized: bool,
}

impl<'a> Reply<'a> {
    const LIMIT: usize = PAYLOAD_INDEX + MAX_PAYLOAD;

    /// Writes the reply header. Only valid during the dispatching phase.
    pub(super) fn start(
        session: &'a BusSession,
        source: u8,
        target: u8,
        status: u8,
        clock: &'a dyn Now,
        guard: Milliseconds,
    ) -> Self {
        // NOTE(Safety): Dispatching phase, and the frame view of any
        // request has been released by consuming the request.
        let buffer = unsafe { session.buffer_mut() };
        buffer[0] = START;
        buffer[SOURCE_INDEX] = source;
        buffer[TARGET_INDEX] = target;
        buffer[COMMAND_INDEX] = status;
        Self { session, cursor: PAYLOAD_INDEX, clock, guard, overflowed: false, finalized: false }
    }

    pub fn push_u8(&mut self, value: u8) -> &mut Self { self.push_bytes(&[value]) }

    pub fn push_u16(&mut self, value: u16) -> &mut Self { self.push_bytes(&value.to_le_bytes()) }

    /// Appends the text followed by a null terminator.
    pub fn push_str(&mut self, text: &str) -> &mut Self {
        self.push_bytes(text.as_bytes()).push_u8(0)
    }

    pub fn push_zeros(&mut self, count: usize) -> &mut Self {
        if self.reserve(count) {
            // NOTE(Safety): Dispatching phase, reply holds the buffer.
            let buffer = unsafe { self.session.buffer_mut() };
            buffer[self.cursor..self.cursor + count].iter_mut().for_each(|b| *b = 0);
            self.cursor += count;
        }
        self
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        if self.reserve(bytes.len()) {
            // NOTE(Safety): Dispatching phase, reply holds the buffer.
            let buffer = unsafe { self.session.buffer_mut() };
            buffer[self.cursor..self.cursor + bytes.len()].copy_from_slice(bytes);
            self.cursor += bytes.len();
        }
        self
    }

    /// Payload bytes written so far.
    pub fn len(&self) -> usize { self.cursor - PAYLOAD_INDEX }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Seals the reply (length, checksum, end marker) and schedules it
    /// for transmission once the turnaround guard, counted from now, has
    /// elapsed. Anything pushed
    /// afterwards is ignored.
    pub fn finalize(&mut self) { self.complete(); }

    fn reserve(&mut self, count: usize) -> bool {
        if self.finalized {
            return false;
        }
        self.overflowed |= self.cursor + count > Self::LIMIT;
        !self.overflowed
    }

    fn complete(&mut self) {
        if self.finalized {
            return;
        }
        self.finalized = true;

        // NOTE(Safety): Dispatching phase, reply holds the buffer.
        let buffer = unsafe { self.session.buffer_mut() };
        if self.overflowed {
            warn!("Reply overflowed, sending NACK instead");
            buffer[COMMAND_INDEX] = NACK;
            self.cursor = PAYLOAD_INDEX;
        }

        buffer[LENGTH_INDEX] = (self.cursor + 1) as u8;
        crc::generate(&mut buffer[SOURCE_INDEX..], self.cursor - SOURCE_INDEX);
        let end = self.cursor + crc::CRC_SIZE;
        buffer[end] = END;
        self.session.arm_transmission(end + 1, self.clock.now() + self.guard);
    }
}

impl<'a> Drop for Reply<'a> {
    fn drop(&mut self) { self.complete(); }
}
