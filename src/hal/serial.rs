//! UART interface, split the way the supervisor bus uses it: the interrupt
//! handlers own the read and write halves, while the main loop only
//! toggles interrupt sources and queries the shift register.
use nb;

/// UART read half
pub trait Read {
    type Error;

    /// Reads a single byte
    fn read(&mut self) -> nb::Result<u8, Self::Error>;
}

/// UART write half
pub trait Write {
    type Error;

    /// Writes a single byte
    fn write(&mut self, byte: u8) -> nb::Result<(), Self::Error>;
}

/// Interrupt sources of a UART.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A byte is waiting in the receive register.
    Rxne,
    /// The transmit register can accept another byte.
    Txe,
}

/// Enables and disables UART interrupt sources.
pub trait Listen {
    fn listen(&mut self, event: Event);
    fn unlisten(&mut self, event: Event);
}

/// Reports whether the last byte has fully left the shift register,
/// which is the earliest point the line driver may be released.
pub trait TransmitStatus {
    fn is_transmit_complete(&self) -> bool;
}
