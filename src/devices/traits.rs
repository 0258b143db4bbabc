//! Convenience aliases for the hardware the controller core drives.
use crate::hal::serial;
use marker_blanket::marker_blanket;

/// Main loop view of the bus UART: enough to toggle interrupt sources,
/// flush the receiver and wait for the shift register to drain.
#[marker_blanket]
pub trait BusUart: serial::Read + serial::Listen + serial::TransmitStatus {}
