//! Water treatment controller board.
//!
//! Board glue constructs the controller from these constants and its own
//! peripherals, and forwards the UART interrupts to [`SESSION`].
use crate::{
    devices::{
        bus::{BusConfig, BusSession},
        dispatcher::Identity,
        image::ImageLayout,
    },
    hal::{flash::Address, time::Milliseconds},
};

include!(concat!(env!("OUT_DIR"), "/wts_rc.rs"));

/// Bus state shared between the UART interrupt handlers and the main loop.
pub static SESSION: BusSession = BusSession::new(BUS_CONFIG);
