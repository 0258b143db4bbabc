//! Test doubles for the hardware abstraction layer, used by the unit tests
//! running on the host.
pub mod flash;
pub mod gpio;
pub mod interrupt;
pub mod plant;
pub mod serial;
pub mod time;
pub mod watchdog;
