//! Hardware Abstraction Layer, containing interfaces
//! for low level drivers.
#![macro_use]

pub mod gpio;
pub mod serial;
pub mod time;
pub mod flash;
pub mod interrupt;
pub mod watchdog;

#[cfg(not(target_arch = "arm"))]
#[doc(hidden)]
pub mod doubles;
