//! # Water Treatment Controller Library
//!
//! This crate contains the core of the water treatment controller
//! firmware in library form: the supervisor bus transport, the
//! command dispatcher and the dual-image firmware update engine.
#![cfg_attr(test, allow(unused_imports))]
#![cfg_attr(target_arch = "arm", no_std)]

#[cfg(target_arch = "arm")]
use defmt_rtt as _;
extern crate static_assertions;

#[macro_use]
pub mod utilities {
    pub mod bitwise;
    pub mod guard;
    mod macros;
}

pub mod hal;
pub mod devices;
pub mod drivers;
pub mod ports;
pub mod error;
