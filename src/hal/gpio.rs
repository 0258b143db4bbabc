//! # Simple GPIO interface
//!
//! The controller core only drives outputs (the RS-485 driver enable
//! line); inputs are sampled by the process collaborators.

/// Interface to a writable pin.
pub trait OutputPin {
    fn set_low(&mut self);
    fn set_high(&mut self);
}
