//! Complex modules with business logic related to the problem
//! domain, that lay on top of abstract drivers. Devices are
//! generic, while board specifics (pins, memory layout, identity)
//! are handled in the `ports` module.

pub mod bus;
pub mod controller;
pub mod crc;
pub mod dispatcher;
pub mod fail_safe;
pub mod image;
pub mod traits;
pub mod updater;
