//! Board ports. They provide the board specific constants (bus address and
//! timing, memory layout, identity) the generic devices are built from,
//! generated at build time from the board's configuration file.

pub mod wts_rc;
