//! Driver implementations for the core hal traits that do not depend on
//! a particular board.

pub mod systick;

#[cfg(target_arch = "arm")]
pub mod primask;
