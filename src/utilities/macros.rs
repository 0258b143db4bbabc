//! Convenience macros for the water treatment controller.
//!
//! The only UART on the board is the supervisor bus, so log output goes
//! exclusively through `defmt` on the embedded target. On the host the
//! logging macros evaluate (and discard) their arguments, so tests run
//! without a global logger.
#![macro_use]

/// Logs at `info` level through `defmt` on target.
macro_rules! info {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        #[cfg(target_arch = "arm")]
        defmt::info!($fmt $(, $arg)*);
        $( #[cfg(not(target_arch = "arm"))] let _ = &$arg; )*
    }};
}

/// Logs at `debug` level through `defmt` on target.
#[allow(unused_macros)]
macro_rules! debug {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        #[cfg(target_arch = "arm")]
        defmt::debug!($fmt $(, $arg)*);
        $( #[cfg(not(target_arch = "arm"))] let _ = &$arg; )*
    }};
}

/// Logs at `warn` level through `defmt` on target.
macro_rules! warn {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        #[cfg(target_arch = "arm")]
        defmt::warn!($fmt $(, $arg)*);
        $( #[cfg(not(target_arch = "arm"))] let _ = &$arg; )*
    }};
}

/// Logs at `error` level through `defmt` on target.
macro_rules! error {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        #[cfg(target_arch = "arm")]
        defmt::error!($fmt $(, $arg)*);
        $( #[cfg(not(target_arch = "arm"))] let _ = &$arg; )*
    }};
}
