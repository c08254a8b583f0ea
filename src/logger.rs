//! Logging macros used across the crate.
//!
//! The macros forward to the `log` facade so that binaries and tests decide
//! where output goes (the binaries install `env_logger`).

#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        ::log::trace!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        ::log::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        ::log::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        ::log::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        ::log::error!($($arg)*)
    };
}

/// Installs `env_logger` with `info` as the default level. Safe to call more
/// than once; later calls are ignored.
pub fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
