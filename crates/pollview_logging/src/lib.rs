#![deny(missing_docs)]
//! Shared logging utilities for the pollview workspace.
//!
//! This crate provides the `pv_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every macro logs
//! under the `pollview` target unless an explicit `target:` is given, so the
//! application logger can filter third-party noise (reqwest, tungstenite)
//! separately from our own messages.

/// Log target used by the `pv_*` macros when none is given.
pub const TARGET: &str = "pollview";

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! pv_trace {
    (target: $target:expr, $($arg:tt)*) => {{
        log::trace!(target: $target, $($arg)*);
    }};
    ($($arg:tt)*) => {{
        log::trace!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! pv_debug {
    (target: $target:expr, $($arg:tt)*) => {{
        log::debug!(target: $target, $($arg)*);
    }};
    ($($arg:tt)*) => {{
        log::debug!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! pv_info {
    (target: $target:expr, $($arg:tt)*) => {{
        log::info!(target: $target, $($arg)*);
    }};
    ($($arg:tt)*) => {{
        log::info!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! pv_warn {
    (target: $target:expr, $($arg:tt)*) => {{
        log::warn!(target: $target, $($arg)*);
    }};
    ($($arg:tt)*) => {{
        log::warn!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! pv_error {
    (target: $target:expr, $($arg:tt)*) => {{
        log::error!(target: $target, $($arg)*);
    }};
    ($($arg:tt)*) => {{
        log::error!(target: $crate::TARGET, $($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
