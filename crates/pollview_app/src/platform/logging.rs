//! Logger setup for the `pollview` binary.
//!
//! Terminal output goes to stderr so rendered results on stdout stay clean.
//! The file log is `pollview.log` in the state directory and is appended to.

use std::fs::{File, OpenOptions};
use std::path::Path;

use log::LevelFilter;
use pollview_engine::ensure_state_dir;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

pub const LOG_FILENAME: &str = "pollview.log";

/// Destination for log output.
pub enum LogDestination {
    /// Only `pollview.log` in the state directory.
    File,
    /// Both stderr and the log file.
    Both,
}

pub fn initialize(destination: LogDestination, level: LevelFilter, state_dir: &Path) {
    let config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if matches!(destination, LogDestination::Both) {
        loggers.push(TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }
    if let Some(file_logger) = create_file_logger(level, config, state_dir) {
        loggers.push(file_logger);
    }

    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .add_filter_allow_str(pollview_logging::TARGET)
        .build()
}

fn create_file_logger(
    level: LevelFilter,
    config: Config,
    state_dir: &Path,
) -> Option<Box<WriteLogger<File>>> {
    if let Err(err) = ensure_state_dir(state_dir) {
        eprintln!("Warning: no log file, {}", err);
        return None;
    }
    let log_path = state_dir.join(LOG_FILENAME);
    match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not open log file at {:?}: {}", log_path, err);
            None
        }
    }
}
