#![deny(missing_docs)]
//! Logging for scrapedesk.
//!
//! The engine records the session lifecycle (handshake, connect failures,
//! emitted events, disconnect reasons), PDF uploads and result file writes
//! through the `desk_*` macros. The macros reach `log` through this crate, so
//! callers only depend on `scrapedesk_logging`. The pure core never logs.

use std::fs::File;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

#[doc(hidden)]
pub use log as __log;

/// Default log file, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "./scrapedesk.log";

/// Per-packet detail.
#[macro_export]
macro_rules! desk_trace {
    ($($arg:tt)*) => {
        $crate::__log::trace!($($arg)*)
    };
}

/// Session internals such as emitted events and ignored packets.
#[macro_export]
macro_rules! desk_debug {
    ($($arg:tt)*) => {
        $crate::__log::debug!($($arg)*)
    };
}

/// Lifecycle milestones: session opened or closed, upload started, file written.
#[macro_export]
macro_rules! desk_info {
    ($($arg:tt)*) => {
        $crate::__log::info!($($arg)*)
    };
}

/// Failures the user also sees in the transcript.
#[macro_export]
macro_rules! desk_warn {
    ($($arg:tt)*) => {
        $crate::__log::warn!($($arg)*)
    };
}

/// Failures that should not happen, such as a request that cannot be encoded.
#[macro_export]
macro_rules! desk_error {
    ($($arg:tt)*) => {
        $crate::__log::error!($($arg)*)
    };
}

/// Destination for log output.
///
/// The terminal doubles as the transcript view, so `File` is the usual choice
/// for interactive runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogDestination {
    /// Write to the log file only.
    #[default]
    File,
    /// Write to the terminal (stderr for warnings and errors).
    Terminal,
    /// Write to both file and terminal.
    Both,
}

/// Initialize the global logger.
///
/// `log_file` is only used for `File` and `Both`. A log file that cannot be
/// created is reported on stderr and skipped; the remaining loggers are still
/// installed.
pub fn initialize(destination: LogDestination, level: LevelFilter, log_file: &Path) {
    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match destination {
        LogDestination::File => match create_file_logger(level, config, log_file) {
            Some(file_logger) => vec![file_logger],
            None => return,
        },
        LogDestination::Terminal => vec![TermLogger::new(
            level,
            config,
            TerminalMode::Mixed,
            ColorChoice::Auto,
        )],
        LogDestination::Both => {
            let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
                level,
                config.clone(),
                TerminalMode::Mixed,
                ColorChoice::Auto,
            )];
            if let Some(file_logger) = create_file_logger(level, config, log_file) {
                loggers.push(file_logger);
            }
            loggers
        }
    };

    let _ = CombinedLogger::init(loggers);
}

/// The log file used when no explicit path is configured.
pub fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

/// Sends debug output to the terminal so failing tests show the session
/// trace. Only the first call in a process installs the logger.
pub fn initialize_for_tests() {
    let _ = CombinedLogger::init(vec![TermLogger::new(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(
    level: LevelFilter,
    config: Config,
    log_path: &Path,
) -> Option<Box<WriteLogger<File>>> {
    match File::create(log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("scrapedesk: logging disabled, cannot create {}: {err}", log_path.display());
            None
        }
    }
}
