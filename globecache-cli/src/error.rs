//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use globecache::app::AppError;
use globecache::config::ConfigFileError;
use globecache::coord::CoordError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to load or save the configuration file
    ConfigFile(ConfigFileError),
    /// Bad quadkey or position on the command line
    Coord(CoordError),
    /// Failed to create the async runtime
    Runtime(std::io::Error),
    /// Failed to start the application or fetch blocks
    App(AppError),
    /// A layer failed to load its metadata
    LayersFailed,
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::LayersFailed => {
                eprintln!();
                eprintln!("Check the log file for the failing layer, then verify:");
                eprintln!("  1. The layer's server URL is reachable");
                eprintln!("  2. The dataset name matches a directory on the server");
            }
            CliError::ConfigFile(ConfigFileError::ReadError(_)) => {
                eprintln!();
                eprintln!("Regenerate a default file with: globecache config init --force");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Coord(e) => write!(f, "{}", e),
            CliError::Runtime(e) => write!(f, "Failed to create runtime: {}", e),
            CliError::App(e) => write!(f, "{}", e),
            CliError::LayersFailed => write!(f, "One or more layers failed to load"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Coord(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::App(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::Coord(e)
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::App(e)
    }
}
