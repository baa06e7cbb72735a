//! CLI error types.
//!
//! Maps core and config errors into user-facing messages with exit
//! codes for scripting.

use thiserror::Error;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("could not reach the bridge at {host}:{port}")]
    Connection { host: String, port: u16 },

    #[error("timed out waiting for {what}")]
    Timeout { what: String },

    #[error("invalid value for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("{what} not found")]
    NotFound { what: String },

    #[error(transparent)]
    Config(#[from] groundlink_config::ConfigError),

    #[error(transparent)]
    Core(#[from] groundlink_core::CoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Connection { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            _ => exit_code::GENERAL,
        }
    }
}
