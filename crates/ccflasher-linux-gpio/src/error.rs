//! Error types for Linux GPIO debug-wire operations

use thiserror::Error;

/// Linux GPIO debug-wire specific errors
#[derive(Debug, Error)]
pub enum LinuxGpioError {
    /// Failed to request GPIO lines
    #[error("Failed to request GPIO lines: {0}")]
    LineRequestFailed(#[source] gpiocdev::Error),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Missing required parameter
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// GPIO chip or device not specified
    #[error("No GPIO chip specified. Use dev=/dev/gpiochipN or gpiochip=N")]
    NoDevice,

    /// Invalid GPIO line number
    #[error("Invalid GPIO line number for {name}: {value}")]
    InvalidLineNumber { name: &'static str, value: String },

    /// The same line was given for two signals
    #[error("clk, data and rst must be three different GPIO lines")]
    DuplicateLine,
}

/// Result type for Linux GPIO debug-wire operations
pub type Result<T> = std::result::Result<T, LinuxGpioError>;
