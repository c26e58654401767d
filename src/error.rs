//! Error types for the pan/tilt rig.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum RigError {
    /// Serial port could not be opened or configured
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing to the link failed or timed out
    #[error("Transport error: {0}")]
    Transport(String),

    /// No reset response arrived in time
    #[error("Reset timed out waiting for INIT response")]
    ResetTimeout,

    /// Reset response did not match `INIT:<h>,<v>`
    #[error("Malformed reset response: {0:?}")]
    MalformedReset(String),

    /// Video source could not be opened
    #[error("Video source error: {0}")]
    Video(String),

    /// External detector call failed
    #[error("Detector error: {0}")]
    Detector(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, RigError>;
