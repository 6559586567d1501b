//! Error types for battery bus operations.

use thiserror::Error;

/// Result type alias for battery operations.
pub type Result<T> = std::result::Result<T, ObiError>;

/// Error types for battery communication.
#[derive(Error, Debug)]
pub enum ObiError {
    /// Serial port communication error
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No device pulled the line low after a reset
    #[error("No presence pulse")]
    NoPresence,

    /// A public operation failed; `action` is the message kept as last error
    #[error("{action}: {source}")]
    Operation {
        /// What the operation was trying to do
        action: &'static str,
        /// Underlying cause
        #[source]
        source: Box<ObiError>,
    },
}

impl ObiError {
    pub(crate) fn operation(action: &'static str, source: ObiError) -> Self {
        ObiError::Operation {
            action,
            source: Box::new(source),
        }
    }

    /// The short description of the failed operation, if this is an operation failure.
    pub fn action(&self) -> Option<&'static str> {
        match self {
            ObiError::Operation { action, .. } => Some(*action),
            _ => None,
        }
    }
}
