//! Error types for the rectifier protocol.

use std::io;
use thiserror::Error;

/// Result type alias for rectifier operations.
pub type Result<T> = std::result::Result<T, R48xxError>;

/// Errors that can occur while talking to a rectifier.
///
/// Decoding never fails: malformed or unrecognised frames are ignored or routed
/// to the diagnostic sink. Only transport faults end the receive loop.
#[derive(Debug, Error)]
pub enum R48xxError {
    /// I/O error on the bus socket.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid parameter provided.
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// A frame could not be converted at the transport boundary.
    #[error("Invalid frame: {reason}")]
    InvalidFrame {
        /// Description of the frame error.
        reason: String,
    },

    /// The same identifier appears twice in a dispatch table.
    #[error("Duplicate identifier 0x{id:08X} in dispatch table")]
    DuplicateIdentifier {
        /// The repeated 29-bit identifier.
        id: u32,
    },

    /// No frame arrived within the transport's read timeout.
    #[error("Receive timed out")]
    Timeout,

    /// The transport reported end of stream.
    #[error("Bus transport disconnected")]
    Disconnected,

    /// The command submission channel was closed.
    #[error("Command channel closed")]
    ChannelClosed,
}

impl R48xxError {
    /// Creates a new `InvalidParameter` error.
    ///
    /// # Example
    ///
    /// ```
    /// use r48xx::R48xxError;
    ///
    /// let err = R48xxError::invalid_parameter("voltage", "must be finite");
    /// ```
    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `InvalidFrame` error.
    ///
    /// # Example
    ///
    /// ```
    /// use r48xx::R48xxError;
    ///
    /// let err = R48xxError::invalid_frame("payload longer than 8 bytes");
    /// ```
    pub fn invalid_frame(reason: impl Into<String>) -> Self {
        Self::InvalidFrame {
            reason: reason.into(),
        }
    }

    /// Returns whether this error should terminate the monitor.
    ///
    /// The receive loop logs non-fatal errors and keeps reading.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Disconnected)
    }
}
