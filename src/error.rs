//! # Error Types
//!
//! Custom error types for btdaq using `thiserror`.

use thiserror::Error;

/// Main error type for btdaq
#[derive(Debug, Error)]
pub enum BtdaqError {
    /// Receive deadline exceeded before a reply arrived. Recoverable: the
    /// caller may retry, which consumes a fresh frame id.
    #[error("timed out waiting for device reply")]
    Timeout,

    /// Reply failed frame validation (length, start marker, checksum, or a
    /// correlation field). Carries the reply's status byte when one was
    /// parseable, since that is the only diagnostic the instrument gives.
    #[error("frame integrity error: {reason} (reply status byte: {status:?})")]
    FrameIntegrity {
        reason: String,
        status: Option<u8>,
    },

    /// Well-formed reply reporting a non-success status code.
    #[error("device rejected command: status 0x{status:02X}")]
    DeviceRejected { status: u8 },

    /// Channel or gain index outside the configured table bounds.
    #[error("{kind} index {index} out of range (limit {limit})")]
    Index {
        kind: &'static str,
        index: usize,
        limit: usize,
    },

    /// Payload, value, or memory address bound violated. Rejected before any
    /// transport I/O takes place.
    #[error("{0}")]
    Range(String),

    /// Transport-level errors (port open/configuration failures)
    #[error("transport error: {0}")]
    Transport(String),

    /// No device found at any of the candidate paths
    #[error("no device found at: {0}")]
    DeviceNotFound(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for btdaq
pub type Result<T> = std::result::Result<T, BtdaqError>;
