//! Error types for tvone.

use std::io;
use thiserror::Error;

/// Result type for tvone operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for tvone operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (serial port, file operations).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error.
    #[cfg(feature = "native")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The acknowledgment deadline expired before a full, aligned reply arrived.
    #[error("Timeout: received {received} of {expected} acknowledgment bytes")]
    Timeout {
        /// Number of bytes a complete reply would have carried.
        expected: usize,
        /// Number of bytes actually collected before the deadline.
        received: usize,
    },

    /// A full acknowledgment arrived, but the unit reported an error.
    #[error("Device rejected the command (status byte {status:#04x})")]
    DeviceError {
        /// The raw status byte from the acknowledgment.
        status: u8,
    },

    /// A write was accepted, but the unit echoed a different payload.
    #[error("Payload mismatch: requested {requested}, unit holds {echoed}")]
    PayloadMismatch {
        /// The payload the caller asked to set.
        requested: i32,
        /// The payload the unit reported holding.
        echoed: i32,
    },

    /// A bulk-transfer chunk reply did not match the fixed accept pattern.
    #[error("Upload ack mismatch at chunk {chunk}")]
    UploadAckMismatch {
        /// Zero-based index of the rejected chunk.
        chunk: usize,
    },

    /// Protocol error (malformed acknowledgment content).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Upload source rejected before transfer (wrong size for the target slot).
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// The operation was aborted via the cancellation token.
    #[error("Cancelled")]
    Cancelled,
}
