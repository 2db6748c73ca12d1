//! Error types reported by log service implementations

use thiserror::Error;

/// Errors a [`LogService`](crate::service::LogService) can report while
/// opening, decoding or reading back a log file.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// File is not a log file this service understands
    #[error("Unrecognized log file: {0}")]
    Unrecognized(String),

    /// Underlying read failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Decoding started but reported a failure
    #[error("Decoding failed: {0}")]
    DecodeFailed(String),

    /// Decoding ended without ever signalling completion
    #[error("Decoding did not complete")]
    DecodeInterrupted,

    /// Packets were requested before the device was loaded
    #[error("Device is not loaded")]
    NotLoaded,

    /// Packet index past the end of the decoded data
    #[error("Packet index {index} out of range (count {count})")]
    PacketOutOfRange { index: usize, count: usize },

    /// Buffered data was not retained during decoding
    #[error("Packet data was not retained during load")]
    NotRetained,
}

impl From<std::io::Error> for ServiceError {
    fn from(e: std::io::Error) -> Self {
        ServiceError::Io(e.to_string())
    }
}
