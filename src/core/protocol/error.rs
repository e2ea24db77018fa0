//! Protocol error types

use super::status::Status;
use thiserror::Error;

/// Errors produced while exchanging frames with the sensor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The channel accepted fewer bytes than requested
    #[error("Failed to send {part} for command 0x{command:02x}: wrote {written} of {expected} bytes")]
    TransportWrite {
        /// Command being sent
        command: u8,
        /// "header" or "payload"
        part: &'static str,
        /// Bytes requested
        expected: usize,
        /// Bytes accepted by the channel
        written: usize,
    },

    /// The channel delivered fewer bytes than requested (timeout or I/O error)
    #[error("Failed to read reply {part} for command 0x{command:02x}: got {received} of {expected} bytes")]
    TransportRead {
        /// Command awaiting a reply
        command: u8,
        /// "header" or "payload"
        part: &'static str,
        /// Bytes requested
        expected: usize,
        /// Bytes delivered
        received: usize,
    },

    /// Fewer bytes than a header needs
    #[error("Malformed header: need {expected} bytes, got {actual}")]
    MalformedHeader {
        /// Header size
        expected: usize,
        /// Bytes supplied
        actual: usize,
    },

    /// Reply checksum did not match its content
    #[error("Checksum failed: expected 0x{expected:04x}, received 0x{received:04x}")]
    ChecksumMismatch {
        /// Checksum computed on the host
        expected: u16,
        /// Checksum carried by the frame
        received: u16,
    },

    /// Reply belongs to a different command
    #[error("Command mismatch: expected 0x{expected:02x}, received 0x{received:02x}")]
    CommandMismatch {
        /// Command that was sent
        expected: u8,
        /// Command named in the reply
        received: u8,
    },

    /// Reply payload is larger than the caller accepts
    #[error("Buffer too small for payload ({capacity} < {length})")]
    BufferTooSmall {
        /// Caller capacity
        capacity: usize,
        /// Reply payload length
        length: usize,
    },

    /// Device reported a hardware fault
    #[error("Sensor hardware error: 0x{0:02x}")]
    DeviceReported(u8),

    /// Device reported a non-success communication status
    #[error("Command returned error status: {0}")]
    ProtocolStatus(Status),

    /// Command identifier is not in the registry
    #[error("No such command: 0x{0:02x}")]
    NoSuchCommand(u8),

    /// Request payload does not fit in one frame
    #[error("Payload too large: {length} bytes (max {max})")]
    PayloadTooLarge {
        /// Payload length
        length: usize,
        /// Largest accepted payload
        max: usize,
    },

    /// Reply payload does not have the shape the command expects
    #[error("Unexpected payload for command 0x{command:02x}: {reason}")]
    UnexpectedPayload {
        /// Command whose reply was decoded
        command: u8,
        /// What was wrong
        reason: String,
    },

    /// Caller supplied an unusable value for a command
    #[error("Invalid input for command 0x{command:02x}: {reason}")]
    InvalidInput {
        /// Command being encoded
        command: u8,
        /// What was wrong
        reason: String,
    },

    /// Device kept sending chunks without marking one as final
    #[error("Engineering data did not finish within {0} chunks")]
    ChunkLimitExceeded(usize),
}

impl ProtocolError {
    /// Whether the engine may resend the request after this error
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TransportRead { .. } | Self::ChecksumMismatch { .. } | Self::CommandMismatch { .. }
        )
    }

    /// Status byte describing this failure
    ///
    /// Device-reported statuses pass through; anything detected on the host
    /// maps to [`Status::LocalError`].
    pub fn status(&self) -> Status {
        match self {
            Self::DeviceReported(code) => Status::from_u8(*code),
            Self::ProtocolStatus(status) => *status,
            _ => Status::LocalError,
        }
    }
}
