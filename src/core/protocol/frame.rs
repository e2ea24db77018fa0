//! Request and reply frame layouts
//!
//! ```text
//! Request: [cmd:u16][length:u16][reserved:u16][checksum:u16] + payload
//! Reply:   [cmd:u8][status:u8][length:u16][checksum:u16]     + payload
//! ```
//!
//! All multi-byte fields are little-endian, in headers and payloads alike.
//! The checksum covers the encoded header with its checksum field zeroed,
//! followed by the payload.

use super::checksum::Checksum;
use super::error::ProtocolError;
use super::status::Status;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Size of an encoded request header
pub const REQUEST_HEADER_LEN: usize = 8;

/// Size of an encoded reply header
pub const REPLY_HEADER_LEN: usize = 6;

/// Largest frame (header + payload) either side will build
pub const MAX_FRAME_SIZE: usize = 8 * 1024;

/// Largest request payload that fits in one frame
pub const MAX_REQUEST_PAYLOAD: usize = MAX_FRAME_SIZE - REQUEST_HEADER_LEN;

/// Host-to-device header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestHeader {
    /// Command identifier
    pub command: u16,
    /// Payload length in bytes
    pub length: u16,
    /// Always zero
    pub reserved: u16,
    /// Frame checksum
    pub checksum: u16,
}

impl RequestHeader {
    /// Build a complete header for `command` carrying `payload`
    pub fn seal(command: u8, payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() > MAX_REQUEST_PAYLOAD {
            return Err(ProtocolError::PayloadTooLarge {
                length: payload.len(),
                max: MAX_REQUEST_PAYLOAD,
            });
        }

        let mut header = Self {
            command: u16::from(command),
            // Bounded by MAX_REQUEST_PAYLOAD above
            length: payload.len() as u16,
            reserved: 0,
            checksum: 0,
        };
        header.checksum = header.compute_checksum(payload);
        Ok(header)
    }

    /// Checksum over this header (checksum field zeroed) and `payload`
    pub fn compute_checksum(&self, payload: &[u8]) -> u16 {
        let zeroed = Self { checksum: 0, ..*self };
        Checksum::default().update(&zeroed.encode()).update(payload).finish()
    }

    /// Encode to wire bytes
    pub fn encode(&self) -> [u8; REQUEST_HEADER_LEN] {
        let mut out = [0u8; REQUEST_HEADER_LEN];
        let mut buf = &mut out[..];
        buf.put_u16_le(self.command);
        buf.put_u16_le(self.length);
        buf.put_u16_le(self.reserved);
        buf.put_u16_le(self.checksum);
        out
    }

    /// Decode from wire bytes
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < REQUEST_HEADER_LEN {
            return Err(ProtocolError::MalformedHeader {
                expected: REQUEST_HEADER_LEN,
                actual: data.len(),
            });
        }

        let mut buf = data;
        Ok(Self {
            command: buf.get_u16_le(),
            length: buf.get_u16_le(),
            reserved: buf.get_u16_le(),
            checksum: buf.get_u16_le(),
        })
    }

    /// Header followed by payload, as one buffer
    pub fn frame(&self, payload: &[u8]) -> Bytes {
        let mut out = BytesMut::with_capacity(REQUEST_HEADER_LEN + payload.len());
        out.put_slice(&self.encode());
        out.put_slice(payload);
        out.freeze()
    }
}

/// Device-to-host header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplyHeader {
    /// Command identifier being answered
    pub command: u8,
    /// Raw status byte
    pub status: u8,
    /// Payload length in bytes
    pub length: u16,
    /// Frame checksum
    pub checksum: u16,
}

impl ReplyHeader {
    /// Build a complete reply header, used by device-side code
    pub fn seal(command: u8, status: Status, payload: &[u8]) -> Result<Self, ProtocolError> {
        let length = u16::try_from(payload.len()).map_err(|_| ProtocolError::PayloadTooLarge {
            length: payload.len(),
            max: usize::from(u16::MAX),
        })?;

        let mut header = Self {
            command,
            status: status.code(),
            length,
            checksum: 0,
        };
        header.checksum = header.compute_checksum(payload);
        Ok(header)
    }

    /// Decoded status
    pub fn status(&self) -> Status {
        Status::from_u8(self.status)
    }

    /// Checksum over this header (checksum field zeroed) and `payload`
    pub fn compute_checksum(&self, payload: &[u8]) -> u16 {
        let zeroed = Self { checksum: 0, ..*self };
        Checksum::default().update(&zeroed.encode()).update(payload).finish()
    }

    /// Check the carried checksum against header and payload
    pub fn verify(&self, payload: &[u8]) -> Result<(), ProtocolError> {
        let expected = self.compute_checksum(payload);
        if expected == self.checksum {
            Ok(())
        } else {
            Err(ProtocolError::ChecksumMismatch {
                expected,
                received: self.checksum,
            })
        }
    }

    /// Encode to wire bytes
    pub fn encode(&self) -> [u8; REPLY_HEADER_LEN] {
        let mut out = [0u8; REPLY_HEADER_LEN];
        let mut buf = &mut out[..];
        buf.put_u8(self.command);
        buf.put_u8(self.status);
        buf.put_u16_le(self.length);
        buf.put_u16_le(self.checksum);
        out
    }

    /// Decode from wire bytes
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < REPLY_HEADER_LEN {
            return Err(ProtocolError::MalformedHeader {
                expected: REPLY_HEADER_LEN,
                actual: data.len(),
            });
        }

        let mut buf = data;
        Ok(Self {
            command: buf.get_u8(),
            status: buf.get_u8(),
            length: buf.get_u16_le(),
            checksum: buf.get_u16_le(),
        })
    }

    /// Header followed by payload, as one buffer
    pub fn frame(&self, payload: &[u8]) -> Bytes {
        let mut out = BytesMut::with_capacity(REPLY_HEADER_LEN + payload.len());
        out.put_slice(&self.encode());
        out.put_slice(payload);
        out.freeze()
    }
}
