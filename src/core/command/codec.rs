//! Payload codecs
//!
//! Each command family has one codec variant. A codec turns the caller's
//! input into the request payload and the verified reply payload into a
//! [`Reading`]. Payloads are little-endian like the frame headers.

use super::reading::{Answer, Reading, SensorInfo, VersionInfo};
use crate::core::protocol::ProtocolError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::Serialize;

/// Version reply size
pub const VERSION_LEN: usize = 8;

/// Identity block size: name[32], type u32, calibration date[16], manufacture date[16]
pub const SENSOR_INFO_LEN: usize = 32 + 4 + 16 + 16;

/// Combined measurement record size
pub const ANSWER_LEN: usize = 7 * 4;

/// Largest amount of engineering data in one chunk
pub const ENGDATA_CHUNK_SIZE: usize = 512;

/// Chunk word flag marking the last chunk
pub const ENGDATA_FINAL_CHUNK: u32 = 0x8000;

const ENGDATA_COUNT_MASK: u32 = 0x7FFF;

/// Engineering data reply size: chunk word followed by one chunk
pub const ENGDATA_REPLY_LEN: usize = 4 + ENGDATA_CHUNK_SIZE;

/// Encode/decode capability of a command
pub trait PayloadCodec {
    /// Build the request payload from the caller's value
    fn encode_request(&self, command: u8, input: Option<u32>) -> Result<Bytes, ProtocolError>;

    /// Interpret a verified reply payload
    fn decode_reply(&self, command: u8, payload: &[u8]) -> Result<Reading, ProtocolError>;
}

/// Payload shape of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Codec {
    /// No payload in either direction
    Command,
    /// Reply is an f32
    Float,
    /// Reply is a u32
    Integer,
    /// Reply is one byte
    Byte,
    /// Reply is a [`VersionInfo`]
    Version,
    /// Reply is a [`SensorInfo`]
    SensorInfo,
    /// Reply is an [`Answer`]
    Answer,
    /// Reply is one engineering data chunk
    EngineeringData,
    /// Request carries one byte
    WriteByte,
    /// Request carries hundredths as an f32
    WriteScaled,
}

impl Codec {
    /// Get name of codec
    pub fn name(&self) -> &'static str {
        match self {
            Codec::Command => "Command",
            Codec::Float => "Read Float",
            Codec::Integer => "Read Integer",
            Codec::Byte => "Read Byte",
            Codec::Version => "Read Version",
            Codec::SensorInfo => "Read Sensor Info",
            Codec::Answer => "Read Answer",
            Codec::EngineeringData => "Read Engineering Data",
            Codec::WriteByte => "Write Byte",
            Codec::WriteScaled => "Write Scaled",
        }
    }

    /// Whether the request carries a caller value
    pub fn takes_input(&self) -> bool {
        matches!(self, Codec::WriteByte | Codec::WriteScaled)
    }
}

impl PayloadCodec for Codec {
    fn encode_request(&self, command: u8, input: Option<u32>) -> Result<Bytes, ProtocolError> {
        match (self, input) {
            (Codec::WriteByte, Some(value)) => {
                let byte = u8::try_from(value).map_err(|_| ProtocolError::InvalidInput {
                    command,
                    reason: format!("{value} does not fit in one byte"),
                })?;
                Ok(Bytes::copy_from_slice(&[byte]))
            }
            (Codec::WriteScaled, Some(value)) => {
                // Fixed-point hundredths
                let scaled = value as f32 / 100.0;
                Ok(Bytes::copy_from_slice(&scaled.to_le_bytes()))
            }
            (Codec::WriteByte | Codec::WriteScaled, None) => Err(ProtocolError::InvalidInput {
                command,
                reason: "a value is required".to_string(),
            }),
            (_, Some(value)) => Err(ProtocolError::InvalidInput {
                command,
                reason: format!("command takes no value (got {value})"),
            }),
            (_, None) => Ok(Bytes::new()),
        }
    }

    fn decode_reply(&self, command: u8, payload: &[u8]) -> Result<Reading, ProtocolError> {
        match self {
            Codec::Command | Codec::WriteByte | Codec::WriteScaled => Ok(Reading::Empty),
            Codec::Float => {
                let mut buf = require(command, payload, 4)?;
                Ok(Reading::Float(buf.get_f32_le()))
            }
            Codec::Integer => {
                let mut buf = require(command, payload, 4)?;
                Ok(Reading::Integer(buf.get_u32_le()))
            }
            Codec::Byte => {
                let mut buf = require(command, payload, 1)?;
                Ok(Reading::Byte(buf.get_u8()))
            }
            Codec::Version => {
                let buf = require(command, payload, VERSION_LEN)?;
                Ok(Reading::Version(VersionInfo {
                    software: [buf[0], buf[1], buf[2], buf[3]],
                    hardware: [buf[4], buf[5]],
                    protocol: [buf[6], buf[7]],
                }))
            }
            Codec::SensorInfo => {
                let mut buf = require(command, payload, SENSOR_INFO_LEN)?;
                let name = c_string(&buf[..32]);
                buf.advance(32);
                let sensor_type = buf.get_u32_le();
                let calibration_date = c_string(&buf[..16]);
                let manufacture_date = c_string(&buf[16..32]);
                Ok(Reading::SensorInfo(SensorInfo {
                    name,
                    sensor_type,
                    calibration_date,
                    manufacture_date,
                }))
            }
            Codec::Answer => {
                let mut buf = require(command, payload, ANSWER_LEN)?;
                Ok(Reading::Answer(Answer {
                    cycle_count: buf.get_u32_le(),
                    concentration: buf.get_f32_le(),
                    gas_id: buf.get_u32_le(),
                    temperature: buf.get_f32_le(),
                    pressure: buf.get_f32_le(),
                    rel_humidity: buf.get_f32_le(),
                    abs_humidity: buf.get_f32_le(),
                }))
            }
            Codec::EngineeringData => {
                let chunk = EngDataChunk::decode(command, payload)?;
                Ok(Reading::EngineeringData(chunk.data))
            }
        }
    }
}

/// One engineering data chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngDataChunk {
    /// Valid bytes carried by this chunk
    pub data: Bytes,
    /// Set on the last chunk
    pub is_final: bool,
}

impl EngDataChunk {
    /// Decode `[word:u32][data]` where bits 0..14 of the word count valid bytes
    pub fn decode(command: u8, payload: &[u8]) -> Result<Self, ProtocolError> {
        let mut buf = require(command, payload, 4)?;
        let word = buf.get_u32_le();
        let count = (word & ENGDATA_COUNT_MASK) as usize;

        if count > ENGDATA_CHUNK_SIZE || count > buf.len() {
            return Err(ProtocolError::UnexpectedPayload {
                command,
                reason: format!("chunk declares {count} bytes but carries {}", buf.len()),
            });
        }

        Ok(Self {
            data: Bytes::copy_from_slice(&buf[..count]),
            is_final: word & ENGDATA_FINAL_CHUNK != 0,
        })
    }

    /// Encode as a full-size reply payload, zero padded
    pub fn encode(&self) -> Bytes {
        let count = self.data.len().min(ENGDATA_CHUNK_SIZE);
        let mut word = count as u32;
        if self.is_final {
            word |= ENGDATA_FINAL_CHUNK;
        }

        let mut out = BytesMut::with_capacity(ENGDATA_REPLY_LEN);
        out.put_u32_le(word);
        out.put_slice(&self.data[..count]);
        out.put_bytes(0, ENGDATA_CHUNK_SIZE - count);
        out.freeze()
    }
}

fn require(command: u8, payload: &[u8], len: usize) -> Result<&[u8], ProtocolError> {
    if payload.len() < len {
        return Err(ProtocolError::UnexpectedPayload {
            command,
            reason: format!("expected {len} bytes, got {}", payload.len()),
        });
    }
    Ok(payload)
}

/// Zero-padded ASCII field to string
fn c_string(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_version() {
        let reading = Codec::Version.decode_reply(0x42, &[1, 2, 0, 3, 4, 5, 0, 1]).unwrap();
        assert_eq!(
            reading,
            Reading::Version(VersionInfo {
                software: [1, 2, 0, 3],
                hardware: [4, 5],
                protocol: [0, 1],
            })
        );
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(
            Codec::Float.decode_reply(0x21, &23.25f32.to_le_bytes()).unwrap(),
            Reading::Float(23.25)
        );
        assert_eq!(
            Codec::Integer.decode_reply(0x04, &0x0102_0304u32.to_le_bytes()).unwrap(),
            Reading::Integer(0x0102_0304)
        );
        assert_eq!(Codec::Byte.decode_reply(0x41, &[0x80]).unwrap(), Reading::Byte(0x80));
    }

    #[test]
    fn test_short_payload_rejected() {
        assert!(matches!(
            Codec::Float.decode_reply(0x21, &[0x00, 0x01]),
            Err(ProtocolError::UnexpectedPayload { command: 0x21, .. })
        ));
        assert!(Codec::Version.decode_reply(0x42, &[1, 2, 3]).is_err());
    }

    #[test]
    fn test_decode_sensor_info() {
        let mut payload = vec![0u8; SENSOR_INFO_LEN];
        payload[..7].copy_from_slice(b"NNTS-01");
        payload[32..36].copy_from_slice(&17u32.to_le_bytes());
        payload[36..46].copy_from_slice(b"2024-03-01");
        payload[52..62].copy_from_slice(b"2023-11-20");

        let Reading::SensorInfo(info) = Codec::SensorInfo.decode_reply(0x43, &payload).unwrap() else {
            panic!("expected sensor info");
        };
        assert_eq!(info.name, "NNTS-01");
        assert_eq!(info.sensor_type, 17);
        assert_eq!(info.calibration_date, "2024-03-01");
        assert_eq!(info.manufacture_date, "2023-11-20");
    }

    #[test]
    fn test_decode_answer() {
        let mut payload = BytesMut::new();
        payload.put_u32_le(42);
        payload.put_f32_le(1.5);
        payload.put_u32_le(3);
        payload.put_f32_le(25.0);
        payload.put_f32_le(101.3);
        payload.put_f32_le(40.0);
        payload.put_f32_le(9.5);

        let Reading::Answer(answer) = Codec::Answer.decode_reply(0x01, &payload).unwrap() else {
            panic!("expected answer");
        };
        assert_eq!(answer.cycle_count, 42);
        assert_eq!(answer.gas_id, 3);
        assert_eq!(answer.concentration, 1.5);
        assert_eq!(answer.abs_humidity, 9.5);
    }

    #[test]
    fn test_encode_write_byte() {
        assert_eq!(&Codec::WriteByte.encode_request(0x61, Some(7)).unwrap()[..], &[7]);
        assert!(matches!(
            Codec::WriteByte.encode_request(0x61, Some(256)),
            Err(ProtocolError::InvalidInput { .. })
        ));
        assert!(Codec::WriteByte.encode_request(0x61, None).is_err());
    }

    #[test]
    fn test_encode_write_scaled() {
        let payload = Codec::WriteScaled.encode_request(0x70, Some(2550)).unwrap();
        assert_eq!(&payload[..], &25.5f32.to_le_bytes());
    }

    #[test]
    fn test_read_codecs_take_no_value() {
        assert!(Codec::Float.encode_request(0x21, None).unwrap().is_empty());
        assert!(Codec::Command.encode_request(0x62, Some(1)).is_err());
    }

    #[test]
    fn test_engdata_chunk_flags() {
        let chunk = EngDataChunk {
            data: Bytes::from_static(b"abc"),
            is_final: true,
        };
        let encoded = chunk.encode();
        assert_eq!(encoded.len(), ENGDATA_REPLY_LEN);
        assert_eq!(&encoded[..4], &(0x8000u32 | 3).to_le_bytes());
        assert_eq!(EngDataChunk::decode(0x09, &encoded).unwrap(), chunk);

        let partial = EngDataChunk::decode(0x09, &[0x02, 0x00, 0x00, 0x00, 0xAA, 0xBB]).unwrap();
        assert!(!partial.is_final);
        assert_eq!(&partial.data[..], &[0xAA, 0xBB]);
    }

    #[test]
    fn test_engdata_count_checked() {
        assert!(EngDataChunk::decode(0x09, &[0x05, 0x80, 0x00, 0x00, 0x01]).is_err());
        assert!(EngDataChunk::decode(0x09, &[0x01, 0x02]).is_err());
    }
}
