//! Sensor wire protocol
//!
//! - Frame checksum (CRC-16, polynomial 0x1021, seed 0xFFFF)
//! - Request/reply header layouts
//! - Reply status codes
//! - Exchange engine with bounded resend

pub mod checksum;
pub mod engine;
pub mod error;
pub mod frame;
pub mod status;

pub use checksum::{checksum, Checksum, CHECKSUM_SEED};
pub use engine::{EngineStats, ProtocolEngine, Session};
pub use error::ProtocolError;
pub use frame::{
    ReplyHeader, RequestHeader, MAX_FRAME_SIZE, MAX_REQUEST_PAYLOAD, REPLY_HEADER_LEN,
    REQUEST_HEADER_LEN,
};
pub use status::{Status, HARDWARE_FAULT_THRESHOLD};
