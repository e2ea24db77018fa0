//! Core sensor link functionality
//!
//! This module provides:
//! - Transport layer ([`transport::ByteChannel`] and the serial port)
//! - Wire protocol (checksum, frames, status codes, exchange engine)
//! - Command registry and payload codecs
//! - Sensor client facade
//! - Virtual sensor for testing without hardware

pub mod command;
pub mod device;
pub mod protocol;
pub mod simulator;
pub mod transport;
