//! Command registry
//!
//! Maps each command identifier to its payload sizes and codec. The
//! registry is consulted before the engine is touched, so an unknown
//! identifier never reaches the wire.

pub mod codec;
pub mod reading;

pub use codec::{
    Codec, EngDataChunk, PayloadCodec, ANSWER_LEN, ENGDATA_CHUNK_SIZE, ENGDATA_FINAL_CHUNK,
    ENGDATA_REPLY_LEN, SENSOR_INFO_LEN, VERSION_LEN,
};
pub use reading::{Answer, Reading, SensorInfo, VersionInfo};

use crate::core::protocol::ProtocolError;
use serde::Serialize;

/// Command identifiers
pub mod ids {
    /// Combined measurement record
    pub const ANSWER: u8 = 0x01;
    /// Gas concentration
    pub const CONCENTRATION: u8 = 0x03;
    /// Identified gas
    pub const GAS_ID: u8 = 0x04;
    /// Engineering data, chunked
    pub const ENGDATA: u8 = 0x09;
    /// Temperature
    pub const TEMPERATURE: u8 = 0x21;
    /// Pressure
    pub const PRESSURE: u8 = 0x22;
    /// Relative humidity
    pub const REL_HUMIDITY: u8 = 0x23;
    /// Absolute humidity
    pub const ABS_HUMIDITY: u8 = 0x24;
    /// Status byte
    pub const STATUS: u8 = 0x41;
    /// Version quad
    pub const VERSION: u8 = 0x42;
    /// Identity block
    pub const SENSOR_INFO: u8 = 0x43;
    /// Trigger a measurement
    pub const MEASURE: u8 = 0x61;
    /// Shut the sensor down
    pub const SHUTDOWN: u8 = 0x62;
}

/// One registry entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandDescriptor {
    /// Wire identifier
    pub id: u8,
    /// Short name used on the command line
    pub name: String,
    /// Human description
    pub description: String,
    /// Request payload size in bytes
    pub request_size: usize,
    /// Largest reply payload accepted
    pub reply_size: usize,
    /// Payload codec
    pub codec: Codec,
}

impl CommandDescriptor {
    /// Create a descriptor
    pub fn new(id: u8, name: &str, request_size: usize, reply_size: usize, codec: Codec) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: String::new(),
            request_size,
            reply_size,
            codec,
        }
    }

    /// Set description
    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

/// Ordered command table
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: Vec<CommandDescriptor>,
}

impl CommandRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every command the sensor understands
    pub fn standard() -> Self {
        let mut registry = Self::new();
        let table = [
            (ids::ANSWER, "answer", 0, ANSWER_LEN, Codec::Answer, "Combined measurement record"),
            (ids::MEASURE, "measure", 1, 0, Codec::WriteByte, "Trigger a measurement"),
            (ids::CONCENTRATION, "concentration", 0, 4, Codec::Float, "Gas concentration"),
            (ids::GAS_ID, "gas-id", 0, 4, Codec::Integer, "Identified gas"),
            (ids::ENGDATA, "engdata", 0, ENGDATA_REPLY_LEN, Codec::EngineeringData, "Engineering data dump"),
            (ids::TEMPERATURE, "temperature", 0, 4, Codec::Float, "Temperature"),
            (ids::PRESSURE, "pressure", 0, 4, Codec::Float, "Pressure"),
            (ids::REL_HUMIDITY, "rel-humidity", 0, 4, Codec::Float, "Relative humidity"),
            (ids::ABS_HUMIDITY, "abs-humidity", 0, 4, Codec::Float, "Absolute humidity"),
            (ids::STATUS, "status", 0, 1, Codec::Byte, "Sensor status byte"),
            (ids::VERSION, "version", 0, VERSION_LEN, Codec::Version, "Firmware and protocol versions"),
            (ids::SENSOR_INFO, "sensor-info", 0, SENSOR_INFO_LEN, Codec::SensorInfo, "Sensor identity"),
            (ids::SHUTDOWN, "shutdown", 0, 0, Codec::Command, "Shut the sensor down"),
        ];

        for (id, name, request, reply, codec, description) in table {
            registry.register(CommandDescriptor::new(id, name, request, reply, codec).with_description(description));
        }
        registry
    }

    /// Add a command, replacing any entry with the same identifier in place
    pub fn register(&mut self, descriptor: CommandDescriptor) {
        match self.commands.iter_mut().find(|c| c.id == descriptor.id) {
            Some(existing) => *existing = descriptor,
            None => self.commands.push(descriptor),
        }
    }

    /// Look up by identifier
    pub fn get(&self, id: u8) -> Result<&CommandDescriptor, ProtocolError> {
        self.commands
            .iter()
            .find(|c| c.id == id)
            .ok_or(ProtocolError::NoSuchCommand(id))
    }

    /// Look up by name (case-insensitive) or by hex identifier such as `0x42`
    pub fn find(&self, key: &str) -> Option<&CommandDescriptor> {
        let key = key.trim();
        if let Some(hex) = key.strip_prefix("0x").or_else(|| key.strip_prefix("0X")) {
            let id = u8::from_str_radix(hex, 16).ok()?;
            return self.get(id).ok();
        }

        let normalized = key.replace('_', "-");
        self.commands
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(&normalized))
    }

    /// Iterate in registration order
    pub fn iter(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.iter()
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
