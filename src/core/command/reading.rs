//! Typed command results

use bytes::Bytes;
use serde::{Serialize, Serializer};
use std::fmt;

/// Firmware, hardware and protocol versions reported by the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    /// Software version w.x.y.z
    pub software: [u8; 4],
    /// Hardware version w.x
    pub hardware: [u8; 2],
    /// Protocol version w.x
    pub protocol: [u8; 2],
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [sw_w, sw_x, sw_y, sw_z] = self.software;
        let [hw_w, hw_x] = self.hardware;
        let [proto_w, proto_x] = self.protocol;
        write!(
            f,
            "SW Version: {sw_w}.{sw_x}.{sw_y}.{sw_z}, HW Version: {hw_w}.{hw_x}, Protocol: {proto_w}.{proto_x}"
        )
    }
}

/// Sensor identity block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SensorInfo {
    /// Serial name
    pub name: String,
    /// Sensor type/model code
    pub sensor_type: u32,
    /// Calibration date as sent by the device
    pub calibration_date: String,
    /// Manufacturing date as sent by the device
    pub manufacture_date: String,
}

impl fmt::Display for SensorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sensor Name: {}", self.name)?;
        writeln!(f, "Sensor Type: {}", self.sensor_type)?;
        writeln!(f, "Calibration Date: {}", self.calibration_date)?;
        write!(f, "Manufactured Date: {}", self.manufacture_date)
    }
}

/// Combined measurement record
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Answer {
    /// Measurement cycle counter
    pub cycle_count: u32,
    /// Gas concentration
    pub concentration: f32,
    /// Identified gas
    pub gas_id: u32,
    /// Temperature
    pub temperature: f32,
    /// Pressure
    pub pressure: f32,
    /// Relative humidity
    pub rel_humidity: f32,
    /// Absolute humidity
    pub abs_humidity: f32,
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cycle: {}", self.cycle_count)?;
        writeln!(f, "Gas: {}", self.gas_id)?;
        writeln!(f, "Concentration: {:.6}", self.concentration)?;
        writeln!(f, "Temperature: {:.6}", self.temperature)?;
        writeln!(f, "Pressure: {:.6}", self.pressure)?;
        writeln!(f, "Relative Humidity: {:.6}", self.rel_humidity)?;
        write!(f, "Absolute Humidity: {:.6}", self.abs_humidity)
    }
}

/// Decoded result of one command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Reading {
    /// Command acknowledged without data
    Empty,
    /// 32-bit float reading
    Float(f32),
    /// 32-bit unsigned reading
    Integer(u32),
    /// Single byte
    Byte(u8),
    /// Version quad
    Version(VersionInfo),
    /// Identity block
    SensorInfo(SensorInfo),
    /// Combined measurement record
    Answer(Answer),
    /// Engineering data, reassembled
    EngineeringData(#[serde(serialize_with = "serialize_hex")] Bytes),
}

impl Reading {
    /// Float value, if this is a float reading
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer value, if this is an integer or byte reading
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Byte(v) => Some(u32::from(*v)),
            _ => None,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "OK"),
            Self::Float(v) => write!(f, "{v:.6}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Byte(v) => write!(f, "0x{v:x}"),
            Self::Version(v) => v.fmt(f),
            Self::SensorInfo(v) => v.fmt(f),
            Self::Answer(v) => v.fmt(f),
            Self::EngineeringData(data) => write!(f, "{} bytes of engineering data", data.len()),
        }
    }
}

fn serialize_hex<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_display() {
        let version = VersionInfo {
            software: [1, 2, 0, 3],
            hardware: [4, 5],
            protocol: [0, 1],
        };
        assert_eq!(
            version.to_string(),
            "SW Version: 1.2.0.3, HW Version: 4.5, Protocol: 0.1"
        );
    }

    #[test]
    fn test_reading_display() {
        assert_eq!(Reading::Float(21.5).to_string(), "21.500000");
        assert_eq!(Reading::Byte(0x1f).to_string(), "0x1f");
        assert_eq!(Reading::Empty.to_string(), "OK");
    }

    #[test]
    fn test_reading_json() {
        let json = serde_json::to_value(Reading::Integer(7)).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "integer", "value": 7 }));

        let json = serde_json::to_value(Reading::EngineeringData(Bytes::from_static(&[0xde, 0xad]))).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "engineering_data", "value": "dead" }));
    }
}
