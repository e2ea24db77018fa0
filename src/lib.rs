//! # Senselink Core Library
//!
//! Host-side client for gas sensors speaking a framed command/response
//! protocol over a UART:
//! - CRC-16 framed requests and replies with status codes
//! - Command registry with typed payload codecs
//! - Single-flight exchange engine with bounded resend
//! - Chunked engineering data download
//! - Virtual sensor with fault injection
//! - CLI with exit codes and JSON output
//!
//! ## Example
//!
//! ```rust,no_run
//! use senselink_core::{Device, SerialChannel, SerialConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let channel = SerialChannel::open(&SerialConfig::new("/dev/ttyUSB0", 38_400))?;
//!     let device = Device::new(channel, 3);
//!
//!     println!("{}", device.version()?);
//!     println!("Temperature: {}", device.temperature()?);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::cli::{CliResult, ExitCodes, OutputFormat};
pub use crate::config::{ConfigError, LinkConfig, LoggingConfig, ProtocolConfig};
pub use crate::core::command::{
    Codec, CommandDescriptor, CommandRegistry, PayloadCodec, Reading, SensorInfo, VersionInfo,
};
pub use crate::core::device::Device;
pub use crate::core::protocol::{EngineStats, ProtocolEngine, ProtocolError, Status};
pub use crate::core::simulator::{Fault, SensorValues, VirtualSensor};
pub use crate::core::transport::{
    ByteChannel, SerialChannel, SerialConfig, SerialFlowControl, SerialParity, TransportError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
