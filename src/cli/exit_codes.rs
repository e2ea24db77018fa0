//! CLI Exit Codes
//!
//! Standard exit codes for CLI operations and automation.

use crate::config::ConfigError;
use crate::core::protocol::ProtocolError;
use crate::core::transport::TransportError;
use std::process::ExitCode;

/// Exit code constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes;

impl ExitCodes {
    /// Success
    pub const SUCCESS: u8 = 0;

    /// General error
    pub const ERROR: u8 = 1;

    /// Invalid arguments
    pub const INVALID_ARGS: u8 = 2;

    /// Connection failed
    pub const CONNECTION_FAILED: u8 = 3;

    /// Reply did not arrive in time
    pub const TIMEOUT: u8 = 4;

    /// Configuration error
    pub const CONFIG_ERROR: u8 = 8;

    /// Protocol error (checksum, mismatch, status)
    pub const PROTOCOL_ERROR: u8 = 9;

    /// Command not in the registry
    pub const NO_SUCH_COMMAND: u8 = 12;

    /// Sensor reported a hardware fault
    pub const HARDWARE_FAULT: u8 = 13;
}

/// CLI operation result
#[derive(Debug)]
pub enum CliResult {
    /// Success with optional message
    Success(Option<String>),

    /// Error with code and message
    Error(u8, String),
}

impl CliResult {
    /// Plain success
    pub fn success() -> Self {
        Self::Success(None)
    }

    /// Success with a message
    pub fn success_with_message(msg: impl Into<String>) -> Self {
        Self::Success(Some(msg.into()))
    }

    /// Error with an explicit code
    pub fn error(code: u8, msg: impl Into<String>) -> Self {
        Self::Error(code, msg.into())
    }

    /// Connection could not be established
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::Error(ExitCodes::CONNECTION_FAILED, msg.into())
    }

    /// Invalid command line
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::Error(ExitCodes::INVALID_ARGS, msg.into())
    }

    /// Map any error from the library to a result
    ///
    /// Typed library errors anywhere in the chain decide the code; anything
    /// else is a general error.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        for cause in err.chain() {
            if let Some(e) = cause.downcast_ref::<ProtocolError>() {
                return Self::Error(Self::from(e).code(), message);
            }
            if let Some(e) = cause.downcast_ref::<TransportError>() {
                return Self::Error(Self::from(e).code(), message);
            }
            if cause.downcast_ref::<ConfigError>().is_some() {
                return Self::Error(ExitCodes::CONFIG_ERROR, message);
            }
        }
        Self::Error(ExitCodes::ERROR, message)
    }

    /// Get exit code
    pub fn code(&self) -> u8 {
        match self {
            Self::Success(_) => ExitCodes::SUCCESS,
            Self::Error(code, _) => *code,
        }
    }

    /// Get message
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(Some(msg)) | Self::Error(_, msg) => Some(msg),
            Self::Success(None) => None,
        }
    }

    /// Convert to ExitCode
    pub fn to_exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    /// Is success?
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<&ProtocolError> for CliResult {
    fn from(err: &ProtocolError) -> Self {
        let code = match err {
            ProtocolError::TransportRead { .. } => ExitCodes::TIMEOUT,
            ProtocolError::TransportWrite { .. } => ExitCodes::CONNECTION_FAILED,
            ProtocolError::NoSuchCommand(_) => ExitCodes::NO_SUCH_COMMAND,
            ProtocolError::DeviceReported(_) => ExitCodes::HARDWARE_FAULT,
            ProtocolError::InvalidInput { .. } | ProtocolError::PayloadTooLarge { .. } => {
                ExitCodes::INVALID_ARGS
            }
            _ => ExitCodes::PROTOCOL_ERROR,
        };
        Self::Error(code, err.to_string())
    }
}

impl From<&TransportError> for CliResult {
    fn from(err: &TransportError) -> Self {
        let code = match err {
            TransportError::InvalidConfiguration(_) => ExitCodes::CONFIG_ERROR,
            _ => ExitCodes::CONNECTION_FAILED,
        };
        Self::Error(code, err.to_string())
    }
}

/// Exit code description
pub fn exit_code_description(code: u8) -> &'static str {
    match code {
        0 => "Success",
        1 => "General error",
        2 => "Invalid arguments",
        3 => "Connection failed",
        4 => "Timeout waiting for reply",
        8 => "Configuration error",
        9 => "Protocol error",
        12 => "No such command",
        13 => "Sensor hardware fault",
        _ => "Unknown error",
    }
}

/// Print exit code table
pub fn print_exit_codes() {
    println!("Exit Codes:");
    for code in [0, 1, 2, 3, 4, 8, 9, 12, 13] {
        println!("  {:>3}  {}", code, exit_code_description(code));
    }
}
