//! Reply status codes

use std::fmt;

/// Lowest status value the device uses to report a hardware fault
pub const HARDWARE_FAULT_THRESHOLD: u8 = 0x20;

/// Status byte carried in every reply header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Command executed (0x00)
    Success,
    /// Device rejected the request checksum (0x01)
    ChecksumError,
    /// Bad parameter (0x02)
    BadParameter,
    /// Execution failed (0x03)
    ExecutionFailed,
    /// Device out of memory (0x04)
    NoMemory,
    /// Device does not know the command (0x05)
    UnknownCommand,
    /// Sensor hardware fault (0x20 and above, except 0xFF)
    HardwareFault(u8),
    /// Failure detected on the host; never sent by the device (0xFF)
    LocalError,
    /// Any other value
    Unrecognised(u8),
}

impl Status {
    /// Wire value of [`Status::Success`]
    pub const SUCCESS: u8 = 0x00;
    /// Wire value of [`Status::LocalError`]
    pub const LOCAL_ERROR: u8 = 0xFF;

    /// Map a wire byte to a status
    pub fn from_u8(code: u8) -> Self {
        match code {
            0x00 => Status::Success,
            0x01 => Status::ChecksumError,
            0x02 => Status::BadParameter,
            0x03 => Status::ExecutionFailed,
            0x04 => Status::NoMemory,
            0x05 => Status::UnknownCommand,
            0xFF => Status::LocalError,
            c if c >= HARDWARE_FAULT_THRESHOLD => Status::HardwareFault(c),
            c => Status::Unrecognised(c),
        }
    }

    /// Wire byte for this status
    pub fn code(&self) -> u8 {
        match self {
            Status::Success => 0x00,
            Status::ChecksumError => 0x01,
            Status::BadParameter => 0x02,
            Status::ExecutionFailed => 0x03,
            Status::NoMemory => 0x04,
            Status::UnknownCommand => 0x05,
            Status::LocalError => Self::LOCAL_ERROR,
            Status::HardwareFault(c) | Status::Unrecognised(c) => *c,
        }
    }

    /// Get name of status
    pub fn name(&self) -> &'static str {
        match self {
            Status::Success => "Success",
            Status::ChecksumError => "Checksum Error",
            Status::BadParameter => "Bad Parameter",
            Status::ExecutionFailed => "Execution Failed",
            Status::NoMemory => "No Memory",
            Status::UnknownCommand => "Unknown Command",
            Status::HardwareFault(_) => "Hardware Fault",
            Status::LocalError => "Local Error",
            Status::Unrecognised(_) => "Unrecognised Status",
        }
    }

    /// Whether the status is a success
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Success)
    }

    /// Whether the device reported a hardware fault
    pub fn is_hardware_fault(&self) -> bool {
        matches!(self, Status::HardwareFault(_))
    }
}

impl From<u8> for Status {
    fn from(code: u8) -> Self {
        Status::from_u8(code)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02x})", self.name(), self.code())
    }
}
