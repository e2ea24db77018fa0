//! Transport layer
//!
//! The protocol engine only needs a blocking duplex byte channel. This module
//! defines that seam ([`ByteChannel`]) and the serial port implementation.
//! The in-memory [`VirtualSensor`](crate::core::simulator::VirtualSensor)
//! implements it as well.

mod serial;

pub use serial::{list_ports, SerialChannel, SerialConfig, SerialFlowControl, SerialParity};

use std::io;
use thiserror::Error;

/// Blocking, order-preserving duplex byte stream
///
/// Both operations may transfer fewer bytes than asked for. A short `read`
/// means the channel timeout elapsed before the buffer filled; callers treat
/// it, and any `Err`, as a failed transfer.
#[cfg_attr(test, mockall::automock)]
pub trait ByteChannel {
    /// Write `data`, returning how many bytes were accepted
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Fill `buf` with as many bytes as arrive before the timeout
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<C: ByteChannel + ?Sized> ByteChannel for Box<C> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        (**self).write(data)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }
}

/// Transport error types
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}
