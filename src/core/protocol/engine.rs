//! Request/reply exchange engine
//!
//! One exchange is: send a request frame, read the reply header, read the
//! reply payload, verify checksum, status and command identifier. Transient
//! failures (short reads, checksum or command mismatches) are recovered by
//! resending the cached request, up to the configured retry count.
//!
//! The channel and the retry cache sit behind a single mutex. A [`Session`]
//! holds that lock, so at most one exchange is in flight per engine and a
//! second caller blocks until the first one finishes.

use super::error::ProtocolError;
use super::frame::{ReplyHeader, RequestHeader, REPLY_HEADER_LEN, REQUEST_HEADER_LEN};
use super::status::HARDWARE_FAULT_THRESHOLD;
use crate::core::transport::ByteChannel;
use bytes::{Bytes, BytesMut};
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, error, trace, warn};

/// Exchange counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Requests sent for the first time
    pub frames_sent: u64,
    /// Requests sent again from the retry cache
    pub frames_resent: u64,
    /// Replies that passed every check
    pub replies_received: u64,
    /// Replies rejected by the checksum
    pub checksum_failures: u64,
    /// Receive attempts that failed for any other reason
    pub receive_failures: u64,
}

/// Last request sent, kept for resending
#[derive(Debug, Clone)]
struct RetryCache {
    header: [u8; REQUEST_HEADER_LEN],
    payload: Bytes,
}

struct EngineState<C> {
    channel: C,
    cache: Option<RetryCache>,
    stats: EngineStats,
}

/// Protocol engine over a byte channel
pub struct ProtocolEngine<C> {
    state: Mutex<EngineState<C>>,
    retries: u32,
}

impl<C: ByteChannel> ProtocolEngine<C> {
    /// Create an engine that resends up to `retries` times per exchange
    pub fn new(channel: C, retries: u32) -> Self {
        Self {
            state: Mutex::new(EngineState {
                channel,
                cache: None,
                stats: EngineStats::default(),
            }),
            retries,
        }
    }

    /// Configured retry count
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Take exclusive use of the channel, blocking while another exchange runs
    pub fn session(&self) -> Session<'_, C> {
        Session {
            state: self.state.lock(),
            retries: self.retries,
        }
    }

    /// Send `payload` for `command` and wait for a verified reply
    ///
    /// The reply payload may be at most `max_payload` bytes.
    pub fn exchange(&self, command: u8, payload: &[u8], max_payload: usize) -> Result<Bytes, ProtocolError> {
        let mut session = self.session();
        session.send(command, payload)?;
        session.receive_with_retry(command, max_payload)
    }

    /// Snapshot of the exchange counters
    pub fn stats(&self) -> EngineStats {
        self.state.lock().stats
    }

    /// Release the channel
    pub fn into_channel(self) -> C {
        self.state.into_inner().channel
    }
}

/// Exclusive access to an engine's channel and retry cache
pub struct Session<'a, C> {
    state: MutexGuard<'a, EngineState<C>>,
    retries: u32,
}

impl<C: ByteChannel> Session<'_, C> {
    /// Frame and write one request
    ///
    /// With retries enabled the request is cached for [`Self::receive_with_retry`].
    pub fn send(&mut self, command: u8, payload: &[u8]) -> Result<(), ProtocolError> {
        let header = RequestHeader::seal(command, payload)?;
        let encoded = header.encode();

        debug!(
            "Sending command 0x{:02x}: length {}, checksum 0x{:04x}",
            command, header.length, header.checksum
        );
        trace!("TX header {}", hex::encode(encoded));

        let state = &mut *self.state;
        write_all(&mut state.channel, &encoded, command, "header")?;
        if !payload.is_empty() {
            trace!("TX payload {}", hex::encode(payload));
            write_all(&mut state.channel, payload, command, "payload")?;
        }
        state.stats.frames_sent += 1;

        if self.retries != 0 {
            state.cache = Some(RetryCache {
                header: encoded,
                payload: Bytes::copy_from_slice(payload),
            });
        }
        Ok(())
    }

    /// Read and verify one reply for `command`
    pub fn receive(&mut self, command: u8, max_payload: usize) -> Result<Bytes, ProtocolError> {
        let result = self.receive_frame(command, max_payload);

        let stats = &mut self.state.stats;
        match &result {
            Ok(_) => stats.replies_received += 1,
            Err(ProtocolError::ChecksumMismatch { .. }) => stats.checksum_failures += 1,
            Err(_) => stats.receive_failures += 1,
        }
        result
    }

    /// Receive, resending the cached request after each transient failure
    ///
    /// Stops at the first verified reply, at a non-retryable error, when a
    /// resend cannot be written, or after `retries` resends.
    pub fn receive_with_retry(&mut self, command: u8, max_payload: usize) -> Result<Bytes, ProtocolError> {
        let mut result = self.receive(command, max_payload);
        if self.retries == 0 {
            return result;
        }

        let mut attempt = 0;
        loop {
            let error = match &result {
                Ok(_) => break,
                Err(e) => e,
            };
            if !error.is_retryable() || attempt >= self.retries {
                break;
            }
            if self.state.cache.is_none() {
                debug!("Nothing cached to resend for command 0x{:02x}", command);
                break;
            }

            attempt += 1;
            warn!(
                "Resending command 0x{:02x} (attempt {}/{}): {}",
                command, attempt, self.retries, error
            );
            self.resend(command)?;
            result = self.receive(command, max_payload);
        }
        result
    }

    fn resend(&mut self, command: u8) -> Result<(), ProtocolError> {
        let state = &mut *self.state;
        let Some(cache) = state.cache.as_ref() else {
            return Ok(());
        };

        write_all(&mut state.channel, &cache.header, command, "header")?;
        if !cache.payload.is_empty() {
            write_all(&mut state.channel, &cache.payload, command, "payload")?;
        }
        state.stats.frames_resent += 1;
        Ok(())
    }

    fn receive_frame(&mut self, command: u8, max_payload: usize) -> Result<Bytes, ProtocolError> {
        let channel = &mut self.state.channel;

        let mut raw = [0u8; REPLY_HEADER_LEN];
        read_exact(channel, &mut raw, command, "header")?;
        let header = ReplyHeader::decode(&raw)?;
        trace!("RX header {}", hex::encode(raw));

        let length = usize::from(header.length);
        let mut payload = BytesMut::zeroed(length);
        if length > 0 {
            read_exact(channel, &mut payload, command, "payload")?;
            trace!("RX payload {}", hex::encode(&payload));
        }

        if let Err(e) = header.verify(&payload) {
            warn!("{} ({:?})", e, header);
            return Err(e);
        }

        if header.status != 0 {
            if header.status >= HARDWARE_FAULT_THRESHOLD {
                error!("Sensor hardware error: 0x{:02x}", header.status);
                return Err(ProtocolError::DeviceReported(header.status));
            }
            let status = header.status();
            warn!("Command 0x{:02x} returned error status: {}", command, status);
            return Err(ProtocolError::ProtocolStatus(status));
        }

        if header.command != command {
            warn!(
                "Command mismatch: expected 0x{:02x}, received 0x{:02x}",
                command, header.command
            );
            return Err(ProtocolError::CommandMismatch {
                expected: command,
                received: header.command,
            });
        }

        if length == 0 {
            return Ok(Bytes::new());
        }

        if max_payload < length {
            warn!("Buffer too small for payload ({} < {})", max_payload, length);
            return Err(ProtocolError::BufferTooSmall {
                capacity: max_payload,
                length,
            });
        }

        debug!("Reply to command 0x{:02x}: {} bytes", command, length);
        Ok(payload.freeze())
    }
}

fn write_all<C: ByteChannel>(
    channel: &mut C,
    data: &[u8],
    command: u8,
    part: &'static str,
) -> Result<(), ProtocolError> {
    let written = match channel.write(data) {
        Ok(n) => n,
        Err(e) => {
            warn!("Failed to send {} for command 0x{:02x}: {}", part, command, e);
            0
        }
    };

    if written < data.len() {
        return Err(ProtocolError::TransportWrite {
            command,
            part,
            expected: data.len(),
            written,
        });
    }
    Ok(())
}

fn read_exact<C: ByteChannel>(
    channel: &mut C,
    buf: &mut [u8],
    command: u8,
    part: &'static str,
) -> Result<(), ProtocolError> {
    let received = match channel.read(buf) {
        Ok(n) => n,
        Err(e) => {
            warn!("Failed to get reply {} for command 0x{:02x}: {}", part, command, e);
            0
        }
    };

    if received < buf.len() {
        warn!(
            "Incomplete reply {} for command 0x{:02x}: {} of {} bytes",
            part,
            command,
            received,
            buf.len()
        );
        return Err(ProtocolError::TransportRead {
            command,
            part,
            expected: buf.len(),
            received,
        });
    }
    Ok(())
}
