//! Sensor client
//!
//! [`Device`] joins the command registry to the protocol engine: it encodes
//! the request with the command's codec, runs the exchange with the
//! registry's reply bound and decodes the reply into a [`Reading`].

use crate::core::command::{
    ids, Answer, Codec, CommandDescriptor, CommandRegistry, EngDataChunk, PayloadCodec, Reading,
    SensorInfo, VersionInfo,
};
use crate::core::protocol::{EngineStats, ProtocolEngine, ProtocolError};
use crate::core::transport::ByteChannel;
use bytes::BytesMut;
use tracing::{debug, info};

/// Sensor client over a byte channel
pub struct Device<C> {
    engine: ProtocolEngine<C>,
    registry: CommandRegistry,
    max_engdata_chunks: usize,
}

impl<C: ByteChannel> Device<C> {
    /// Chunk limit for engineering data
    pub const DEFAULT_MAX_ENGDATA_CHUNKS: usize = 128;

    /// Create a client with the standard command table
    pub fn new(channel: C, retries: u32) -> Self {
        Self {
            engine: ProtocolEngine::new(channel, retries),
            registry: CommandRegistry::standard(),
            max_engdata_chunks: Self::DEFAULT_MAX_ENGDATA_CHUNKS,
        }
    }

    /// Use a different command table
    #[must_use]
    pub fn with_registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Limit the number of engineering data chunks accepted
    #[must_use]
    pub fn with_max_engdata_chunks(mut self, limit: usize) -> Self {
        self.max_engdata_chunks = limit;
        self
    }

    /// Command table
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Underlying engine
    pub fn engine(&self) -> &ProtocolEngine<C> {
        &self.engine
    }

    /// Exchange counters
    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }

    /// Release the channel
    pub fn into_channel(self) -> C {
        self.engine.into_channel()
    }

    /// Run one command by identifier
    ///
    /// `input` is the value for write-style commands and must be `None`
    /// for everything else.
    pub fn execute(&self, id: u8, input: Option<u32>) -> Result<Reading, ProtocolError> {
        let descriptor = self.registry.get(id)?;
        let payload = descriptor.codec.encode_request(id, input)?;

        if payload.len() != descriptor.request_size {
            return Err(ProtocolError::InvalidInput {
                command: id,
                reason: format!(
                    "encoded {} bytes, command takes {}",
                    payload.len(),
                    descriptor.request_size
                ),
            });
        }

        debug!("Executing {} (0x{:02x})", descriptor.name, id);

        if descriptor.codec == Codec::EngineeringData {
            return self.read_engineering_data(descriptor, &payload);
        }

        let reply = self.engine.exchange(id, &payload, descriptor.reply_size)?;
        descriptor.codec.decode_reply(id, &reply)
    }

    /// Repeat the request until a chunk carries the final flag
    ///
    /// The session stays locked for the whole transfer so no other exchange
    /// can land between chunks. Chunks are never resent: the device advances
    /// on every request, so a resend would fetch the next chunk and leave a
    /// gap. Any failed chunk fails the whole transfer.
    fn read_engineering_data(&self, descriptor: &CommandDescriptor, request: &[u8]) -> Result<Reading, ProtocolError> {
        let id = descriptor.id;
        let mut session = self.engine.session();
        let mut data = BytesMut::new();

        for index in 0..self.max_engdata_chunks {
            session.send(id, request)?;
            let reply = session.receive(id, descriptor.reply_size)?;
            let chunk = EngDataChunk::decode(id, &reply)?;

            debug!("Engineering data chunk {}: {} bytes", index, chunk.data.len());
            data.extend_from_slice(&chunk.data);

            if chunk.is_final {
                info!("Engineering data complete: {} bytes in {} chunks", data.len(), index + 1);
                return Ok(Reading::EngineeringData(data.freeze()));
            }
        }

        Err(ProtocolError::ChunkLimitExceeded(self.max_engdata_chunks))
    }

    /// Firmware, hardware and protocol versions
    pub fn version(&self) -> Result<VersionInfo, ProtocolError> {
        match self.execute(ids::VERSION, None)? {
            Reading::Version(version) => Ok(version),
            other => Err(unexpected(ids::VERSION, &other)),
        }
    }

    /// Sensor identity block
    pub fn sensor_info(&self) -> Result<SensorInfo, ProtocolError> {
        match self.execute(ids::SENSOR_INFO, None)? {
            Reading::SensorInfo(info) => Ok(info),
            other => Err(unexpected(ids::SENSOR_INFO, &other)),
        }
    }

    /// Combined measurement record
    pub fn answer(&self) -> Result<Answer, ProtocolError> {
        match self.execute(ids::ANSWER, None)? {
            Reading::Answer(answer) => Ok(answer),
            other => Err(unexpected(ids::ANSWER, &other)),
        }
    }

    /// Status byte
    pub fn status(&self) -> Result<u8, ProtocolError> {
        match self.execute(ids::STATUS, None)? {
            Reading::Byte(status) => Ok(status),
            other => Err(unexpected(ids::STATUS, &other)),
        }
    }

    /// Temperature
    pub fn temperature(&self) -> Result<f32, ProtocolError> {
        self.read_f32(ids::TEMPERATURE)
    }

    /// Pressure
    pub fn pressure(&self) -> Result<f32, ProtocolError> {
        self.read_f32(ids::PRESSURE)
    }

    /// Relative humidity
    pub fn rel_humidity(&self) -> Result<f32, ProtocolError> {
        self.read_f32(ids::REL_HUMIDITY)
    }

    /// Absolute humidity
    pub fn abs_humidity(&self) -> Result<f32, ProtocolError> {
        self.read_f32(ids::ABS_HUMIDITY)
    }

    /// Gas concentration
    pub fn concentration(&self) -> Result<f32, ProtocolError> {
        self.read_f32(ids::CONCENTRATION)
    }

    /// Identified gas
    pub fn gas_id(&self) -> Result<u32, ProtocolError> {
        match self.execute(ids::GAS_ID, None)? {
            Reading::Integer(id) => Ok(id),
            other => Err(unexpected(ids::GAS_ID, &other)),
        }
    }

    /// Trigger a measurement
    pub fn trigger_measurement(&self, mode: u8) -> Result<(), ProtocolError> {
        self.execute(ids::MEASURE, Some(u32::from(mode))).map(|_| ())
    }

    /// Shut the sensor down
    pub fn shutdown(&self) -> Result<(), ProtocolError> {
        self.execute(ids::SHUTDOWN, None).map(|_| ())
    }

    /// Full engineering data dump
    pub fn engineering_data(&self) -> Result<bytes::Bytes, ProtocolError> {
        match self.execute(ids::ENGDATA, None)? {
            Reading::EngineeringData(data) => Ok(data),
            other => Err(unexpected(ids::ENGDATA, &other)),
        }
    }

    fn read_f32(&self, id: u8) -> Result<f32, ProtocolError> {
        let reading = self.execute(id, None)?;
        reading.as_f32().ok_or_else(|| unexpected(id, &reading))
    }
}

fn unexpected(command: u8, reading: &Reading) -> ProtocolError {
    ProtocolError::UnexpectedPayload {
        command,
        reason: format!("unexpected reading {reading:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::command::ENGDATA_CHUNK_SIZE;
    use crate::core::protocol::{ReplyHeader, RequestHeader, Status};
    use crate::core::transport::MockByteChannel;
    use bytes::Bytes;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex as StdMutex};

    fn reply(command: u8, payload: &[u8]) -> Vec<u8> {
        ReplyHeader::seal(command, Status::Success, payload)
            .unwrap()
            .frame(payload)
            .to_vec()
    }

    /// Mock channel that plays back `stream` and records every write
    fn scripted(stream: Vec<u8>) -> (MockByteChannel, Arc<StdMutex<Vec<Vec<u8>>>>) {
        let written = Arc::new(StdMutex::new(Vec::new()));
        let log = written.clone();
        let mut incoming: VecDeque<u8> = stream.into();

        let mut mock = MockByteChannel::new();
        mock.expect_write().returning(move |data| {
            log.lock().unwrap().push(data.to_vec());
            Ok(data.len())
        });
        mock.expect_read().returning(move |buf| {
            let n = buf.len().min(incoming.len());
            for (slot, byte) in buf.iter_mut().zip(incoming.drain(..n)) {
                *slot = byte;
            }
            Ok(n)
        });
        (mock, written)
    }

    fn chunk(data: &[u8], is_final: bool) -> Vec<u8> {
        let payload = EngDataChunk {
            data: Bytes::copy_from_slice(data),
            is_final,
        }
        .encode();
        reply(ids::ENGDATA, &payload)
    }

    #[test]
    fn test_version() {
        let (mock, written) = scripted(reply(ids::VERSION, &[1, 2, 0, 3, 4, 5, 0, 1]));
        let device = Device::new(mock, 0);

        let version = device.version().unwrap();
        assert_eq!(version.to_string(), "SW Version: 1.2.0.3, HW Version: 4.5, Protocol: 0.1");

        let sent = written.lock().unwrap();
        let header = RequestHeader::decode(&sent[0]).unwrap();
        assert_eq!(header.command, u16::from(ids::VERSION));
        assert_eq!(header.length, 0);
    }

    #[test]
    fn test_unknown_command_never_reaches_channel() {
        let mut mock = MockByteChannel::new();
        mock.expect_write().never();
        mock.expect_read().never();

        let device = Device::new(mock, 3);
        assert_eq!(device.execute(0x55, None).unwrap_err(), ProtocolError::NoSuchCommand(0x55));
    }

    #[test]
    fn test_invalid_input_never_reaches_channel() {
        let mut mock = MockByteChannel::new();
        mock.expect_write().never();
        mock.expect_read().never();

        let device = Device::new(mock, 0);
        assert!(matches!(
            device.execute(ids::MEASURE, Some(300)),
            Err(ProtocolError::InvalidInput { .. })
        ));
        assert!(matches!(
            device.execute(ids::TEMPERATURE, Some(1)),
            Err(ProtocolError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_trigger_measurement_sends_mode() {
        let (mock, written) = scripted(reply(ids::MEASURE, &[]));
        let device = Device::new(mock, 0);

        device.trigger_measurement(2).unwrap();

        let sent = written.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1], vec![2]);
    }

    #[test]
    fn test_float_reading() {
        let (mock, _) = scripted(reply(ids::TEMPERATURE, &21.5f32.to_le_bytes()));
        let device = Device::new(mock, 0);
        assert_eq!(device.temperature().unwrap(), 21.5);
    }

    #[test]
    fn test_engineering_data_reassembled() {
        let mut stream = chunk(&[0xAA; ENGDATA_CHUNK_SIZE], false);
        stream.extend(chunk(&[0xBB; ENGDATA_CHUNK_SIZE], false));
        stream.extend(chunk(&[0xCC; 10], true));

        let (mock, written) = scripted(stream);
        let device = Device::new(mock, 0);

        let data = device.engineering_data().unwrap();
        assert_eq!(data.len(), 2 * ENGDATA_CHUNK_SIZE + 10);
        assert_eq!(data[0], 0xAA);
        assert_eq!(data[ENGDATA_CHUNK_SIZE], 0xBB);
        assert_eq!(data[2 * ENGDATA_CHUNK_SIZE + 9], 0xCC);

        // Same request issued once per chunk
        let sent = written.lock().unwrap();
        assert_eq!(sent.len(), 3);
        assert!(sent.iter().all(|frame| frame == &sent[0]));
    }

    #[test]
    fn test_engineering_data_chunk_not_resent() {
        let mut bad = chunk(&[0xAA; ENGDATA_CHUNK_SIZE], false);
        let last = bad.len() - 1;
        bad[last] ^= 0x80;
        let mut stream = bad;
        stream.extend(chunk(&[0xBB; ENGDATA_CHUNK_SIZE], false));
        stream.extend(chunk(&[0xCC; 10], true));

        let (mock, written) = scripted(stream);
        let device = Device::new(mock, 3);

        assert!(matches!(
            device.engineering_data(),
            Err(ProtocolError::ChecksumMismatch { .. })
        ));
        assert_eq!(written.lock().unwrap().len(), 1);
        assert_eq!(device.stats().frames_resent, 0);
    }

    #[test]
    fn test_engineering_data_chunk_limit() {
        let mut stream = Vec::new();
        for _ in 0..3 {
            stream.extend(chunk(&[0x11; 4], false));
        }

        let (mock, _) = scripted(stream);
        let device = Device::new(mock, 0).with_max_engdata_chunks(3);

        assert_eq!(device.engineering_data().unwrap_err(), ProtocolError::ChunkLimitExceeded(3));
    }

    #[test]
    fn test_replaced_codec_mismatch() {
        let mut registry = CommandRegistry::standard();
        registry.register(CommandDescriptor::new(ids::TEMPERATURE, "temperature", 0, 4, Codec::Integer));

        let (mock, _) = scripted(reply(ids::TEMPERATURE, &[1, 0, 0, 0]));
        let device = Device::new(mock, 0).with_registry(registry);

        assert!(matches!(
            device.temperature(),
            Err(ProtocolError::UnexpectedPayload { .. })
        ));
    }
}
