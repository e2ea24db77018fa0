//! Virtual sensor
//!
//! A [`ByteChannel`] that behaves like a sensor on the far end of the UART:
//! it parses request frames written to it and queues sealed reply frames for
//! the next reads. Faults can be queued to exercise checksum, timeout and
//! status handling without hardware.
//!
//! Clones share one device state, so a test can keep a handle while the
//! channel itself is owned by the engine.

use crate::core::command::{
    ids, Answer, EngDataChunk, SensorInfo, VersionInfo, ENGDATA_CHUNK_SIZE, SENSOR_INFO_LEN,
};
use crate::core::protocol::{ReplyHeader, RequestHeader, Status, REPLY_HEADER_LEN, REQUEST_HEADER_LEN};
use crate::core::transport::ByteChannel;
use bytes::{BufMut, Bytes, BytesMut};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use tracing::{debug, trace};

/// Fault applied to one reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Flip a bit of the reply checksum
    CorruptChecksum,
    /// Flip a bit of the last reply byte
    CorruptPayload,
    /// Send nothing
    Drop,
    /// Send only the first half of the frame
    Truncate,
    /// Reply for a different command identifier
    WrongCommand,
    /// Reply with this status and no payload
    Status {
        /// Status byte
        code: u8,
    },
}

/// Values the virtual sensor reports
#[derive(Debug, Clone, PartialEq)]
pub struct SensorValues {
    /// Version quad
    pub version: VersionInfo,
    /// Identity block
    pub info: SensorInfo,
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
    /// Status byte
    pub status: u8,
    /// Engineering data served in chunks
    pub engdata: Vec<u8>,
}

impl Default for SensorValues {
    fn default() -> Self {
        Self {
            version: VersionInfo {
                software: [1, 2, 0, 3],
                hardware: [4, 5],
                protocol: [0, 1],
            },
            info: SensorInfo {
                name: "VSENSE-0001".to_string(),
                sensor_type: 1,
                calibration_date: "2024-01-15".to_string(),
                manufacture_date: "2023-12-01".to_string(),
            },
            concentration: 0.42,
            gas_id: 3,
            temperature: 23.5,
            pressure: 101.325,
            rel_humidity: 45.0,
            abs_humidity: 9.2,
            status: 0,
            engdata: (0..1200u32).map(|i| (i % 251) as u8).collect(),
        }
    }
}

#[derive(Debug, Default)]
struct SensorState {
    values: SensorValues,
    faults: VecDeque<Fault>,
    never_final: bool,
    rx: BytesMut,
    tx: VecDeque<u8>,
    requests: Vec<u16>,
    engdata_offset: usize,
    cycle_count: u32,
    measure_mode: Option<u8>,
    shut_down: bool,
}

/// Simulated sensor endpoint
#[derive(Debug, Clone, Default)]
pub struct VirtualSensor {
    state: Arc<Mutex<SensorState>>,
}

impl VirtualSensor {
    /// Sensor with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sensor reporting `values`
    pub fn with_values(values: SensorValues) -> Self {
        let sensor = Self::new();
        sensor.state.lock().values = values;
        sensor
    }

    /// Change reported values
    pub fn update<F: FnOnce(&mut SensorValues)>(&self, f: F) {
        f(&mut self.state.lock().values);
    }

    /// Queue a fault for the next reply
    pub fn inject(&self, fault: Fault) {
        self.state.lock().faults.push_back(fault);
    }

    /// Queue the same fault for the next `count` replies
    pub fn inject_repeated(&self, fault: Fault, count: usize) {
        let mut state = self.state.lock();
        for _ in 0..count {
            state.faults.push_back(fault);
        }
    }

    /// Never mark an engineering data chunk as final
    pub fn set_never_final(&self, enabled: bool) {
        self.state.lock().never_final = enabled;
    }

    /// Command identifiers received so far, in order
    pub fn requests(&self) -> Vec<u16> {
        self.state.lock().requests.clone()
    }

    /// Number of complete requests received
    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Measurement cycles triggered
    pub fn cycle_count(&self) -> u32 {
        self.state.lock().cycle_count
    }

    /// Mode byte of the last measurement request
    pub fn last_measure_mode(&self) -> Option<u8> {
        self.state.lock().measure_mode
    }

    /// Whether a shutdown request was received
    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shut_down
    }
}

impl ByteChannel for VirtualSensor {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        state.rx.extend_from_slice(data);
        state.process();
        Ok(data.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        let n = buf.len().min(state.tx.len());
        for (slot, byte) in buf.iter_mut().zip(state.tx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl SensorState {
    /// Handle every complete request sitting in the receive buffer
    fn process(&mut self) {
        while self.rx.len() >= REQUEST_HEADER_LEN {
            let header = match RequestHeader::decode(&self.rx[..REQUEST_HEADER_LEN]) {
                Ok(header) => header,
                Err(_) => return,
            };
            let total = REQUEST_HEADER_LEN + usize::from(header.length);
            if self.rx.len() < total {
                return;
            }

            let frame = self.rx.split_to(total);
            let payload = &frame[REQUEST_HEADER_LEN..];
            trace!("Virtual sensor RX {}", hex::encode(&frame));
            self.requests.push(header.command);

            // Replies carry the low byte of the identifier
            let command = header.command as u8;
            let (status, reply) = if header.compute_checksum(payload) != header.checksum {
                debug!("Virtual sensor: bad request checksum for 0x{:02x}", command);
                (Status::ChecksumError, Bytes::new())
            } else if header.command > 0xFF {
                (Status::UnknownCommand, Bytes::new())
            } else {
                self.handle(command, payload)
            };

            self.queue_reply(command, status, &reply);
        }
    }

    fn handle(&mut self, command: u8, payload: &[u8]) -> (Status, Bytes) {
        let values = &self.values;
        let expects_payload = command == ids::MEASURE;
        if !expects_payload && !payload.is_empty() {
            return (Status::BadParameter, Bytes::new());
        }

        let reply = match command {
            ids::ANSWER => encode_answer(&Answer {
                cycle_count: self.cycle_count,
                concentration: values.concentration,
                gas_id: values.gas_id,
                temperature: values.temperature,
                pressure: values.pressure,
                rel_humidity: values.rel_humidity,
                abs_humidity: values.abs_humidity,
            }),
            ids::CONCENTRATION => Bytes::copy_from_slice(&values.concentration.to_le_bytes()),
            ids::GAS_ID => Bytes::copy_from_slice(&values.gas_id.to_le_bytes()),
            ids::TEMPERATURE => Bytes::copy_from_slice(&values.temperature.to_le_bytes()),
            ids::PRESSURE => Bytes::copy_from_slice(&values.pressure.to_le_bytes()),
            ids::REL_HUMIDITY => Bytes::copy_from_slice(&values.rel_humidity.to_le_bytes()),
            ids::ABS_HUMIDITY => Bytes::copy_from_slice(&values.abs_humidity.to_le_bytes()),
            ids::STATUS => Bytes::copy_from_slice(&[values.status]),
            ids::VERSION => {
                let v = &values.version;
                let mut out = BytesMut::with_capacity(8);
                out.put_slice(&v.software);
                out.put_slice(&v.hardware);
                out.put_slice(&v.protocol);
                out.freeze()
            }
            ids::SENSOR_INFO => encode_sensor_info(&values.info),
            ids::ENGDATA => self.next_chunk(),
            ids::MEASURE => {
                let [mode] = payload else {
                    return (Status::BadParameter, Bytes::new());
                };
                self.measure_mode = Some(*mode);
                self.cycle_count = self.cycle_count.wrapping_add(1);
                Bytes::new()
            }
            ids::SHUTDOWN => {
                self.shut_down = true;
                Bytes::new()
            }
            _ => return (Status::UnknownCommand, Bytes::new()),
        };
        (Status::Success, reply)
    }

    /// Serve the next engineering data chunk, wrapping after the final one
    fn next_chunk(&mut self) -> Bytes {
        let data = &self.values.engdata;
        let start = self.engdata_offset.min(data.len());
        let end = (start + ENGDATA_CHUNK_SIZE).min(data.len());
        let last = end >= data.len();

        let chunk = EngDataChunk {
            data: Bytes::copy_from_slice(&data[start..end]),
            is_final: last && !self.never_final,
        };
        self.engdata_offset = if last { 0 } else { end };
        chunk.encode()
    }

    fn queue_reply(&mut self, command: u8, status: Status, payload: &[u8]) {
        let fault = self.faults.pop_front();

        let (command, status, payload) = match fault {
            Some(Fault::WrongCommand) => (command.wrapping_add(1), status, payload),
            Some(Fault::Status { code }) => (command, Status::from_u8(code), &[][..]),
            _ => (command, status, payload),
        };

        let Ok(header) = ReplyHeader::seal(command, status, payload) else {
            return;
        };
        let mut frame = header.frame(payload).to_vec();

        match fault {
            Some(Fault::CorruptChecksum) => frame[4] ^= 0x01,
            Some(Fault::CorruptPayload) => {
                let last = frame.len() - 1;
                frame[last] ^= 0x80;
            }
            Some(Fault::Drop) => frame.clear(),
            Some(Fault::Truncate) => frame.truncate(frame.len().max(REPLY_HEADER_LEN) / 2),
            _ => {}
        }

        if let Some(fault) = fault {
            debug!("Virtual sensor: {:?} on reply to 0x{:02x}", fault, command);
        }
        trace!("Virtual sensor TX {}", hex::encode(&frame));
        self.tx.extend(frame);
    }
}

fn encode_answer(answer: &Answer) -> Bytes {
    let mut out = BytesMut::with_capacity(28);
    out.put_u32_le(answer.cycle_count);
    out.put_f32_le(answer.concentration);
    out.put_u32_le(answer.gas_id);
    out.put_f32_le(answer.temperature);
    out.put_f32_le(answer.pressure);
    out.put_f32_le(answer.rel_humidity);
    out.put_f32_le(answer.abs_humidity);
    out.freeze()
}

fn encode_sensor_info(info: &SensorInfo) -> Bytes {
    let mut out = BytesMut::with_capacity(SENSOR_INFO_LEN);
    put_padded(&mut out, &info.name, 32);
    out.put_u32_le(info.sensor_type);
    put_padded(&mut out, &info.calibration_date, 16);
    put_padded(&mut out, &info.manufacture_date, 16);
    out.freeze()
}

fn put_padded(out: &mut BytesMut, text: &str, width: usize) {
    let bytes = &text.as_bytes()[..text.len().min(width)];
    out.put_slice(bytes);
    out.put_bytes(0, width - bytes.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::protocol::ProtocolError;

    fn request(command: u8, payload: &[u8]) -> Vec<u8> {
        RequestHeader::seal(command, payload).unwrap().frame(payload).to_vec()
    }

    fn read_all(sensor: &mut VirtualSensor) -> Vec<u8> {
        let mut buf = [0u8; 1024];
        let n = sensor.read(&mut buf).unwrap();
        buf[..n].to_vec()
    }

    #[test]
    fn test_version_reply() {
        let mut sensor = VirtualSensor::new();
        sensor.write(&request(ids::VERSION, &[])).unwrap();

        let reply = read_all(&mut sensor);
        let header = ReplyHeader::decode(&reply).unwrap();
        assert_eq!(header.command, ids::VERSION);
        assert_eq!(header.status, 0);
        assert_eq!(&reply[REPLY_HEADER_LEN..], &[1, 2, 0, 3, 4, 5, 0, 1]);
        header.verify(&reply[REPLY_HEADER_LEN..]).unwrap();
    }

    #[test]
    fn test_split_writes_assembled() {
        let mut sensor = VirtualSensor::new();
        let frame = request(ids::MEASURE, &[1]);
        sensor.write(&frame[..5]).unwrap();
        assert_eq!(sensor.request_count(), 0);
        sensor.write(&frame[5..]).unwrap();

        assert_eq!(sensor.request_count(), 1);
        assert_eq!(sensor.cycle_count(), 1);
        assert_eq!(sensor.last_measure_mode(), Some(1));
    }

    #[test]
    fn test_bad_request_checksum() {
        let mut sensor = VirtualSensor::new();
        let mut frame = request(ids::TEMPERATURE, &[]);
        frame[6] ^= 0xFF;
        sensor.write(&frame).unwrap();

        let reply = read_all(&mut sensor);
        assert_eq!(ReplyHeader::decode(&reply).unwrap().status(), Status::ChecksumError);
    }

    #[test]
    fn test_unknown_command() {
        let mut sensor = VirtualSensor::new();
        sensor.write(&request(0x7E, &[])).unwrap();

        let reply = read_all(&mut sensor);
        assert_eq!(ReplyHeader::decode(&reply).unwrap().status(), Status::UnknownCommand);
    }

    #[test]
    fn test_faults_applied_once() {
        let mut sensor = VirtualSensor::new();
        sensor.inject(Fault::CorruptChecksum);

        sensor.write(&request(ids::STATUS, &[])).unwrap();
        let reply = read_all(&mut sensor);
        let header = ReplyHeader::decode(&reply).unwrap();
        assert!(matches!(
            header.verify(&reply[REPLY_HEADER_LEN..]),
            Err(ProtocolError::ChecksumMismatch { .. })
        ));

        sensor.write(&request(ids::STATUS, &[])).unwrap();
        let reply = read_all(&mut sensor);
        let header = ReplyHeader::decode(&reply).unwrap();
        header.verify(&reply[REPLY_HEADER_LEN..]).unwrap();
    }

    #[test]
    fn test_drop_and_status_faults() {
        let mut sensor = VirtualSensor::new();
        sensor.inject(Fault::Drop);
        sensor.inject(Fault::Status { code: 0x21 });

        sensor.write(&request(ids::TEMPERATURE, &[])).unwrap();
        assert!(read_all(&mut sensor).is_empty());

        sensor.write(&request(ids::TEMPERATURE, &[])).unwrap();
        let reply = read_all(&mut sensor);
        let header = ReplyHeader::decode(&reply).unwrap();
        assert_eq!(header.status, 0x21);
        assert_eq!(header.length, 0);
    }

    #[test]
    fn test_engdata_chunks_wrap() {
        let mut sensor = VirtualSensor::new();
        let mut finals = Vec::new();
        for _ in 0..4 {
            sensor.write(&request(ids::ENGDATA, &[])).unwrap();
            let mut buf = vec![0u8; REPLY_HEADER_LEN + 4 + ENGDATA_CHUNK_SIZE];
            assert_eq!(sensor.read(&mut buf).unwrap(), buf.len());
            let chunk = EngDataChunk::decode(ids::ENGDATA, &buf[REPLY_HEADER_LEN..]).unwrap();
            finals.push((chunk.data.len(), chunk.is_final));
        }
        // 1200 bytes: 512 + 512 + 176, then back to the start
        assert_eq!(finals, vec![(512, false), (512, false), (176, true), (512, false)]);
    }

    #[test]
    fn test_sensor_info_layout() {
        let encoded = encode_sensor_info(&SensorValues::default().info);
        assert_eq!(encoded.len(), SENSOR_INFO_LEN);
        assert_eq!(&encoded[..11], b"VSENSE-0001");
        assert_eq!(encoded[11], 0);
    }
}
