//! End-to-end exchanges against the virtual sensor

use senselink_core::core::command::{ids, CommandDescriptor, CommandRegistry};
use senselink_core::{Codec, Device, Fault, ProtocolError, Reading, SensorValues, Status, VirtualSensor};
use std::sync::Arc;
use std::thread;

fn device(retries: u32) -> (Device<VirtualSensor>, VirtualSensor) {
    let sensor = VirtualSensor::new();
    (Device::new(sensor.clone(), retries), sensor)
}

#[test]
fn test_version() {
    let (device, sensor) = device(0);
    let version = device.version().unwrap();

    assert_eq!(version.software, [1, 2, 0, 3]);
    assert_eq!(version.hardware, [4, 5]);
    assert_eq!(version.protocol, [0, 1]);
    assert_eq!(sensor.requests(), vec![u16::from(ids::VERSION)]);
}

#[test]
fn test_shutdown() {
    let (device, sensor) = device(0);
    assert_eq!(device.execute(ids::SHUTDOWN, None).unwrap(), Reading::Empty);
    assert!(sensor.is_shut_down());
}

#[test]
fn test_measure_then_answer() {
    let (device, sensor) = device(0);
    device.trigger_measurement(1).unwrap();
    device.trigger_measurement(1).unwrap();

    let answer = device.answer().unwrap();
    assert_eq!(answer.cycle_count, 2);
    assert_eq!(answer.temperature, 23.5);
    assert_eq!(sensor.last_measure_mode(), Some(1));
}

#[test]
fn test_sensor_info() {
    let (device, _) = device(0);
    let info = device.sensor_info().unwrap();
    assert_eq!(info.name, "VSENSE-0001");
    assert_eq!(info.calibration_date, "2024-01-15");
}

#[test]
fn test_reported_values() {
    let mut values = SensorValues::default();
    values.pressure = 99.5;
    values.gas_id = 7;
    values.status = 0x10;
    let device = Device::new(VirtualSensor::with_values(values), 0);

    assert_eq!(device.pressure().unwrap(), 99.5);
    assert_eq!(device.gas_id().unwrap(), 7);
    assert_eq!(device.status().unwrap(), 0x10);
}

#[test]
fn test_buffer_too_small() {
    let mut registry = CommandRegistry::standard();
    registry.register(CommandDescriptor::new(ids::TEMPERATURE, "temperature", 0, 2, Codec::Float));
    let device = Device::new(VirtualSensor::new(), 3).with_registry(registry);

    assert_eq!(
        device.temperature().unwrap_err(),
        ProtocolError::BufferTooSmall { capacity: 2, length: 4 }
    );
}

#[test]
fn test_hardware_fault_not_retried() {
    let (device, sensor) = device(5);
    sensor.inject(Fault::Status { code: 0x21 });

    assert_eq!(device.temperature().unwrap_err(), ProtocolError::DeviceReported(0x21));
    assert_eq!(sensor.request_count(), 1);
    assert_eq!(device.stats().frames_resent, 0);
}

#[test]
fn test_protocol_status_not_retried() {
    let (device, sensor) = device(3);
    sensor.inject(Fault::Status { code: 0x02 });

    assert_eq!(
        device.temperature().unwrap_err(),
        ProtocolError::ProtocolStatus(Status::BadParameter)
    );
    assert_eq!(sensor.request_count(), 1);
}

#[test]
fn test_no_resend_without_retries() {
    let (device, sensor) = device(0);
    sensor.inject(Fault::Drop);

    assert!(matches!(
        device.temperature(),
        Err(ProtocolError::TransportRead { received: 0, .. })
    ));
    assert_eq!(sensor.request_count(), 1);

    // The link is usable again afterwards
    assert_eq!(device.temperature().unwrap(), 23.5);
}

#[test]
fn test_transient_faults_recovered() {
    let (device, sensor) = device(3);
    sensor.inject(Fault::CorruptChecksum);
    sensor.inject(Fault::Truncate);

    assert_eq!(device.temperature().unwrap(), 23.5);
    assert_eq!(sensor.request_count(), 3);

    let stats = device.stats();
    assert_eq!(stats.frames_sent, 1);
    assert_eq!(stats.frames_resent, 2);
    assert_eq!(stats.checksum_failures, 1);
    assert_eq!(stats.receive_failures, 1);
    assert_eq!(stats.replies_received, 1);
}

#[test]
fn test_retries_bounded() {
    let (device, sensor) = device(2);
    sensor.inject_repeated(Fault::Drop, 5);

    assert!(matches!(device.temperature(), Err(ProtocolError::TransportRead { .. })));
    assert_eq!(sensor.request_count(), 3);
}

#[test]
fn test_command_mismatch() {
    let (device, sensor) = device(0);
    sensor.inject(Fault::WrongCommand);

    assert_eq!(
        device.temperature().unwrap_err(),
        ProtocolError::CommandMismatch {
            expected: ids::TEMPERATURE,
            received: ids::TEMPERATURE + 1,
        }
    );
}

#[test]
fn test_engineering_data_three_chunks() {
    let (device, sensor) = device(0);
    let data = device.engineering_data().unwrap();

    assert_eq!(data.len(), 1200);
    assert_eq!(&data[..], &SensorValues::default().engdata[..]);
    assert_eq!(sensor.request_count(), 3);
}

#[test]
fn test_engineering_data_corrupt_chunk_fails_transfer() {
    let sensor = VirtualSensor::new();
    sensor.inject(Fault::CorruptPayload);
    let device = Device::new(sensor.clone(), 1);

    // Never a short success: the damaged first chunk fails the transfer
    assert!(matches!(
        device.engineering_data(),
        Err(ProtocolError::ChecksumMismatch { .. })
    ));
    assert_eq!(sensor.request_count(), 1);
    assert_eq!(device.stats().frames_resent, 0);
}

#[test]
fn test_engineering_data_chunk_limit() {
    let sensor = VirtualSensor::new();
    sensor.set_never_final(true);
    let device = Device::new(sensor.clone(), 0).with_max_engdata_chunks(5);

    assert_eq!(device.engineering_data().unwrap_err(), ProtocolError::ChunkLimitExceeded(5));
    assert_eq!(sensor.request_count(), 5);
}

#[test]
fn test_unknown_command_not_sent() {
    let (device, sensor) = device(0);
    assert_eq!(device.execute(0x7E, None).unwrap_err(), ProtocolError::NoSuchCommand(0x7E));
    assert_eq!(sensor.request_count(), 0);
}

#[test]
fn test_concurrent_callers_do_not_interleave() {
    let sensor = VirtualSensor::new();
    let device = Arc::new(Device::new(sensor.clone(), 0));

    let handles: Vec<_> = (0..2)
        .map(|n| {
            let device = Arc::clone(&device);
            thread::spawn(move || {
                for _ in 0..100 {
                    if n == 0 {
                        assert_eq!(device.temperature().unwrap(), 23.5);
                    } else {
                        assert_eq!(device.version().unwrap().hardware, [4, 5]);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(sensor.request_count(), 200);
    assert_eq!(device.stats().replies_received, 200);
}
