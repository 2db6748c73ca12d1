//! In-memory log service used by unit tests.

use imu_export_core::{
    CalibratedData, DeviceId, LogDevice, LogService, LogSession, Orientation, Packet,
    ServiceError,
};
use nalgebra::{UnitQuaternion, Vector3};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Three packets: calibrated only, orientation only, neither
pub fn mixed_packets() -> Vec<Packet> {
    vec![
        Packet::new(0).with_calibrated(CalibratedData {
            acceleration: Vector3::new(0.1, 0.2, 9.81),
            angular_rate: Vector3::new(0.01, 0.02, 0.03),
            magnetic_field: Vector3::new(0.5, -0.5, 0.25),
        }),
        Packet::new(1).with_orientation(Orientation::from_rotation(
            &UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
        )),
        Packet::new(2),
    ]
}

#[derive(Debug, Clone)]
pub struct MockDevice {
    id: DeviceId,
    packets: Vec<Packet>,
    product_code: Option<String>,
    update_rate: Option<u32>,
    load_error: Option<ServiceError>,
    retain: bool,
    loaded: bool,
}

impl MockDevice {
    pub fn new(id: &str, packets: Vec<Packet>) -> Self {
        Self {
            id: DeviceId::new(id),
            packets,
            product_code: None,
            update_rate: None,
            load_error: None,
            retain: false,
            loaded: false,
        }
    }

    pub fn with_product_code(mut self, code: &str) -> Self {
        self.product_code = Some(code.to_string());
        self
    }

    pub fn with_update_rate(mut self, hz: u32) -> Self {
        self.update_rate = Some(hz);
        self
    }

    pub fn failing_load(mut self, error: ServiceError) -> Self {
        self.load_error = Some(error);
        self
    }
}

impl LogDevice for MockDevice {
    fn set_retain_buffered_data(&mut self, retain: bool) {
        self.retain = retain;
    }

    fn load(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn wait_for_load_done(&mut self) -> Result<(), ServiceError> {
        if let Some(e) = &self.load_error {
            return Err(e.clone());
        }
        self.loaded = true;
        Ok(())
    }

    fn packet_count(&self) -> usize {
        if self.loaded {
            self.packets.len()
        } else {
            0
        }
    }

    fn packet_at(&self, index: usize) -> Result<Packet, ServiceError> {
        if !self.loaded {
            return Err(ServiceError::NotLoaded);
        }
        if !self.retain {
            return Err(ServiceError::NotRetained);
        }
        self.packets
            .get(index)
            .cloned()
            .ok_or(ServiceError::PacketOutOfRange {
                index,
                count: self.packets.len(),
            })
    }

    fn device_id(&self) -> Option<DeviceId> {
        Some(self.id.clone())
    }

    fn product_code(&self) -> Option<String> {
        self.product_code.clone()
    }

    fn firmware_version(&self) -> Option<String> {
        None
    }

    fn hardware_version(&self) -> Option<String> {
        None
    }

    fn filter_profile(&self) -> Option<String> {
        None
    }

    fn option_flags(&self) -> Option<String> {
        None
    }

    fn update_rate(&self) -> Option<u32> {
        self.update_rate
    }
}

/// Log service over a fixed set of in-memory "files", counting sessions
/// that are open at any moment.
#[derive(Debug, Clone, Default)]
pub struct MockLogService {
    files: HashMap<PathBuf, Vec<MockDevice>>,
    open: Arc<AtomicUsize>,
}

impl MockLogService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, devices: Vec<MockDevice>) -> Self {
        self.files.insert(path.as_ref().to_path_buf(), devices);
        self
    }

    /// Sessions opened and not yet closed
    pub fn open_sessions(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

impl LogService for MockLogService {
    type Session = MockSession;

    fn open(&self, path: &Path) -> Result<MockSession, ServiceError> {
        let devices = self
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| ServiceError::Unrecognized(path.display().to_string()))?;
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(MockSession {
            devices,
            open: true,
            counter: self.open.clone(),
        })
    }

    fn version(&self) -> String {
        "mock-1".to_string()
    }
}

#[derive(Debug)]
pub struct MockSession {
    devices: Vec<MockDevice>,
    open: bool,
    counter: Arc<AtomicUsize>,
}

impl LogSession for MockSession {
    type Device = MockDevice;

    fn device_ids(&self) -> Vec<DeviceId> {
        self.devices.iter().map(|d| d.id.clone()).collect()
    }

    fn device(&mut self, id: &DeviceId) -> Option<MockDevice> {
        self.devices.iter().find(|d| &d.id == id).cloned()
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.counter.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
