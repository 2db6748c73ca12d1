//! Log service abstraction.
//!
//! Opening, indexing and decoding the binary log format is owned by an
//! external service. These traits describe the subset of that service the
//! exporter consumes, so the same export pipeline can run against any
//! decoder (a vendor library binding, the bundled container reader, or an
//! in-memory fake in tests).
//!
//! # Lifecycle
//!
//! ```text
//! LogService::open(path) ──► LogSession
//!                              ├── device_ids()      first id is the base station
//!                              ├── device(id) ──► LogDevice
//!                              │                   ├── set_retain_buffered_data(true)
//!                              │                   ├── load()              starts decoding
//!                              │                   ├── wait_for_load_done() blocks
//!                              │                   ├── packet_count()
//!                              │                   └── packet_at(i)
//!                              └── close()
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use imu_export_core::service::{LogDevice, LogService, LogSession};
//!
//! fn count_packets<S: LogService>(service: &S, path: &std::path::Path) -> usize {
//!     let mut session = service.open(path).unwrap();
//!     let ids = session.device_ids();
//!     let mut device = session.device(&ids[1]).unwrap();
//!     device.set_retain_buffered_data(true);
//!     device.load().unwrap();
//!     device.wait_for_load_done().unwrap();
//!     let count = device.packet_count();
//!     session.close();
//!     count
//! }
//! ```

use std::path::Path;

use crate::device::DeviceId;
use crate::error::ServiceError;
use crate::packet::Packet;

/// Entry point of a log service implementation.
pub trait LogService {
    type Session: LogSession;

    /// Open a log file. Fails with [`ServiceError::Unrecognized`] or
    /// [`ServiceError::Io`] if the file cannot be opened as a log.
    fn open(&self, path: &Path) -> Result<Self::Session, ServiceError>;

    /// Version string of the decoding library, recorded in export headers.
    fn version(&self) -> String;
}

/// One opened log file.
pub trait LogSession {
    type Device: LogDevice;

    /// Device identifiers in file order. The first entry is always the
    /// base station, which carries no sample data.
    fn device_ids(&self) -> Vec<DeviceId>;

    /// Handle to one device, or `None` if the id is not in this file.
    fn device(&mut self, id: &DeviceId) -> Option<Self::Device>;

    /// Release the session. Safe to call more than once.
    fn close(&mut self);
}

/// One device within an opened log file.
pub trait LogDevice {
    /// Keep decoded packets in memory so they can be read back by index.
    /// Must be set before [`load`](LogDevice::load).
    fn set_retain_buffered_data(&mut self, retain: bool);

    /// Start decoding. Returns once decoding has been scheduled.
    fn load(&mut self) -> Result<(), ServiceError>;

    /// Block until decoding has finished. There is no timeout.
    fn wait_for_load_done(&mut self) -> Result<(), ServiceError>;

    /// Number of decoded packets; zero before loading completes.
    fn packet_count(&self) -> usize;

    /// Packet at a zero-based sequential index.
    fn packet_at(&self, index: usize) -> Result<Packet, ServiceError>;

    fn device_id(&self) -> Option<DeviceId>;
    fn product_code(&self) -> Option<String>;
    fn firmware_version(&self) -> Option<String>;
    fn hardware_version(&self) -> Option<String>;
    fn filter_profile(&self) -> Option<String>;
    fn option_flags(&self) -> Option<String>;
    fn update_rate(&self) -> Option<u32>;
}
