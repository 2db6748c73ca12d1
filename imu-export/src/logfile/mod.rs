//! IMU log container files.
//!
//! This module provides:
//! - The `.iml` (IMU Log) binary container, written by [`ImlWriter`] and
//!   read by [`ImlReader`]
//! - [`FileLogService`], a log service implementation over those files
//!
//! ## File Format
//!
//! ```text
//! ┌──────────────────────────┐
//! │ Header (256 bytes)       │  magic "IML1", version, device count, offsets
//! ├──────────────────────────┤
//! │ Device table (JSON)      │  array of device descriptors, base station first
//! ├──────────────────────────┤
//! │ Packet 0                 │  slot, capability flags, counter, f64 values
//! │ Packet 1                 │
//! │ ...                      │
//! ├──────────────────────────┤
//! │ Footer (32 bytes)        │  magic "IMLF", packet count, end offset
//! └──────────────────────────┘
//! ```
//!
//! All integers and floats are little-endian.

pub mod file_format;
pub mod service;

pub use file_format::{DeviceEntry, ImlFooter, ImlHeader, ImlReader, ImlWriter, PacketFlags};
pub use service::{FileDevice, FileLogService, FileSession};
