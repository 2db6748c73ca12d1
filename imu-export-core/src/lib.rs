//! # IMU Export Core
//!
//! Platform-independent half of the inertial-sensor log exporter.
//!
//! This crate turns decoded log packets into fixed-shape, fixed-precision
//! text rows. It has **no filesystem or threading dependencies**: the log
//! file itself is reached only through the [`LogService`] traits, and the
//! produced text is handed back to the caller to write.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  imu-export-core (pure, no I/O)                              │
//! │  ├── service/  LogService / LogSession / LogDevice traits    │
//! │  ├── packet/   decoded sample data                           │
//! │  ├── extract/  Packet ──► ExtractionRecord (NaN fallback)    │
//! │  ├── format/   ExtractionRecord ──► delimited text row       │
//! │  ├── header/   provenance header block                       │
//! │  └── profile/  immutable export configuration                │
//! └──────────────────────────────────────────────────────────────┘
//!                 ▲
//!    ┌────────────┴─────────────┐
//!    │  imu-export              │
//!    │  (exporter, batch, CLI)  │
//!    └──────────────────────────┘
//! ```
//!
//! ## Example: Formatting a Packet
//!
//! ```rust
//! use imu_export_core::{ExtractionRecord, IndexSource, Packet, Precision, RowFormatter};
//!
//! let packet = Packet::new(17);
//! let record = ExtractionRecord::from_packet(0, &packet, IndexSource::Sequential);
//! let row = RowFormatter::new("\t", Precision::Standard).format(&record);
//!
//! assert!(row.starts_with("00000\tnan\t"));
//! assert_eq!(row.trim_end().split('\t').count(), 26);
//! ```

pub mod device;
pub mod error;
pub mod extract;
pub mod format;
pub mod header;
pub mod packet;
pub mod profile;
pub mod service;

// Re-export commonly used types
pub use device::{DeviceId, DeviceRecording};
pub use error::ServiceError;
pub use extract::ExtractionRecord;
pub use format::{RowFormatter, COLUMNS, NAN_TOKEN};
pub use header::ProvenanceHeader;
pub use packet::{CalibratedData, Orientation, Packet};
pub use profile::{ExportProfile, IndexSource, InputFilter, OutputLayout, Precision};
pub use service::{LogDevice, LogService, LogSession};
