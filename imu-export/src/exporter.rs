//! Session exporter: exports every packet of one device in one log file to
//! one text file.
//!
//! # State machine
//!
//! ```text
//! Unopened ──► SessionOpen ──► Loaded ──► Exporting ──► Closed
//!     │             │            │            │
//!     └─────────────┴────────────┴────────────┴──────► Failed
//! ```
//!
//! Each export owns a fresh log service session for its whole duration.
//! The session is closed on every exit path, including failures.

use imu_export_core::{
    DeviceId, DeviceRecording, ExportProfile, ExtractionRecord, LogDevice, LogService,
    LogSession, ProvenanceHeader, RowFormatter, ServiceError,
};
use log::{debug, info};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use crate::error::ExportError;
use crate::VERSION;

/// Lifecycle of one export unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display)]
pub enum ExportState {
    /// No session yet
    #[default]
    Unopened,
    /// Log file opened, device not decoded yet
    SessionOpen,
    /// Device decoded and metadata captured
    Loaded,
    /// Rows being extracted and formatted
    Exporting,
    /// Output written and session closed
    Closed,
    /// Export aborted; session closed
    Failed,
}

impl ExportState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportState::Closed | ExportState::Failed)
    }
}

/// Result of one successful export unit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOutcome {
    pub log_path: PathBuf,
    pub device_id: DeviceId,
    pub destination: PathBuf,
    pub packet_count: usize,
    pub metadata: DeviceRecording,
}

/// Closes the wrapped session when dropped.
struct SessionGuard<S: LogSession>(S);

impl<S: LogSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.0
    }
}

impl<S: LogSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.0
    }
}

impl<S: LogSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Device ids of a log file that produce output: every id after the
/// leading base station.
pub fn exportable_devices<S: LogService>(
    service: &S,
    log_path: &Path,
) -> Result<Vec<DeviceId>, ExportError> {
    let session = service.open(log_path).map_err(|source| ExportError::Open {
        path: log_path.to_path_buf(),
        source,
    })?;
    let session = SessionGuard(session);
    let ids = session.device_ids();
    debug!("{}: devices {:?}", log_path.display(), ids);
    Ok(ids.into_iter().skip(1).collect())
}

/// Metadata and packet count of one exportable device
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummary {
    pub metadata: DeviceRecording,
    pub packet_count: usize,
}

/// Decode every exportable device of a log file without keeping packets,
/// to report what an export would produce.
pub fn inspect_devices<S: LogService>(
    service: &S,
    log_path: &Path,
) -> Result<Vec<DeviceSummary>, ExportError> {
    let session = service.open(log_path).map_err(|source| ExportError::Open {
        path: log_path.to_path_buf(),
        source,
    })?;
    let mut session = SessionGuard(session);

    let mut summaries = Vec::new();
    for id in session.device_ids().into_iter().skip(1) {
        let mut device = session
            .device(&id)
            .ok_or_else(|| ExportError::DeviceAccess {
                path: log_path.to_path_buf(),
                device: id.clone(),
            })?;
        device.set_retain_buffered_data(false);
        device
            .load()
            .and_then(|_| device.wait_for_load_done())
            .map_err(|source| ExportError::Load {
                path: log_path.to_path_buf(),
                device: id.clone(),
                source,
            })?;

        let mut metadata = DeviceRecording::capture(&device);
        metadata.device_id.get_or_insert(id);
        summaries.push(DeviceSummary {
            metadata,
            packet_count: device.packet_count(),
        });
    }
    Ok(summaries)
}

pub struct SessionExporter<'a, S: LogService> {
    service: &'a S,
    profile: &'a ExportProfile,
    formatter: RowFormatter,
    state: ExportState,
}

impl<'a, S: LogService> SessionExporter<'a, S> {
    pub fn new(service: &'a S, profile: &'a ExportProfile) -> Self {
        Self {
            service,
            profile,
            formatter: RowFormatter::from_profile(profile),
            state: ExportState::Unopened,
        }
    }

    /// State reached by the most recent export
    pub fn state(&self) -> ExportState {
        self.state
    }

    /// Export all packets of `device_id` in `log_path` to `destination`,
    /// overwriting it. The parent directory must already exist.
    pub fn export(
        &mut self,
        log_path: &Path,
        device_id: &DeviceId,
        destination: &Path,
    ) -> Result<ExportOutcome, ExportError> {
        self.state = ExportState::Unopened;
        let result = self.run(log_path, device_id, destination);
        if result.is_err() {
            self.state = ExportState::Failed;
        }
        result
    }

    fn run(
        &mut self,
        log_path: &Path,
        device_id: &DeviceId,
        destination: &Path,
    ) -> Result<ExportOutcome, ExportError> {
        let load_error = |source: ServiceError| ExportError::Load {
            path: log_path.to_path_buf(),
            device: device_id.clone(),
            source,
        };

        info!("Exporting {} from {}", device_id, log_path.display());
        let session = self
            .service
            .open(log_path)
            .map_err(|source| ExportError::Open {
                path: log_path.to_path_buf(),
                source,
            })?;
        let mut session = SessionGuard(session);
        self.state = ExportState::SessionOpen;

        let mut device = session
            .device(device_id)
            .ok_or_else(|| ExportError::DeviceAccess {
                path: log_path.to_path_buf(),
                device: device_id.clone(),
            })?;

        device.set_retain_buffered_data(true);
        device.load().map_err(load_error)?;
        device.wait_for_load_done().map_err(load_error)?;

        let mut metadata = DeviceRecording::capture(&device);
        metadata.device_id.get_or_insert_with(|| device_id.clone());
        let packet_count = device.packet_count();
        self.state = ExportState::Loaded;
        debug!("{}: {} packets", device_id, packet_count);

        self.state = ExportState::Exporting;
        let mut body = String::new();
        for index in 0..packet_count {
            let packet = device.packet_at(index).map_err(load_error)?;
            let record = ExtractionRecord::from_packet(index, &packet, self.profile.index_source);
            self.formatter.write_row(&mut body, &record);
        }

        let header = ProvenanceHeader::new(VERSION, &self.service.version(), &metadata);
        write_export(destination, &header, &self.formatter, &body).map_err(|source| {
            ExportError::Write {
                path: log_path.to_path_buf(),
                destination: destination.to_path_buf(),
                source,
            }
        })?;

        session.close();
        self.state = ExportState::Closed;
        info!("Exported {} packets to {}", packet_count, destination.display());

        Ok(ExportOutcome {
            log_path: log_path.to_path_buf(),
            device_id: device_id.clone(),
            destination: destination.to_path_buf(),
            packet_count,
            metadata,
        })
    }
}

fn write_export(
    destination: &Path,
    header: &ProvenanceHeader,
    formatter: &RowFormatter,
    body: &str,
) -> std::io::Result<()> {
    let file = File::create(destination)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(header.render().as_bytes())?;
    writer.write_all(formatter.header_line().as_bytes())?;
    writer.write_all(body.as_bytes())?;
    writer.flush()
}
