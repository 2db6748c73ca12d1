//! Error types for exporting and configuration

use imu_export_core::{DeviceId, ServiceError};
use std::path::PathBuf;
use thiserror::Error;

/// Failure of one export unit (one device of one log file), or of the
/// output root.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Log file could not be opened or recognized
    #[error("Cannot open log file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: ServiceError,
    },

    /// Decoding did not complete or a decoded packet could not be read back
    #[error("Cannot load device {device} from {path}: {source}")]
    Load {
        path: PathBuf,
        device: DeviceId,
        #[source]
        source: ServiceError,
    },

    /// Expected device is absent from the log file
    #[error("Device {device} not accessible in {path}")]
    DeviceAccess { path: PathBuf, device: DeviceId },

    /// Destination could not be created or written
    #[error("Cannot write {destination}: {source}")]
    Write {
        path: PathBuf,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output directory could not be created
    #[error("Cannot create output directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    /// Log file (or directory) the error is about
    pub fn path(&self) -> &PathBuf {
        match self {
            ExportError::Open { path, .. }
            | ExportError::Load { path, .. }
            | ExportError::DeviceAccess { path, .. }
            | ExportError::Write { path, .. }
            | ExportError::Directory { path, .. } => path,
        }
    }

    /// Short class name, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            ExportError::Open { .. } => "open",
            ExportError::Load { .. } => "load",
            ExportError::DeviceAccess { .. } => "device-access",
            ExportError::Write { .. } => "write",
            ExportError::Directory { .. } => "directory",
        }
    }
}

/// Errors loading an export profile
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read profile {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid profile {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid setting: {0}")]
    Invalid(String),
}
