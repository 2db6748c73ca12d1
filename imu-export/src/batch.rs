//! Batch driver: finds log files under an input root and exports every
//! device of every file.
//!
//! One bad recording never aborts the run. Each (file, device) unit ends up
//! in the [`BatchReport`] with its own result.

use imu_export_core::{DeviceId, ExportProfile, InputFilter, LogService};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use wildmatch::WildMatch;

use crate::error::ExportError;
use crate::exporter::{
    exportable_devices, inspect_devices, DeviceSummary, ExportOutcome, SessionExporter,
};

/// Recursively collect log files under `input_root` accepted by `filter`,
/// sorted by path.
pub fn discover_log_files(input_root: &Path, filter: &InputFilter) -> Vec<PathBuf> {
    let segment = filter.required_segment.as_deref().map(WildMatch::new);
    let mut files = Vec::new();
    collect_files(input_root, &mut files);

    files.retain(|path| {
        if path.extension().and_then(|e| e.to_str()) != Some(filter.extension.as_str()) {
            return false;
        }
        match &segment {
            None => true,
            Some(pattern) => path
                .strip_prefix(input_root)
                .ok()
                .and_then(Path::parent)
                .map(|dir| {
                    dir.iter()
                        .filter_map(|c| c.to_str())
                        .any(|name| pattern.matches(name))
                })
                .unwrap_or(false),
        }
    });
    files.sort();
    files
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot read directory {}: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            collect_files(&path, files);
        } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
            files.push(path);
        } else if file_type.is_symlink() {
            // Directory links are not followed; they can loop back into the tree
            debug!("Skipping directory link {}", path.display());
        }
    }
}

/// Make sure `path` exists as a directory. An existing directory is fine.
pub fn ensure_output_root(path: &Path) -> Result<(), ExportError> {
    if path.is_dir() {
        debug!("Directory '{}' already exists", path.display());
        return Ok(());
    }
    fs::create_dir_all(path).map_err(|source| ExportError::Directory {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Directory '{}' created", path.display());
    Ok(())
}

/// Outcome of one (file, device) unit
#[derive(Debug)]
pub struct UnitReport {
    pub log_path: PathBuf,
    /// `None` when the file's device list could not be read
    pub device_id: Option<DeviceId>,
    pub result: Result<ExportOutcome, ExportError>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub files_found: usize,
    /// Set when the output root could not be created
    pub directory_error: Option<ExportError>,
    pub units: Vec<UnitReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &ExportOutcome> {
        self.units.iter().filter_map(|u| u.result.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = &UnitReport> {
        self.units.iter().filter(|u| u.result.is_err())
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    /// Log files with at least one failed unit, in batch order
    pub fn failed_files(&self) -> Vec<&Path> {
        let mut files: Vec<&Path> = Vec::new();
        for unit in self.failed() {
            if !files.contains(&unit.log_path.as_path()) {
                files.push(&unit.log_path);
            }
        }
        files
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            files: self.files_found,
            exported: self.succeeded().count(),
            failed: self.failed().count(),
            directory_error: self.directory_error.as_ref().map(|e| e.to_string()),
            units: self.units.iter().map(UnitSummary::from).collect(),
        }
    }
}

/// Serializable view of a [`BatchReport`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub files: usize,
    pub exported: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_error: Option<String>,
    pub units: Vec<UnitSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitSummary {
    pub log_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<DeviceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packet_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&UnitReport> for UnitSummary {
    fn from(unit: &UnitReport) -> Self {
        let (destination, packet_count, error_kind, error) = match &unit.result {
            Ok(outcome) => (
                Some(outcome.destination.clone()),
                Some(outcome.packet_count),
                None,
                None,
            ),
            Err(e) => (None, None, Some(e.kind().to_string()), Some(e.to_string())),
        };
        Self {
            log_path: unit.log_path.clone(),
            device_id: unit.device_id.clone(),
            destination,
            packet_count,
            error_kind,
            error,
        }
    }
}

/// Devices found in one log file, as reported by [`BatchDriver::list`]
#[derive(Debug)]
pub struct FileListing {
    pub log_path: PathBuf,
    pub devices: Result<Vec<DeviceSummary>, ExportError>,
}

pub struct BatchDriver<'a, S: LogService> {
    service: &'a S,
    profile: &'a ExportProfile,
}

impl<'a, S: LogService> BatchDriver<'a, S> {
    pub fn new(service: &'a S, profile: &'a ExportProfile) -> Self {
        Self { service, profile }
    }

    /// Export every device of every log file under `input_root`.
    pub fn run(&self, input_root: &Path, output_root: &Path) -> BatchReport {
        let mut report = BatchReport::default();

        if let Err(e) = ensure_output_root(output_root) {
            warn!("{}", e);
            report.directory_error = Some(e);
        }

        let files = discover_log_files(input_root, &self.profile.filter);
        info!(
            "Found {} log files under {}",
            files.len(),
            input_root.display()
        );
        report.files_found = files.len();

        let mut exporter = SessionExporter::new(self.service, self.profile);
        for file in files {
            let devices = match exportable_devices(self.service, &file) {
                Ok(devices) => devices,
                Err(e) => {
                    error!("Error with file {}: {}", file.display(), e);
                    report.units.push(UnitReport {
                        log_path: file,
                        device_id: None,
                        result: Err(e),
                    });
                    continue;
                }
            };

            if devices.is_empty() {
                warn!("No exportable devices in {}", file.display());
            }

            for device in devices {
                let destination = self
                    .profile
                    .layout
                    .destination(output_root, &file, &device);
                if let Some(parent) = destination.parent() {
                    if let Err(e) = fs::create_dir_all(parent) {
                        warn!("Cannot create {}: {}", parent.display(), e);
                    }
                }

                let result = exporter.export(&file, &device, &destination);
                if let Err(e) = &result {
                    error!("Error with file {} device {}: {}", file.display(), device, e);
                }
                report.units.push(UnitReport {
                    log_path: file.clone(),
                    device_id: Some(device),
                    result,
                });
            }
        }

        info!(
            "Batch done: {} exported, {} failed",
            report.succeeded().count(),
            report.failed().count()
        );
        report
    }

    /// Describe every log file under `input_root` without writing output.
    pub fn list(&self, input_root: &Path) -> Vec<FileListing> {
        discover_log_files(input_root, &self.profile.filter)
            .into_iter()
            .map(|log_path| {
                let devices = inspect_devices(self.service, &log_path);
                FileListing { log_path, devices }
            })
            .collect()
    }
}
