//! # IMU Export
//!
//! Batch exporter from multi-sensor inertial log files to delimited text.
//!
//! This crate provides the I/O side of the exporter:
//! - Walks an input tree for log files
//! - Exports every sensor of every file through a [`LogService`]
//! - Writes one text file per (log file, sensor) with a provenance header
//! - Ships a file-backed log service and a synthetic recording generator
//!
//! ## Architecture
//!
//! Data shaping (packets, rows, headers, profiles) lives in
//! [`imu_export_core`], which never touches the filesystem.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      imu-export                         │
//! │  ┌─────────────────────────────────────────────────────┐│
//! │  │ BatchDriver                                         ││
//! │  │  - discovers log files, mirrors directories         ││
//! │  │  - one BatchReport entry per (file, device)         ││
//! │  └──────────────────────┬──────────────────────────────┘│
//! │                         ▼                               │
//! │  ┌─────────────────────────────────────────────────────┐│
//! │  │ SessionExporter                                     ││
//! │  │  open ─► load ─► extract ─► format ─► write ─► close││
//! │  └──────────────────────┬──────────────────────────────┘│
//! │                         ▼                               │
//! │  ┌─────────────────────────────────────────────────────┐│
//! │  │ LogService (trait)                                  ││
//! │  │  - FileLogService over .iml containers              ││
//! │  └─────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example: Exporting a Tree
//!
//! ```rust,no_run
//! use imu_export::batch::BatchDriver;
//! use imu_export::logfile::FileLogService;
//! use imu_export_core::ExportProfile;
//! use std::path::Path;
//!
//! let service = FileLogService::new();
//! let profile = ExportProfile::standard();
//! let report = BatchDriver::new(&service, &profile)
//!     .run(Path::new("recordings"), Path::new("results"));
//! println!("{} exported", report.succeeded().count());
//! ```
//!
//! ## Command-Line Interface
//!
//! See [`Cli`] for all available options. Subcommands:
//!
//! - `export <INPUT_ROOT> <OUTPUT_ROOT>` - Export every log file below a directory
//! - `list <INPUT_ROOT>` - Show log files and their sensors without exporting
//! - `synth <OUTPUT_DIR>` - Write a synthetic recording
//! - `-v` / `-q` - Change verbosity (use multiple times)

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod batch;
pub mod config;
pub mod error;
pub mod exporter;
pub mod logfile;
pub mod synthetic;

#[cfg(test)]
mod testing;

pub use imu_export_core::LogService;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Export every device of every log file below INPUT_ROOT
    Export {
        /// Directory searched recursively for log files
        input_root: PathBuf,

        /// Directory receiving the text files
        output_root: PathBuf,

        #[clap(flatten)]
        profile: config::ProfileArgs,

        /// Exit with an error status when any export failed
        #[arg(long, default_value_t = false)]
        strict: bool,

        /// Write a JSON summary of the run to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// List log files and their exportable devices
    List {
        /// Directory searched recursively for log files
        input_root: PathBuf,

        #[clap(flatten)]
        profile: config::ProfileArgs,
    },

    /// Write a synthetic multi-sensor log file
    Synth {
        /// Directory receiving the log file
        output_dir: PathBuf,

        /// Trial name, used as the file stem
        #[arg(long)]
        trial: Option<String>,

        /// Number of sensors besides the base station
        #[arg(long, default_value_t = 3)]
        sensors: u8,

        /// Packets per sensor
        #[arg(long, default_value_t = 1000)]
        packets: usize,

        /// Update rate in Hz
        #[arg(long, default_value_t = 100)]
        rate: u32,
    },
}
