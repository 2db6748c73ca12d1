//! Building the [`ExportProfile`] for a run: a preset, optionally replaced by
//! a JSON profile file, then adjusted by command line overrides.

use imu_export_core::{ExportProfile, IndexSource, Precision};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Built-in profile presets
#[derive(clap::ValueEnum, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub enum ProfileName {
    /// Tab separated, 6 decimals
    #[default]
    Standard,
    /// Tab separated, 15 decimals
    Precise,
    /// Comma separated, 6 decimals
    Csv,
}

impl ProfileName {
    pub fn profile(self) -> ExportProfile {
        match self {
            ProfileName::Standard => ExportProfile::standard(),
            ProfileName::Precise => ExportProfile::precise(),
            ProfileName::Csv => ExportProfile::csv(),
        }
    }
}

#[derive(clap::Args, Clone, Debug, Default, PartialEq)]
pub struct ProfileArgs {
    /// Built-in profile to start from
    #[arg(long, default_value_t, value_enum)]
    pub profile: ProfileName,

    /// JSON profile file; keys it leaves out take the `--profile` defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Field delimiter; `tab` and `\t` mean a tab character
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Decimal places for numeric fields (6 or 15)
    #[arg(long)]
    pub precision: Option<u8>,

    /// First column: `sequential` or `packet-counter`
    #[arg(long)]
    pub index_source: Option<IndexSource>,

    /// Trailing input directory names to recreate under the output root
    #[arg(long)]
    pub mirror_segments: Option<usize>,

    /// Only take files below a directory whose name matches this pattern
    #[arg(long)]
    pub require_segment: Option<String>,

    /// Log file extension, without the dot
    #[arg(long)]
    pub extension: Option<String>,
}

impl ProfileArgs {
    /// Resolve the profile for this run.
    pub fn resolve(&self) -> Result<ExportProfile, ConfigError> {
        let mut profile = match &self.config {
            Some(path) => load_profile(path, self.profile.profile())?,
            None => self.profile.profile(),
        };

        if let Some(delimiter) = &self.delimiter {
            profile.delimiter = unescape_delimiter(delimiter);
        }
        if let Some(decimals) = self.precision {
            profile.precision = Precision::try_from(decimals).map_err(ConfigError::Invalid)?;
        }
        if let Some(index_source) = self.index_source {
            profile.index_source = index_source;
        }
        if let Some(segments) = self.mirror_segments {
            profile.layout.mirror_segments = segments;
        }
        if let Some(segment) = &self.require_segment {
            profile.filter.required_segment = Some(segment.clone());
        }
        if let Some(extension) = &self.extension {
            profile.filter.extension = extension.trim_start_matches('.').to_string();
        }

        validate(&profile)?;
        debug!("Using profile {:?}", profile);
        Ok(profile)
    }
}

/// Read a JSON profile. Keys missing from the file are taken from `base`.
pub fn load_profile(path: &Path, base: ExportProfile) -> Result<ExportProfile, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    merge_profile(&text, base).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn merge_profile(text: &str, base: ExportProfile) -> Result<ExportProfile, serde_json::Error> {
    let mut merged = serde_json::to_value(base)?;
    let overlay: serde_json::Value = serde_json::from_str(text)?;
    merge_json(&mut merged, overlay);
    serde_json::from_value(merged)
}

fn merge_json(target: &mut serde_json::Value, overlay: serde_json::Value) {
    match (target, overlay) {
        (serde_json::Value::Object(target), serde_json::Value::Object(overlay)) => {
            for (key, value) in overlay {
                match target.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, overlay) => *target = overlay,
    }
}

fn unescape_delimiter(delimiter: &str) -> String {
    match delimiter {
        "tab" | "\\t" => "\t".to_string(),
        other => other.to_string(),
    }
}

fn validate(profile: &ExportProfile) -> Result<(), ConfigError> {
    if profile.delimiter.is_empty() {
        return Err(ConfigError::Invalid("delimiter must not be empty".to_string()));
    }
    if profile.delimiter.contains(['\n', '\r']) {
        return Err(ConfigError::Invalid(
            "delimiter must not contain a line break".to_string(),
        ));
    }
    if profile.filter.extension.is_empty() {
        return Err(ConfigError::Invalid("extension must not be empty".to_string()));
    }
    Ok(())
}
