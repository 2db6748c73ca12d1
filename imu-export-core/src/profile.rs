//! Export profile: the immutable configuration shared by every export unit
//! in a batch.
//!
//! A profile fixes the text layout (delimiter, numeric precision, which
//! index goes in the first column) and the file-level policy (which input
//! files are picked up, where outputs land). It is built once, before the
//! batch starts, and passed by reference from then on.

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::path::{Component, Path, PathBuf};

use crate::device::DeviceId;

/// Extension of exported text files
pub const EXPORT_EXTENSION: &str = "txt";

/// Extension of log files picked up by default
pub const DEFAULT_LOG_EXTENSION: &str = "iml";

/// Number of decimal places written for every numeric field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Precision {
    #[default]
    Standard = 6,
    Full = 15,
}

impl Precision {
    pub fn decimals(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for Precision {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            6 => Ok(Precision::Standard),
            15 => Ok(Precision::Full),
            _ => Err(format!("Unsupported precision {}: use 6 or 15", value)),
        }
    }
}

/// Which number goes in the first (`PacketCounter`) column.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum IndexSource {
    /// Zero-based retrieval index; always 0..packet_count
    #[default]
    Sequential,
    /// On-device packet counter; may wrap or skip
    PacketCounter,
}

/// Where exported files are written relative to the output root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputLayout {
    /// Number of trailing directory names of the input file mirrored under
    /// the output root (e.g. 2 keeps `subject/session/`)
    pub mirror_segments: usize,
}

impl OutputLayout {
    /// Export file name for one device: `{stem}-{device}.txt`.
    ///
    /// Path separators in the device id are replaced by `_` so the file
    /// always lands in the export directory.
    pub fn file_name(input: &Path, device: &DeviceId) -> String {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let device: String = device
            .as_str()
            .chars()
            .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
            .collect();
        format!("{}-{}.{}", stem, device, EXPORT_EXTENSION)
    }

    /// Directory the export of `input` goes into.
    pub fn directory(&self, output_root: &Path, input: &Path) -> PathBuf {
        let mut dir = output_root.to_path_buf();
        if self.mirror_segments == 0 {
            return dir;
        }

        let names: Vec<_> = input
            .parent()
            .map(|p| {
                p.components()
                    .filter_map(|c| match c {
                        Component::Normal(name) => Some(name.to_owned()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let skip = names.len().saturating_sub(self.mirror_segments);
        for name in names.into_iter().skip(skip) {
            dir.push(name);
        }
        dir
    }

    /// Full destination path of one export unit.
    pub fn destination(&self, output_root: &Path, input: &Path, device: &DeviceId) -> PathBuf {
        self.directory(output_root, input)
            .join(Self::file_name(input, device))
    }
}

/// Which files under the input root are treated as log files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InputFilter {
    /// File extension without the dot, matched case-sensitively
    pub extension: String,
    /// Wildcard pattern one directory name between the input root and the
    /// file must match (e.g. `imu`)
    pub required_segment: Option<String>,
}

impl Default for InputFilter {
    fn default() -> Self {
        Self {
            extension: DEFAULT_LOG_EXTENSION.to_string(),
            required_segment: None,
        }
    }
}

/// Complete export configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportProfile {
    pub name: String,
    pub delimiter: String,
    pub precision: Precision,
    pub index_source: IndexSource,
    pub layout: OutputLayout,
    pub filter: InputFilter,
}

impl Default for ExportProfile {
    fn default() -> Self {
        Self::standard()
    }
}

impl ExportProfile {
    /// Tab separated, 6 decimals, sequential index
    pub fn standard() -> Self {
        Self {
            name: "standard".to_string(),
            delimiter: "\t".to_string(),
            precision: Precision::Standard,
            index_source: IndexSource::Sequential,
            layout: OutputLayout::default(),
            filter: InputFilter::default(),
        }
    }

    /// Tab separated, 15 decimals
    pub fn precise() -> Self {
        Self {
            name: "precise".to_string(),
            precision: Precision::Full,
            ..Self::standard()
        }
    }

    /// Comma separated, 6 decimals
    pub fn csv() -> Self {
        Self {
            name: "csv".to_string(),
            delimiter: ",".to_string(),
            ..Self::standard()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_keeps_device_inside_directory() {
        let name = OutputLayout::file_name(Path::new("walk.iml"), &DeviceId::new("../../etc\\x"));
        assert_eq!(name, "walk-.._.._etc_x.txt");

        let destination = OutputLayout::default().destination(
            Path::new("/out"),
            Path::new("/in/walk.iml"),
            &DeviceId::new("../escape"),
        );
        assert_eq!(destination.parent(), Some(Path::new("/out")));
    }

    #[test]
    fn test_file_name_uses_stem_and_device() {
        let name = OutputLayout::file_name(
            Path::new("/data/patient-02/imu/walk_01.iml"),
            &DeviceId::new("00B42D56"),
        );
        assert_eq!(name, "walk_01-00B42D56.txt");
    }

    #[test]
    fn test_destination_without_mirroring() {
        let layout = OutputLayout::default();
        let dest = layout.destination(
            Path::new("/out"),
            Path::new("/data/s1/imu/walk.iml"),
            &DeviceId::new("B"),
        );
        assert_eq!(dest, PathBuf::from("/out/walk-B.txt"));
    }

    #[test]
    fn test_destination_mirrors_trailing_segments() {
        let layout = OutputLayout { mirror_segments: 2 };
        let dest = layout.destination(
            Path::new("/out"),
            Path::new("/data/subject-3/session-1/walk.iml"),
            &DeviceId::new("B"),
        );
        assert_eq!(dest, PathBuf::from("/out/subject-3/session-1/walk-B.txt"));
    }

    #[test]
    fn test_destination_mirrors_at_most_available_segments() {
        let layout = OutputLayout { mirror_segments: 5 };
        let dest = layout.destination(Path::new("out"), Path::new("a/walk.iml"), &DeviceId::new("B"));
        assert_eq!(dest, PathBuf::from("out/a/walk-B.txt"));
    }

    #[test]
    fn test_precision_serializes_as_number() {
        let json = serde_json::to_string(&ExportProfile::precise()).unwrap();
        assert!(json.contains("\"precision\":15"));
        assert!(json.contains("\"indexSource\":\"sequential\""));
    }

    #[test]
    fn test_partial_profile_uses_defaults() {
        let profile: ExportProfile =
            serde_json::from_str(r#"{"delimiter": ",", "indexSource": "packet-counter"}"#).unwrap();
        assert_eq!(profile.delimiter, ",");
        assert_eq!(profile.index_source, IndexSource::PacketCounter);
        assert_eq!(profile.precision, Precision::Standard);
        assert_eq!(profile.filter.extension, "iml");
    }

    #[test]
    fn test_invalid_precision_rejected() {
        assert!(serde_json::from_str::<ExportProfile>(r#"{"precision": 7}"#).is_err());
        assert_eq!(Precision::try_from(15), Ok(Precision::Full));
        assert!(Precision::try_from(3).is_err());
    }

    #[test]
    fn test_precision_defaults_to_six_decimals() {
        assert_eq!(Precision::default(), Precision::Standard);
        assert_eq!(Precision::default().decimals(), 6);
    }

    #[test]
    fn test_index_source_parses_from_str() {
        assert_eq!("packet-counter".parse::<IndexSource>().unwrap(), IndexSource::PacketCounter);
        assert_eq!(IndexSource::Sequential.to_string(), "sequential");
    }
}
