//! Provenance header written at the top of every exported file.

use crate::device::DeviceRecording;

/// Prefix of every header line
pub const COMMENT_PREFIX: &str = "//";

/// One header line: a title and an optional value.
///
/// Items without a value render as a bare title; that covers both section
/// titles and metadata the log service could not supply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderItem {
    pub title: String,
    pub value: Option<String>,
}

impl HeaderItem {
    pub fn section(title: &str) -> Self {
        Self {
            title: format!(" {}", title),
            value: None,
        }
    }

    pub fn field(title: &str, value: Option<String>) -> Self {
        Self {
            title: title.to_string(),
            value,
        }
    }

    pub fn render(&self) -> String {
        match &self.value {
            Some(value) if !value.is_empty() => {
                format!("{} {}: {}", COMMENT_PREFIX, self.title, value)
            }
            _ => format!("{} {}", COMMENT_PREFIX, self.title),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceHeader {
    items: Vec<HeaderItem>,
}

impl ProvenanceHeader {
    pub fn new(exporter_version: &str, service_version: &str, device: &DeviceRecording) -> Self {
        let items = vec![
            HeaderItem::section("General information"),
            HeaderItem::field("Update Rate", device.update_rate.map(|hz| format!("{}Hz", hz))),
            HeaderItem::field("Exporter version", Some(exporter_version.to_string())),
            HeaderItem::field("Log service version", Some(service_version.to_string())),
            HeaderItem::section("Device information"),
            HeaderItem::field("DeviceId", device.device_id.as_ref().map(|id| id.to_string())),
            HeaderItem::field("ProductCode", device.product_code.clone()),
            HeaderItem::field("Firmware Version", device.firmware_version.clone()),
            HeaderItem::field("Hardware Version", device.hardware_version.clone()),
            HeaderItem::section("Device settings"),
            HeaderItem::field("Filter Profile", device.filter_profile.clone()),
            HeaderItem::field("Option Flags", device.option_flags.clone()),
        ];
        Self { items }
    }

    pub fn items(&self) -> &[HeaderItem] {
        &self.items
    }

    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    /// All header lines, each newline terminated
    pub fn render(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            out.push_str(&item.render());
            out.push('\n');
        }
        out
    }
}
