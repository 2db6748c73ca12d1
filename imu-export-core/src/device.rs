//! Device identity and recording metadata.

use serde::{Deserialize, Serialize};

/// Opaque device identifier as reported by the log service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Metadata of one device within one log file.
///
/// Any field the log service cannot supply is `None`; it is rendered as a
/// bare title in the export header rather than failing the export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecording {
    pub device_id: Option<DeviceId>,
    pub product_code: Option<String>,
    pub firmware_version: Option<String>,
    pub hardware_version: Option<String>,
    pub filter_profile: Option<String>,
    pub option_flags: Option<String>,
    /// Output rate in Hz
    pub update_rate: Option<u32>,
}

impl DeviceRecording {
    /// Collect metadata from a loaded device handle.
    pub fn capture<D: crate::service::LogDevice + ?Sized>(device: &D) -> Self {
        Self {
            device_id: device.device_id(),
            product_code: non_empty(device.product_code()),
            firmware_version: non_empty(device.firmware_version()),
            hardware_version: non_empty(device.hardware_version()),
            filter_profile: non_empty(device.filter_profile()),
            option_flags: non_empty(device.option_flags()),
            update_rate: device.update_rate(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_serializes_as_plain_string() {
        let id = DeviceId::new("00B42D56");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"00B42D56\"");
        assert_eq!(id.to_string(), "00B42D56");
    }

    #[test]
    fn test_non_empty_drops_blank_values() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some("4.4.0".to_string())), Some("4.4.0".to_string()));
        assert_eq!(non_empty(None), None);
    }
}
