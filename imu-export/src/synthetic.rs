//! Synthetic multi-sensor recordings.
//!
//! Produces `.iml` files with random but physically shaped data, so the
//! whole export pipeline can be exercised without hardware.

use chrono::Utc;
use imu_export_core::{CalibratedData, Orientation, Packet};
use log::{debug, info};
use nalgebra::{UnitQuaternion, Vector3};
use std::f64::consts::{FRAC_PI_2, PI};
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use crate::logfile::{DeviceEntry, ImlWriter};

pub const SYNTH_PRODUCT_CODE: &str = "MTWSYNTH";
pub const SYNTH_FIRMWARE_VERSION: &str = "0.0.1";
pub const SYNTH_HARDWARE_VERSION: &str = "1.0";
pub const SYNTH_FILTER_PROFILE: &str = "SyntheticTest";
pub const SYNTH_OPTION_FLAGS: &str = "None";

const ACCELERATION_RANGE: f64 = 2.0;
const ANGULAR_RATE_RANGE: f64 = 250.0;
const MAGNETIC_FIELD_RANGE: f64 = 50.0;

/// Parameters of one synthetic trial
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticTrial {
    pub name: String,
    pub sensors: u8,
    pub packets: usize,
    pub update_rate: u32,
    /// Counter of the first packet of every sensor
    pub first_counter: u16,
}

impl Default for SyntheticTrial {
    fn default() -> Self {
        Self {
            name: default_trial_name(),
            sensors: 3,
            packets: 1000,
            update_rate: 100,
            first_counter: 0,
        }
    }
}

/// `synthetic-YYYYMMDD-HHMMSS` in UTC
pub fn default_trial_name() -> String {
    format!("synthetic-{}", Utc::now().format("%Y%m%d-%H%M%S"))
}

/// Device id of table slot `slot`; slot 0 is the base station
pub fn synthetic_device_id(slot: u8) -> String {
    format!("SYNTH-{:04X}", slot)
}

impl SyntheticTrial {
    /// Device table: base station, then one entry per sensor
    pub fn device_table(&self) -> Vec<DeviceEntry> {
        let mut devices = vec![DeviceEntry::new(&synthetic_device_id(0))];
        devices.extend((1..=self.sensors).map(|slot| DeviceEntry {
            product_code: Some(SYNTH_PRODUCT_CODE.to_string()),
            firmware_version: Some(SYNTH_FIRMWARE_VERSION.to_string()),
            hardware_version: Some(SYNTH_HARDWARE_VERSION.to_string()),
            filter_profile: Some(SYNTH_FILTER_PROFILE.to_string()),
            option_flags: Some(SYNTH_OPTION_FLAGS.to_string()),
            update_rate: Some(self.update_rate),
            ..DeviceEntry::new(&synthetic_device_id(slot))
        }));
        devices
    }

    /// Write the trial as `<output_dir>/<name>.iml`, returning its path.
    pub fn write(&self, output_dir: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(output_dir)?;
        let path = output_dir.join(format!("{}.iml", self.name));

        let start_time_ms = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let file = BufWriter::new(File::create(&path)?);
        let mut writer = ImlWriter::new(file, &self.device_table(), start_time_ms)?;

        let mut counter = self.first_counter;
        for _ in 0..self.packets {
            for slot in 1..=self.sensors {
                writer.write_packet(slot, &random_packet(counter))?;
            }
            counter = counter.wrapping_add(1);
        }
        debug!("Wrote {} packets to {}", writer.packet_count(), path.display());
        writer.finish()?;

        info!(
            "Synthetic trial '{}' with {} sensors written to {}",
            self.name,
            self.sensors,
            path.display()
        );
        Ok(path)
    }
}

/// Uniform in `[-range, range]` per component
fn random_vector(range: f64) -> Vector3<f64> {
    Vector3::<f64>::new_random().map(|v| (v * 2.0 - 1.0) * range)
}

/// Packet with both capabilities and random values
pub fn random_packet(counter: u16) -> Packet {
    let angles = Vector3::<f64>::new_random().map(|v| v * 2.0 - 1.0);
    let rotation = UnitQuaternion::from_euler_angles(
        angles.x * PI,
        angles.y * FRAC_PI_2,
        angles.z * PI,
    );

    Packet::new(counter)
        .with_calibrated(CalibratedData {
            acceleration: random_vector(ACCELERATION_RANGE),
            angular_rate: random_vector(ANGULAR_RATE_RANGE),
            magnetic_field: random_vector(MAGNETIC_FIELD_RANGE),
        })
        .with_orientation(Orientation::from_rotation(&rotation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logfile::ImlReader;
    use std::collections::HashSet;
    use std::io::BufReader;
    use tempfile::TempDir;

    #[test]
    fn test_device_table() {
        let trial = SyntheticTrial {
            sensors: 4,
            ..SyntheticTrial::default()
        };
        let table = trial.device_table();
        assert_eq!(table.len(), 5);
        assert_eq!(table[0].device_id, "SYNTH-0000");
        assert!(table[0].product_code.is_none());

        let ids: HashSet<_> = table.iter().map(|d| d.device_id.clone()).collect();
        assert_eq!(ids.len(), 5);
        assert!(table[1..]
            .iter()
            .all(|d| d.product_code.as_deref() == Some("MTWSYNTH") && d.update_rate == Some(100)));
    }

    #[test]
    fn test_random_packet_ranges() {
        for _ in 0..100 {
            let packet = random_packet(7);
            let cal = packet.calibrated.unwrap();
            assert!(cal.acceleration.iter().all(|v| v.abs() <= 2.0));
            assert!(cal.angular_rate.iter().all(|v| v.abs() <= 250.0));
            assert!(cal.magnetic_field.iter().all(|v| v.abs() <= 50.0));

            let orientation = packet.orientation.unwrap();
            let norm: f64 = orientation.quaternion.iter().map(|q| q * q).sum();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_write_trial_wraps_counter() {
        let dir = TempDir::new().unwrap();
        let trial = SyntheticTrial {
            name: "trial".to_string(),
            sensors: 2,
            packets: 4,
            update_rate: 60,
            first_counter: u16::MAX - 1,
        };
        let path = trial.write(&dir.path().join("out")).unwrap();
        assert_eq!(path, dir.path().join("out/trial.iml"));

        let mut reader = ImlReader::open(BufReader::new(File::open(&path).unwrap())).unwrap();
        assert_eq!(reader.devices().len(), 3);
        assert_eq!(reader.footer().packet_count, 8);

        let mut counters = Vec::new();
        while let Some((slot, packet)) = reader.read_packet().unwrap() {
            if slot == 1 {
                counters.push(packet.counter);
            }
        }
        assert_eq!(counters, vec![u16::MAX - 1, u16::MAX, 0, 1]);
    }
}
