//! Decoded sample data as handed out by a log service.
//!
//! A [`Packet`] belongs to exactly one device and carries two independent
//! capabilities: calibrated inertial data and computed orientation. Either,
//! both or neither may be present.

use nalgebra::{Matrix3, UnitQuaternion, Vector3};

/// Calibrated inertial readings, in sensor units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibratedData {
    /// Acceleration (m/s²)
    pub acceleration: Vector3<f64>,
    /// Angular rate (rad/s)
    pub angular_rate: Vector3<f64>,
    /// Magnetic field (arbitrary units, normalized to local field)
    pub magnetic_field: Vector3<f64>,
}

/// Orientation output of the on-device filter.
///
/// The three representations are reported independently by the device and
/// are not cross-checked here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    /// Quaternion as `[q0, q1, q2, q3]`, scalar first
    pub quaternion: [f64; 4],
    /// Roll, pitch, yaw in degrees
    pub euler: Vector3<f64>,
    /// Rotation matrix, indexed `matrix[(row, col)]`
    pub matrix: Matrix3<f64>,
}

impl Orientation {
    /// Build all three representations from a single rotation.
    pub fn from_rotation(rotation: &UnitQuaternion<f64>) -> Self {
        let (roll, pitch, yaw) = rotation.euler_angles();
        let q = rotation.quaternion();
        Self {
            quaternion: [q.w, q.i, q.j, q.k],
            euler: Vector3::new(roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees()),
            matrix: rotation.to_rotation_matrix().into_inner(),
        }
    }

    pub fn roll(&self) -> f64 {
        self.euler.x
    }

    pub fn pitch(&self) -> f64 {
        self.euler.y
    }

    pub fn yaw(&self) -> f64 {
        self.euler.z
    }
}

/// One time-ordered sample of one device.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    /// On-device packet counter; wraps at 16 bits and may skip
    pub counter: u16,
    pub calibrated: Option<CalibratedData>,
    pub orientation: Option<Orientation>,
}

impl Packet {
    pub fn new(counter: u16) -> Self {
        Self {
            counter,
            calibrated: None,
            orientation: None,
        }
    }

    pub fn with_calibrated(mut self, calibrated: CalibratedData) -> Self {
        self.calibrated = Some(calibrated);
        self
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    pub fn has_calibrated_data(&self) -> bool {
        self.calibrated.is_some()
    }

    pub fn has_orientation(&self) -> bool {
        self.orientation.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_flags() {
        let packet = Packet::new(7);
        assert!(!packet.has_calibrated_data());
        assert!(!packet.has_orientation());

        let packet = packet.with_orientation(Orientation::from_rotation(&UnitQuaternion::identity()));
        assert!(!packet.has_calibrated_data());
        assert!(packet.has_orientation());
    }

    #[test]
    fn test_orientation_from_rotation_is_consistent() {
        let rotation = UnitQuaternion::from_euler_angles(0.1, -0.2, 0.3);
        let orientation = Orientation::from_rotation(&rotation);

        assert!((orientation.roll() - 0.1f64.to_degrees()).abs() < 1e-9);
        assert!((orientation.pitch() + 0.2f64.to_degrees()).abs() < 1e-9);
        assert!((orientation.yaw() - 0.3f64.to_degrees()).abs() < 1e-9);

        let expected = rotation.to_rotation_matrix().into_inner();
        assert!((orientation.matrix - expected).norm() < 1e-12);

        let norm: f64 = orientation.quaternion.iter().map(|v| v * v).sum();
        assert!((norm - 1.0).abs() < 1e-12);
    }
}
