//! Packet extraction: one decoded [`Packet`] in, one fixed-shape
//! [`ExtractionRecord`] out.
//!
//! A missing capability is a normal condition. Every field the capability
//! would have supplied is filled with NaN so that every row has the same
//! shape.

use nalgebra::{Matrix3, Vector3};

use crate::packet::Packet;
use crate::profile::IndexSource;

/// Number of numeric (non-index) fields in a record
pub const VALUE_COUNT: usize = 25;

/// Normalized, always fully populated per-packet tuple.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionRecord {
    pub index: u64,
    pub acc: [f64; 3],
    pub gyr: [f64; 3],
    pub mag: [f64; 3],
    pub quat: [f64; 4],
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    /// Orientation matrix flattened column by column
    pub matrix: [f64; 9],
}

impl ExtractionRecord {
    /// Extract a record from `packet`, retrieved at sequential position
    /// `position`.
    pub fn from_packet(position: usize, packet: &Packet, index_source: IndexSource) -> Self {
        let index = match index_source {
            IndexSource::Sequential => position as u64,
            IndexSource::PacketCounter => u64::from(packet.counter),
        };

        let (acc, gyr, mag) = match &packet.calibrated {
            Some(cal) => (
                triple(&cal.acceleration),
                triple(&cal.angular_rate),
                triple(&cal.magnetic_field),
            ),
            None => ([f64::NAN; 3], [f64::NAN; 3], [f64::NAN; 3]),
        };

        let (quat, roll, pitch, yaw, matrix) = match &packet.orientation {
            Some(o) => (
                o.quaternion,
                o.roll(),
                o.pitch(),
                o.yaw(),
                flatten_column_major(&o.matrix),
            ),
            None => ([f64::NAN; 4], f64::NAN, f64::NAN, f64::NAN, [f64::NAN; 9]),
        };

        Self {
            index,
            acc,
            gyr,
            mag,
            quat,
            roll,
            pitch,
            yaw,
            matrix,
        }
    }

    /// The 25 numeric fields in column order.
    pub fn values(&self) -> [f64; VALUE_COUNT] {
        let mut out = [0f64; VALUE_COUNT];
        let fields = self
            .acc
            .iter()
            .chain(&self.gyr)
            .chain(&self.mag)
            .chain(&self.quat)
            .chain([&self.roll, &self.pitch, &self.yaw])
            .chain(&self.matrix);
        for (slot, value) in out.iter_mut().zip(fields) {
            *slot = *value;
        }
        out
    }
}

fn triple(v: &Vector3<f64>) -> [f64; 3] {
    [v.x, v.y, v.z]
}

/// `M[0][0], M[1][0], M[2][0], M[0][1], ...`: down each column in turn.
pub fn flatten_column_major(m: &Matrix3<f64>) -> [f64; 9] {
    [
        m[(0, 0)],
        m[(1, 0)],
        m[(2, 0)],
        m[(0, 1)],
        m[(1, 1)],
        m[(2, 1)],
        m[(0, 2)],
        m[(1, 2)],
        m[(2, 2)],
    ]
}
