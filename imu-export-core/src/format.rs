//! Row formatting for exported text files.
//!
//! Pure and stateless: the same record and configuration always produce
//! byte-identical output.

use std::fmt::Write;

use crate::extract::{ExtractionRecord, VALUE_COUNT};
use crate::profile::{ExportProfile, Precision};

/// Textual token written for a NaN field
pub const NAN_TOKEN: &str = "nan";

/// Width the index column is zero-padded to
pub const INDEX_WIDTH: usize = 5;

/// Column header, in field order
pub const COLUMNS: [&str; VALUE_COUNT + 1] = [
    "PacketCounter",
    "Acc_X",
    "Acc_Y",
    "Acc_Z",
    "Gyr_X",
    "Gyr_Y",
    "Gyr_Z",
    "Mag_X",
    "Mag_Y",
    "Mag_Z",
    "Quat_q0",
    "Quat_q1",
    "Quat_q2",
    "Quat_q3",
    "Roll",
    "Pitch",
    "Yaw",
    "Mat[1][1]",
    "Mat[2][1]",
    "Mat[3][1]",
    "Mat[1][2]",
    "Mat[2][2]",
    "Mat[3][2]",
    "Mat[1][3]",
    "Mat[2][3]",
    "Mat[3][3]",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFormatter {
    delimiter: String,
    precision: Precision,
}

impl RowFormatter {
    pub fn new(delimiter: impl Into<String>, precision: Precision) -> Self {
        Self {
            delimiter: delimiter.into(),
            precision,
        }
    }

    pub fn from_profile(profile: &ExportProfile) -> Self {
        Self::new(profile.delimiter.clone(), profile.precision)
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Column header line, newline terminated
    pub fn header_line(&self) -> String {
        let mut line = COLUMNS.join(&self.delimiter);
        line.push('\n');
        line
    }

    /// One data row, newline terminated
    pub fn format(&self, record: &ExtractionRecord) -> String {
        let mut line = String::with_capacity(32 * COLUMNS.len());
        self.write_row(&mut line, record);
        line
    }

    /// Append one data row to `out`
    pub fn write_row(&self, out: &mut String, record: &ExtractionRecord) {
        // Writing to a String cannot fail
        let _ = write!(out, "{:0width$}", record.index, width = INDEX_WIDTH);
        for value in record.values() {
            out.push_str(&self.delimiter);
            self.push_value(out, value);
        }
        out.push('\n');
    }

    fn push_value(&self, out: &mut String, value: f64) {
        if value.is_nan() {
            out.push_str(NAN_TOKEN);
        } else {
            let _ = write!(out, "{:.prec$}", value, prec = self.precision.decimals());
        }
    }
}
