//! IML (IMU Log) container format implementation.
//!
//! Binary format holding the synchronized samples of several inertial
//! sensors recorded in one session.

use bitflags::bitflags;
use imu_export_core::{CalibratedData, Orientation, Packet};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Magic bytes for IML file header
pub const IML_MAGIC: [u8; 4] = *b"IML1";

/// Magic bytes for IML file footer
pub const IML_FOOTER_MAGIC: [u8; 4] = *b"IMLF";

/// Current format version
pub const IML_VERSION: u16 = 1;

/// Header size in bytes (fixed)
pub const HEADER_SIZE: usize = 256;

/// Footer size in bytes (fixed)
pub const FOOTER_SIZE: usize = 32;

/// Device table entries a file may hold; slots are addressed by a u8
pub const MAX_DEVICES: usize = u8::MAX as usize + 1;

/// Fixed part of a packet record: slot + flags + counter
pub const PACKET_PREFIX_SIZE: usize = 4;

/// Number of f64 values following a CALIBRATED flag
const CALIBRATED_VALUES: usize = 9;

/// Number of f64 values following an ORIENTATION flag
const ORIENTATION_VALUES: usize = 4 + 3 + 9;

bitflags! {
    /// Capabilities present in one packet record
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PacketFlags: u8 {
        const CALIBRATED = 0x01;
        const ORIENTATION = 0x02;
    }
}

/// File header (256 bytes fixed size)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImlHeader {
    /// Format version (currently 1)
    pub version: u16,
    /// Reserved flags
    pub flags: u16,
    /// Number of entries in the device table, base station included
    pub device_count: u32,
    /// Recording start time (Unix timestamp in milliseconds)
    pub start_time_ms: u64,
    /// Offset to device table JSON in file
    pub device_table_offset: u64,
    /// Length of device table JSON
    pub device_table_len: u32,
    /// Offset to first packet record
    pub packets_offset: u64,
}

impl ImlHeader {
    /// Write header to writer
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut buf = [0u8; HEADER_SIZE];

        buf[0..4].copy_from_slice(&IML_MAGIC);
        buf[4..6].copy_from_slice(&self.version.to_le_bytes());
        buf[6..8].copy_from_slice(&self.flags.to_le_bytes());
        buf[8..12].copy_from_slice(&self.device_count.to_le_bytes());
        buf[12..20].copy_from_slice(&self.start_time_ms.to_le_bytes());
        buf[20..28].copy_from_slice(&self.device_table_offset.to_le_bytes());
        buf[28..32].copy_from_slice(&self.device_table_len.to_le_bytes());
        buf[32..40].copy_from_slice(&self.packets_offset.to_le_bytes());
        // Remaining bytes are reserved (already zeroed)

        writer.write_all(&buf)
    }

    /// Read header from reader
    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut buf = [0u8; HEADER_SIZE];
        reader.read_exact(&mut buf)?;

        if buf[0..4] != IML_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Invalid IML file: bad magic bytes",
            ));
        }

        let version = le_u16(&buf[4..6]);
        if version == 0 || version > IML_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Unsupported IML version: {}", version),
            ));
        }

        Ok(Self {
            version,
            flags: le_u16(&buf[6..8]),
            device_count: le_u32(&buf[8..12]),
            start_time_ms: le_u64(&buf[12..20]),
            device_table_offset: le_u64(&buf[20..28]),
            device_table_len: le_u32(&buf[28..32]),
            packets_offset: le_u64(&buf[32..40]),
        })
    }
}

/// File footer (32 bytes fixed size)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImlFooter {
    /// Total number of packet records, all devices together
    pub packet_count: u32,
    /// Offset just past the last packet record
    pub packets_end: u64,
}

impl ImlFooter {
    /// Write footer to writer
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut buf = [0u8; FOOTER_SIZE];

        buf[0..4].copy_from_slice(&IML_FOOTER_MAGIC);
        buf[4..8].copy_from_slice(&self.packet_count.to_le_bytes());
        buf[8..16].copy_from_slice(&self.packets_end.to_le_bytes());
        // Reserved (16 bytes, already zeroed)

        writer.write_all(&buf)
    }

    /// Read footer from reader (assumes reader is positioned at footer start)
    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let mut buf = [0u8; FOOTER_SIZE];
        reader.read_exact(&mut buf)?;

        if buf[0..4] != IML_FOOTER_MAGIC {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Invalid IML footer: bad magic bytes",
            ));
        }

        Ok(Self {
            packet_count: le_u32(&buf[4..8]),
            packets_end: le_u64(&buf[8..16]),
        })
    }
}

/// One entry of the device table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEntry {
    pub device_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_flags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_rate: Option<u32>,
}

impl DeviceEntry {
    pub fn new(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            ..Default::default()
        }
    }
}

/// Write one packet record for the device in table slot `slot`
pub fn write_packet<W: Write>(writer: &mut W, slot: u8, packet: &Packet) -> io::Result<()> {
    let mut flags = PacketFlags::empty();
    flags.set(PacketFlags::CALIBRATED, packet.calibrated.is_some());
    flags.set(PacketFlags::ORIENTATION, packet.orientation.is_some());

    writer.write_all(&[slot, flags.bits()])?;
    writer.write_all(&packet.counter.to_le_bytes())?;

    if let Some(cal) = &packet.calibrated {
        for v in cal
            .acceleration
            .iter()
            .chain(cal.angular_rate.iter())
            .chain(cal.magnetic_field.iter())
        {
            writer.write_all(&v.to_le_bytes())?;
        }
    }

    if let Some(o) = &packet.orientation {
        for v in o.quaternion.iter().chain(o.euler.iter()) {
            writer.write_all(&v.to_le_bytes())?;
        }
        // Matrix is stored row by row
        for row in 0..3 {
            for col in 0..3 {
                writer.write_all(&o.matrix[(row, col)].to_le_bytes())?;
            }
        }
    }

    Ok(())
}

/// Read one packet record, returning the device slot and the packet
pub fn read_packet<R: Read>(reader: &mut R) -> io::Result<(u8, Packet)> {
    let mut prefix = [0u8; PACKET_PREFIX_SIZE];
    reader.read_exact(&mut prefix)?;

    let slot = prefix[0];
    let flags = PacketFlags::from_bits(prefix[1]).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Unknown packet flags: {:#04X}", prefix[1]),
        )
    })?;
    let mut packet = Packet::new(le_u16(&prefix[2..4]));

    if flags.contains(PacketFlags::CALIBRATED) {
        let v = read_f64s::<_, CALIBRATED_VALUES>(reader)?;
        packet.calibrated = Some(CalibratedData {
            acceleration: Vector3::new(v[0], v[1], v[2]),
            angular_rate: Vector3::new(v[3], v[4], v[5]),
            magnetic_field: Vector3::new(v[6], v[7], v[8]),
        });
    }

    if flags.contains(PacketFlags::ORIENTATION) {
        let v = read_f64s::<_, ORIENTATION_VALUES>(reader)?;
        packet.orientation = Some(Orientation {
            quaternion: [v[0], v[1], v[2], v[3]],
            euler: Vector3::new(v[4], v[5], v[6]),
            matrix: Matrix3::from_row_slice(&v[7..16]),
        });
    }

    Ok((slot, packet))
}

/// Writer for creating IML files
pub struct ImlWriter<W: Write + Seek> {
    writer: W,
    header: ImlHeader,
    packet_count: u32,
}

impl<W: Write + Seek> ImlWriter<W> {
    /// Create a new IML writer. `devices[0]` is the base station.
    pub fn new(mut writer: W, devices: &[DeviceEntry], start_time_ms: u64) -> io::Result<Self> {
        if devices.len() > MAX_DEVICES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Too many devices for one IML file: {}", devices.len()),
            ));
        }

        let device_table = serde_json::to_vec(devices)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let header = ImlHeader {
            version: IML_VERSION,
            flags: 0,
            device_count: devices.len() as u32,
            start_time_ms,
            device_table_offset: HEADER_SIZE as u64,
            device_table_len: device_table.len() as u32,
            packets_offset: (HEADER_SIZE + device_table.len()) as u64,
        };

        header.write(&mut writer)?;
        writer.write_all(&device_table)?;

        Ok(Self {
            writer,
            header,
            packet_count: 0,
        })
    }

    /// Append a packet of the device in table slot `slot`
    pub fn write_packet(&mut self, slot: u8, packet: &Packet) -> io::Result<()> {
        if u32::from(slot) >= self.header.device_count {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Device slot {} not in device table", slot),
            ));
        }
        write_packet(&mut self.writer, slot, packet)?;
        self.packet_count += 1;
        Ok(())
    }

    pub fn packet_count(&self) -> u32 {
        self.packet_count
    }

    /// Write the footer and return the underlying writer
    pub fn finish(mut self) -> io::Result<W> {
        let packets_end = self.writer.stream_position()?;
        let footer = ImlFooter {
            packet_count: self.packet_count,
            packets_end,
        };
        footer.write(&mut self.writer)?;

        // Rewrite header in case the writer was handed a dirty buffer
        self.writer.seek(SeekFrom::Start(0))?;
        self.header.write(&mut self.writer)?;
        self.writer.seek(SeekFrom::End(0))?;

        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Reader for IML files
pub struct ImlReader<R: Read + Seek> {
    reader: R,
    footer: ImlFooter,
    devices: Vec<DeviceEntry>,
    current_packet: u32,
}

impl<R: Read + Seek> ImlReader<R> {
    /// Open an IML file for reading
    pub fn open(mut reader: R) -> io::Result<Self> {
        let header = ImlHeader::read(&mut reader)?;
        if header.device_count as usize > MAX_DEVICES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Too many devices: {}", header.device_count),
            ));
        }

        reader.seek(SeekFrom::Start(header.device_table_offset))?;
        let mut table = vec![0u8; header.device_table_len as usize];
        reader.read_exact(&mut table)?;
        let devices: Vec<DeviceEntry> = serde_json::from_slice(&table)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if devices.len() != header.device_count as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Device table has {} entries, header says {}",
                    devices.len(),
                    header.device_count
                ),
            ));
        }

        reader.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let footer = ImlFooter::read(&mut reader)?;

        reader.seek(SeekFrom::Start(header.packets_offset))?;

        Ok(Self {
            reader,
            footer,
            devices,
            current_packet: 0,
        })
    }

    pub fn footer(&self) -> &ImlFooter {
        &self.footer
    }

    /// Device table, base station first
    pub fn devices(&self) -> &[DeviceEntry] {
        &self.devices
    }

    /// Read the next packet record, returns None at end of data
    pub fn read_packet(&mut self) -> io::Result<Option<(u8, Packet)>> {
        if self.current_packet >= self.footer.packet_count {
            return Ok(None);
        }

        let record = read_packet(&mut self.reader)?;
        self.current_packet += 1;
        Ok(Some(record))
    }
}

fn read_f64s<R: Read, const N: usize>(reader: &mut R) -> io::Result<[f64; N]> {
    let mut out = [0f64; N];
    let mut buf = [0u8; 8];
    for slot in out.iter_mut() {
        reader.read_exact(&mut buf)?;
        *slot = f64::from_le_bytes(buf);
    }
    Ok(out)
}

fn le_u16(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}

fn le_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn le_u64(b: &[u8]) -> u64 {
    u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use nalgebra::UnitQuaternion;
    use std::io::Cursor;

    fn devices() -> Vec<DeviceEntry> {
        vec![
            DeviceEntry::new("BASE"),
            DeviceEntry {
                product_code: Some("MTW2-3A7G6".to_string()),
                update_rate: Some(100),
                ..DeviceEntry::new("00B42D56")
            },
        ]
    }

    fn full_packet(counter: u16) -> Packet {
        Packet::new(counter)
            .with_calibrated(CalibratedData {
                acceleration: Vector3::new(0.1, 0.2, 9.81),
                angular_rate: Vector3::new(0.01, -0.02, 0.03),
                magnetic_field: Vector3::new(0.4, 0.5, -0.6),
            })
            .with_orientation(Orientation::from_rotation(&UnitQuaternion::from_euler_angles(
                0.1, 0.2, 0.3,
            )))
    }

    #[test]
    fn test_header_layout() {
        let header = ImlHeader {
            version: 1,
            device_count: 3,
            start_time_ms: 1_700_000_000_000,
            device_table_offset: 256,
            device_table_len: 99,
            packets_offset: 355,
            ..Default::default()
        };

        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE);
        assert_eq!(&buf[0..4], b"IML1");

        let read = ImlHeader::read(&mut Cursor::new(buf)).unwrap();
        assert_eq!(read, header);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let buf = vec![0u8; HEADER_SIZE];
        let err = ImlHeader::read(&mut Cursor::new(buf)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_future_version_rejected() {
        let header = ImlHeader {
            version: IML_VERSION + 1,
            ..Default::default()
        };
        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        assert!(ImlHeader::read(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn test_packet_record_sizes() {
        let mut buf = Vec::new();
        write_packet(&mut buf, 1, &Packet::new(3)).unwrap();
        assert_eq!(buf.len(), PACKET_PREFIX_SIZE);

        let packet = full_packet(4);
        let mut buf = Vec::new();
        write_packet(&mut buf, 1, &packet).unwrap();
        assert_eq!(
            buf.len(),
            PACKET_PREFIX_SIZE + (CALIBRATED_VALUES + ORIENTATION_VALUES) * 8
        );
        assert_eq!(buf[1], (PacketFlags::CALIBRATED | PacketFlags::ORIENTATION).bits());
    }

    #[test]
    fn test_unknown_flags_rejected() {
        let buf = vec![1u8, 0x80, 0, 0];
        let err = read_packet(&mut Cursor::new(buf)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_matrix_survives_storage_order() {
        let mut packet = full_packet(0);
        if let Some(o) = packet.orientation.as_mut() {
            o.matrix = Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        }
        let mut buf = Vec::new();
        write_packet(&mut buf, 1, &packet).unwrap();
        let (_, read) = read_packet(&mut Cursor::new(buf)).unwrap();
        assert_eq!(read.orientation.unwrap().matrix[(0, 1)], 2.0);
    }

    #[test]
    fn test_writer_reader() {
        let mut writer = ImlWriter::new(Cursor::new(Vec::new()), &devices(), 1234).unwrap();
        writer.write_packet(1, &full_packet(10)).unwrap();
        writer.write_packet(1, &Packet::new(11)).unwrap();
        assert!(writer.write_packet(2, &Packet::new(12)).is_err());
        let buf = writer.finish().unwrap().into_inner();

        let header = ImlHeader::read(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(header.start_time_ms, 1234);

        let mut reader = ImlReader::open(Cursor::new(buf)).unwrap();
        assert_eq!(reader.footer().packet_count, 2);
        assert_eq!(reader.devices(), devices().as_slice());

        let (slot, first) = reader.read_packet().unwrap().unwrap();
        assert_eq!(slot, 1);
        assert_eq!(first, full_packet(10));

        let (_, second) = reader.read_packet().unwrap().unwrap();
        assert_eq!(second.counter, 11);
        assert!(!second.has_calibrated_data() && !second.has_orientation());

        assert!(reader.read_packet().unwrap().is_none());
    }

    /// File whose header and device table both claim `count` devices,
    /// bypassing the writer's limit
    pub(crate) fn oversized_device_table(count: usize) -> Vec<u8> {
        let entries: Vec<DeviceEntry> = (0..count)
            .map(|i| DeviceEntry::new(&format!("D{}", i)))
            .collect();
        let table = serde_json::to_vec(&entries).unwrap();
        let header = ImlHeader {
            version: IML_VERSION,
            device_count: count as u32,
            device_table_offset: HEADER_SIZE as u64,
            device_table_len: table.len() as u32,
            packets_offset: (HEADER_SIZE + table.len()) as u64,
            ..Default::default()
        };

        let mut buf = Vec::new();
        header.write(&mut buf).unwrap();
        buf.extend_from_slice(&table);
        let mut calibrated = full_packet(0);
        calibrated.orientation = None;
        write_packet(&mut buf, 1, &calibrated).unwrap();
        let footer = ImlFooter {
            packet_count: 1,
            packets_end: buf.len() as u64,
        };
        footer.write(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_device_limit() {
        let too_many = vec![DeviceEntry::new("X"); MAX_DEVICES + 1];
        assert!(ImlWriter::new(Cursor::new(Vec::new()), &too_many, 0).is_err());

        let at_limit = oversized_device_table(MAX_DEVICES);
        assert_eq!(ImlReader::open(Cursor::new(at_limit)).unwrap().devices().len(), MAX_DEVICES);

        let err = ImlReader::open(Cursor::new(oversized_device_table(MAX_DEVICES + 2)))
            .err()
            .unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_truncated_file_rejected() {
        let writer = ImlWriter::new(Cursor::new(Vec::new()), &devices(), 0).unwrap();
        let mut buf = writer.finish().unwrap().into_inner();
        buf.truncate(buf.len() - 8);
        assert!(ImlReader::open(Cursor::new(buf)).is_err());
    }
}
