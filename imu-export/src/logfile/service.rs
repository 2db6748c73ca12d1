//! Log service backed by IML container files.
//!
//! Decoding a device runs on its own thread; completion is reported back
//! over a channel so [`LogDevice::wait_for_load_done`] can block on it.

use crossbeam::channel::{self, Receiver};
use imu_export_core::{DeviceId, LogDevice, LogService, LogSession, Packet, ServiceError};
use log::{debug, trace};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::thread;

use super::file_format::{DeviceEntry, ImlReader, IML_VERSION};

/// Log service reading `.iml` files from the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLogService;

impl FileLogService {
    pub fn new() -> Self {
        Self
    }
}

impl LogService for FileLogService {
    type Session = FileSession;

    fn open(&self, path: &Path) -> Result<FileSession, ServiceError> {
        let reader = open_reader(path)?;
        let devices = reader.devices().to_vec();
        debug!(
            "Opened {} ({} devices, {} packets)",
            path.display(),
            devices.len(),
            reader.footer().packet_count
        );
        Ok(FileSession {
            path: path.to_path_buf(),
            devices,
            open: true,
        })
    }

    fn version(&self) -> String {
        format!("{} (IML v{})", env!("CARGO_PKG_VERSION"), IML_VERSION)
    }
}

fn open_reader(path: &Path) -> Result<ImlReader<BufReader<File>>, ServiceError> {
    let file = File::open(path)?;
    ImlReader::open(BufReader::new(file)).map_err(|e| match e.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => {
            ServiceError::Unrecognized(format!("{}: {}", path.display(), e))
        }
        _ => ServiceError::Io(e.to_string()),
    })
}

/// An opened IML file
#[derive(Debug)]
pub struct FileSession {
    path: PathBuf,
    devices: Vec<DeviceEntry>,
    open: bool,
}

impl FileSession {
    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl LogSession for FileSession {
    type Device = FileDevice;

    fn device_ids(&self) -> Vec<DeviceId> {
        if !self.open {
            return Vec::new();
        }
        self.devices
            .iter()
            .map(|d| DeviceId::new(d.device_id.as_str()))
            .collect()
    }

    fn device(&mut self, id: &DeviceId) -> Option<FileDevice> {
        if !self.open {
            return None;
        }
        let slot = self
            .devices
            .iter()
            .position(|d| d.device_id == id.as_str())?;
        Some(FileDevice {
            path: self.path.clone(),
            slot: u8::try_from(slot).ok()?,
            entry: self.devices[slot].clone(),
            retain: false,
            pending: None,
            decoded: None,
        })
    }

    fn close(&mut self) {
        if self.open {
            debug!("Closed {}", self.path.display());
            self.open = false;
        }
    }
}

#[derive(Debug)]
struct Decoded {
    count: usize,
    /// Present only when buffered data was retained
    packets: Option<Vec<Packet>>,
}

type DecodeResult = Result<Decoded, ServiceError>;

/// One device of an opened IML file
#[derive(Debug)]
pub struct FileDevice {
    path: PathBuf,
    slot: u8,
    entry: DeviceEntry,
    retain: bool,
    pending: Option<Receiver<DecodeResult>>,
    decoded: Option<Decoded>,
}

impl FileDevice {
    pub fn is_loaded(&self) -> bool {
        self.decoded.is_some()
    }
}

impl LogDevice for FileDevice {
    fn set_retain_buffered_data(&mut self, retain: bool) {
        self.retain = retain;
    }

    fn load(&mut self) -> Result<(), ServiceError> {
        let (tx, rx) = channel::bounded(1);
        let path = self.path.clone();
        let slot = self.slot;
        let retain = self.retain;

        thread::Builder::new()
            .name(format!("decode-{}", self.entry.device_id))
            .spawn(move || {
                let result = decode_device(&path, slot, retain);
                // Receiver may already be gone if the device was dropped
                let _ = tx.send(result);
            })
            .map_err(|e| ServiceError::DecodeFailed(e.to_string()))?;

        self.decoded = None;
        self.pending = Some(rx);
        Ok(())
    }

    fn wait_for_load_done(&mut self) -> Result<(), ServiceError> {
        if self.decoded.is_some() && self.pending.is_none() {
            return Ok(());
        }
        let rx = self.pending.take().ok_or(ServiceError::NotLoaded)?;
        match rx.recv() {
            Ok(Ok(decoded)) => {
                self.decoded = Some(decoded);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            // Sender dropped without reporting: the decode thread died
            Err(_) => Err(ServiceError::DecodeInterrupted),
        }
    }

    fn packet_count(&self) -> usize {
        self.decoded.as_ref().map(|d| d.count).unwrap_or(0)
    }

    fn packet_at(&self, index: usize) -> Result<Packet, ServiceError> {
        let decoded = self.decoded.as_ref().ok_or(ServiceError::NotLoaded)?;
        let packets = decoded.packets.as_ref().ok_or(ServiceError::NotRetained)?;
        packets
            .get(index)
            .cloned()
            .ok_or(ServiceError::PacketOutOfRange {
                index,
                count: decoded.count,
            })
    }

    fn device_id(&self) -> Option<DeviceId> {
        Some(DeviceId::new(self.entry.device_id.as_str()))
    }

    fn product_code(&self) -> Option<String> {
        self.entry.product_code.clone()
    }

    fn firmware_version(&self) -> Option<String> {
        self.entry.firmware_version.clone()
    }

    fn hardware_version(&self) -> Option<String> {
        self.entry.hardware_version.clone()
    }

    fn filter_profile(&self) -> Option<String> {
        self.entry.filter_profile.clone()
    }

    fn option_flags(&self) -> Option<String> {
        self.entry.option_flags.clone()
    }

    fn update_rate(&self) -> Option<u32> {
        self.entry.update_rate
    }
}

fn decode_device(path: &Path, slot: u8, retain: bool) -> DecodeResult {
    let mut reader = open_reader(path)?;
    let mut count = 0usize;
    let mut packets = retain.then(Vec::new);

    while let Some((packet_slot, packet)) = reader
        .read_packet()
        .map_err(|e| ServiceError::DecodeFailed(e.to_string()))?
    {
        if packet_slot != slot {
            continue;
        }
        count += 1;
        if let Some(buffer) = packets.as_mut() {
            buffer.push(packet);
        }
    }

    trace!("Decoded {} packets for slot {} of {}", count, slot, path.display());
    Ok(Decoded { count, packets })
}
