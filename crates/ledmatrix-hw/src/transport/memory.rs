//! In-memory loopback transport.
//!
//! Records every packet instead of talking to hardware. Used for dry runs
//! and for exercising session behaviour without a device attached.

use super::{UsbBackend, UsbHandle};
use crate::protocol::{self, Command};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Default)]
struct DeviceState {
    packets: Vec<Vec<u8>>,
    connected: bool,
    claimed: bool,
    short_writes: bool,
}

type Devices = Arc<Mutex<HashMap<String, DeviceState>>>;

fn lock(devices: &Devices) -> MutexGuard<'_, HashMap<String, DeviceState>> {
    devices.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Backend whose devices live in memory.
///
/// Clones share the same devices, so a test can keep one clone to inspect
/// what a session wrote through another.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    devices: Devices,
}

impl MemoryBackend {
    /// Creates a backend with no devices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connected device at `path` (builder form).
    pub fn with_device(self, path: &str) -> Self {
        self.add_device(path);
        self
    }

    /// Adds a connected device at `path`.
    pub fn add_device(&self, path: &str) {
        lock(&self.devices).insert(
            path.to_string(),
            DeviceState {
                connected: true,
                ..Default::default()
            },
        );
    }

    /// Simulates unplugging the device. Writes fail until reconnected.
    pub fn disconnect(&self, path: &str) {
        if let Some(device) = lock(&self.devices).get_mut(path) {
            device.connected = false;
        }
    }

    /// Simulates plugging the device back in.
    pub fn reconnect(&self, path: &str) {
        if let Some(device) = lock(&self.devices).get_mut(path) {
            device.connected = true;
        }
    }

    /// Makes the device accept only half of each packet.
    pub fn set_short_writes(&self, path: &str, enabled: bool) {
        if let Some(device) = lock(&self.devices).get_mut(path) {
            device.short_writes = enabled;
        }
    }

    /// All packets written to `path`, in order.
    pub fn packets(&self, path: &str) -> Vec<Vec<u8>> {
        lock(&self.devices)
            .get(path)
            .map(|d| d.packets.clone())
            .unwrap_or_default()
    }

    /// Number of packets written to `path`.
    pub fn write_count(&self, path: &str) -> usize {
        lock(&self.devices)
            .get(path)
            .map_or(0, |d| d.packets.len())
    }

    /// Commands sent to `path`, in order.
    pub fn commands(&self, path: &str) -> Vec<Command> {
        self.packets(path)
            .iter()
            .filter_map(|p| protocol::parse_header(p).map(|h| h.command))
            .collect()
    }

    /// Frame data carried by write packets to `path`, one entry per packet.
    pub fn frame_writes(&self, path: &str) -> Vec<Vec<u8>> {
        self.packets(path)
            .iter()
            .filter(|p| {
                protocol::parse_header(p).map(|h| h.command) == Some(Command::Write)
            })
            .filter_map(|p| protocol::payload(p).map(<[u8]>::to_vec))
            .collect()
    }

    /// Forgets every packet recorded for `path`.
    pub fn clear_log(&self, path: &str) {
        if let Some(device) = lock(&self.devices).get_mut(path) {
            device.packets.clear();
        }
    }
}

impl UsbBackend for MemoryBackend {
    fn open(&self, path: &str) -> Result<Box<dyn UsbHandle>> {
        let mut devices = lock(&self.devices);
        let device = devices
            .get_mut(path)
            .filter(|d| d.connected)
            .ok_or_else(|| Error::DeviceNotFound(path.to_string()))?;

        if device.claimed {
            return Err(Error::AccessDenied(path.to_string()));
        }
        device.claimed = true;
        debug!("Memory device opened at path: {}", path);

        Ok(Box::new(MemoryHandle {
            devices: Arc::clone(&self.devices),
            path: path.to_string(),
        }))
    }
}

struct MemoryHandle {
    devices: Devices,
    path: String,
}

impl UsbHandle for MemoryHandle {
    fn write(&mut self, packet: &[u8]) -> Result<usize> {
        let mut devices = lock(&self.devices);
        let device = devices
            .get_mut(&self.path)
            .filter(|d| d.connected)
            .ok_or_else(|| Error::TransferFailed(format!("{} disconnected", self.path)))?;

        if device.short_writes {
            return Ok(packet.len() / 2);
        }

        device.packets.push(packet.to_vec());
        Ok(packet.len())
    }
}

impl Drop for MemoryHandle {
    fn drop(&mut self) {
        if let Some(device) = lock(&self.devices).get_mut(&self.path) {
            device.claimed = false;
        }
    }
}
