//! USB HID transport via hidapi.

use super::{UsbBackend, UsbHandle};
use crate::{Error, Result};
use hidapi::{HidApi, HidDevice};
use std::ffi::CString;
use tracing::{debug, info};

/// Backend that opens matrices through the platform HID driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct HidBackend;

impl HidBackend {
    /// Creates a new HID backend.
    pub fn new() -> Self {
        Self
    }
}

impl UsbBackend for HidBackend {
    fn open(&self, path: &str) -> Result<Box<dyn UsbHandle>> {
        let api = HidApi::new().map_err(|e| {
            debug!("Failed to initialise HID API: {}", e);
            Error::DeviceNotFound(path.to_string())
        })?;

        let c_path = CString::new(path).map_err(|_| Error::DeviceNotFound(path.to_string()))?;

        // The path must belong to a connected device before we try to claim it
        let info = api
            .device_list()
            .find(|d| d.path() == c_path.as_c_str())
            .ok_or_else(|| Error::DeviceNotFound(path.to_string()))?;

        debug!(
            "Found HID device: path={:?}, VID:{:04X} PID:{:04X}, interface={}",
            info.path(),
            info.vendor_id(),
            info.product_id(),
            info.interface_number()
        );

        let device = api.open_path(c_path.as_c_str()).map_err(|e| {
            debug!("Failed to open device: {}", e);
            Error::AccessDenied(path.to_string())
        })?;

        info!("LED matrix opened at path: {}", path);

        Ok(Box::new(HidHandle { device }))
    }
}

struct HidHandle {
    device: HidDevice,
}

impl UsbHandle for HidHandle {
    fn write(&mut self, packet: &[u8]) -> Result<usize> {
        self.device
            .write(packet)
            .map_err(|e| Error::TransferFailed(e.to_string()))
    }
}
