//! Generic USB transport.
//!
//! A backend resolves a device path and claims its interface; the handle it
//! returns performs blocking output transfers. Dropping the handle releases
//! the interface.

mod hid;
mod memory;

pub use hid::HidBackend;
pub use memory::MemoryBackend;

use crate::Result;

/// Resolves device paths and opens their interfaces.
pub trait UsbBackend: Send + Sync {
    /// Opens the device at `path`.
    ///
    /// Fails with `DeviceNotFound` if nothing is connected at `path`, or
    /// `AccessDenied` if the interface cannot be claimed.
    fn open(&self, path: &str) -> Result<Box<dyn UsbHandle>>;
}

/// An open, claimed device interface.
pub trait UsbHandle: Send {
    /// Writes one output packet, returning the number of bytes accepted.
    fn write(&mut self, packet: &[u8]) -> Result<usize>;
}
