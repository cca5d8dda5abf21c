//! Error types for the LED matrix hardware library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Status code returned for a successful operation across the C boundary.
pub const STATUS_OK: i32 = 0;

/// Errors that can occur when interacting with the matrix.
#[derive(Error, Debug)]
pub enum Error {
    /// The path does not resolve to a connected device.
    #[error("LED matrix not found at {0}")]
    DeviceNotFound(String),

    /// The device interface is already owned by another session.
    #[error("access denied to {0}: interface already claimed")]
    AccessDenied(String),

    /// Operation attempted on a closed session.
    #[error("session is closed")]
    SessionClosed,

    /// Frame length does not match the device geometry.
    #[error("invalid frame size: expected {expected} bytes, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },

    /// Commit requested without a staged frame.
    #[error("no frame staged")]
    NoFrameStaged,

    /// USB transfer failed (disconnect, timeout or partial write).
    #[error("USB transfer failed: {0}")]
    TransferFailed(String),

    /// Geometry string or dimensions are invalid.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),
}

impl Error {
    /// Returns the integer status code used by the flat controller API.
    pub fn status(&self) -> i32 {
        match self {
            Error::DeviceNotFound(_) => 1,
            Error::AccessDenied(_) => 2,
            Error::SessionClosed => 3,
            Error::InvalidFrameSize { .. } => 4,
            Error::NoFrameStaged => 5,
            Error::TransferFailed(_) => 6,
            Error::InvalidGeometry(_) => 7,
        }
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Only transport failures qualify; everything else needs different
    /// inputs or a different session.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::TransferFailed(_))
    }
}

/// Collapses a result into a status code (0 on success).
pub fn status_code<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => STATUS_OK,
        Err(e) => e.status(),
    }
}
