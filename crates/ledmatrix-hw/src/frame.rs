//! Device-native frame buffer.

use crate::{Error, Geometry, Result};

/// A pixel buffer sized for a particular matrix geometry.
///
/// Pixels are stored row-major, `bytes_per_pixel` bytes each, which is the
/// layout the device expects on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    geometry: Geometry,
}

impl Frame {
    /// Creates a frame with every LED off.
    pub fn new(geometry: Geometry) -> Self {
        Self {
            data: vec![0; geometry.frame_size()],
            geometry,
        }
    }

    /// Wraps caller-supplied bytes, checking the length against the geometry.
    pub fn from_bytes(geometry: Geometry, data: Vec<u8>) -> Result<Self> {
        if data.len() != geometry.frame_size() {
            return Err(Error::InvalidFrameSize {
                expected: geometry.frame_size(),
                actual: data.len(),
            });
        }
        Ok(Self { data, geometry })
    }

    /// Returns the geometry this frame was built for.
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the frame, returning the raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Sets every byte to `value`.
    pub fn fill(&mut self, value: u8) {
        self.data.fill(value);
    }

    /// Sets a pixel. Out-of-bounds coordinates are ignored.
    ///
    /// `value` must hold exactly `bytes_per_pixel` bytes.
    pub fn set_pixel(&mut self, row: u16, column: u16, value: &[u8]) -> Result<()> {
        let bpp = self.geometry.bytes_per_pixel() as usize;
        if value.len() != bpp {
            return Err(Error::InvalidFrameSize {
                expected: bpp,
                actual: value.len(),
            });
        }
        if let Some(offset) = self.geometry.offset(row, column) {
            self.data[offset..offset + bpp].copy_from_slice(value);
        }
        Ok(())
    }

    /// Gets a pixel's bytes.
    pub fn pixel(&self, row: u16, column: u16) -> Option<&[u8]> {
        let bpp = self.geometry.bytes_per_pixel() as usize;
        self.geometry
            .offset(row, column)
            .map(|offset| &self.data[offset..offset + bpp])
    }
}

impl From<Frame> for Vec<u8> {
    fn from(frame: Frame) -> Self {
        frame.into_bytes()
    }
}
