//! Matrix geometry.
//!
//! The device only understands a flat byte stream, so the geometry is what
//! turns rows, columns and pixel depth into an expected frame length.

use crate::protocol::MAX_FRAME_SIZE;
use crate::{Error, Result};
use std::str::FromStr;

/// Physical layout of an LED matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    rows: u16,
    columns: u16,
    bytes_per_pixel: u8,
}

impl Geometry {
    /// Creates a geometry, rejecting zero-sized dimensions and frames too
    /// large to address with the protocol's 16-bit offsets.
    pub fn new(rows: u16, columns: u16, bytes_per_pixel: u8) -> Result<Self> {
        if rows == 0 || columns == 0 || bytes_per_pixel == 0 {
            return Err(Error::InvalidGeometry(format!(
                "{}x{}x{}",
                rows, columns, bytes_per_pixel
            )));
        }
        let frame_size = rows as usize * columns as usize * bytes_per_pixel as usize;
        if frame_size > MAX_FRAME_SIZE {
            return Err(Error::InvalidGeometry(format!(
                "{}x{}x{} needs {} byte frames, limit is {}",
                rows, columns, bytes_per_pixel, frame_size, MAX_FRAME_SIZE
            )));
        }
        Ok(Self {
            rows,
            columns,
            bytes_per_pixel,
        })
    }

    /// Number of LED rows.
    pub fn rows(&self) -> u16 {
        self.rows
    }

    /// Number of LED columns.
    pub fn columns(&self) -> u16 {
        self.columns
    }

    /// Bytes per LED in the device-native layout.
    pub fn bytes_per_pixel(&self) -> u8 {
        self.bytes_per_pixel
    }

    /// Number of LEDs.
    pub fn pixel_count(&self) -> usize {
        self.rows as usize * self.columns as usize
    }

    /// Exact length a frame must have for this geometry.
    pub fn frame_size(&self) -> usize {
        self.pixel_count() * self.bytes_per_pixel as usize
    }

    /// Byte offset of the pixel at (row, column), if in bounds.
    pub fn offset(&self, row: u16, column: u16) -> Option<usize> {
        if row < self.rows && column < self.columns {
            let idx = row as usize * self.columns as usize + column as usize;
            Some(idx * self.bytes_per_pixel as usize)
        } else {
            None
        }
    }
}

impl Default for Geometry {
    /// 8x8 monochrome, 64-byte frames.
    fn default() -> Self {
        Self {
            rows: 8,
            columns: 8,
            bytes_per_pixel: 1,
        }
    }
}

impl FromStr for Geometry {
    type Err = Error;

    /// Parses `ROWSxCOLS` or `ROWSxCOLSxBPP`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidGeometry(s.to_string());

        let parts: Vec<&str> = s.trim().split(['x', 'X']).collect();
        let (rows, columns, bpp) = match parts.as_slice() {
            [rows, columns] => (*rows, *columns, "1"),
            [rows, columns, bpp] => (*rows, *columns, *bpp),
            _ => return Err(invalid()),
        };

        let rows = rows.trim().parse().map_err(|_| invalid())?;
        let columns = columns.trim().parse().map_err(|_| invalid())?;
        let bpp = bpp.trim().parse().map_err(|_| invalid())?;

        Geometry::new(rows, columns, bpp)
    }
}

impl std::fmt::Display for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.rows, self.columns, self.bytes_per_pixel)
    }
}
