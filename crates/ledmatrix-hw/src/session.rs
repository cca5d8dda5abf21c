//! Device session: one open, exclusive connection to a matrix.

use crate::protocol::{build_blank_packet, build_render_packet, build_write_packets};
use crate::registry::{PathClaim, SessionRegistry};
use crate::transport::{UsbBackend, UsbHandle};
use crate::{Error, Geometry, Result};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// The two pieces of an open connection. They exist together or not at all.
struct OpenDevice {
    // Declared first so the interface is released before the path claim.
    handle: Box<dyn UsbHandle>,
    _claim: PathClaim,
}

struct SessionState {
    device: Option<OpenDevice>,
    staged: Option<Vec<u8>>,
}

/// LED matrix session.
///
/// Operations are serialized by an internal lock, so a session can be shared
/// between threads. Transfers block until the transport completes or fails
/// and are never retried here.
pub struct MatrixSession {
    path: String,
    geometry: Geometry,
    state: Mutex<SessionState>,
}

impl MatrixSession {
    /// Opens the matrix at `path`.
    ///
    /// The path is claimed in `registry` first, so a second session on the
    /// same path fails with `AccessDenied` without touching the driver.
    pub fn open(
        backend: &dyn UsbBackend,
        registry: &Arc<SessionRegistry>,
        path: &str,
        geometry: Geometry,
    ) -> Result<Self> {
        let claim = registry.claim(path)?;
        let handle = backend.open(path)?;

        info!(
            "Session opened on {} ({}, {} byte frames)",
            path,
            geometry,
            geometry.frame_size()
        );

        Ok(Self {
            path: path.to_string(),
            geometry,
            state: Mutex::new(SessionState {
                device: Some(OpenDevice {
                    handle,
                    _claim: claim,
                }),
                staged: None,
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the device path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the device geometry.
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Frame length the device expects.
    pub fn expected_frame_size(&self) -> usize {
        self.geometry.frame_size()
    }

    /// Whether the session still holds the device.
    pub fn is_open(&self) -> bool {
        self.state().device.is_some()
    }

    /// Whether a frame is waiting to be committed.
    pub fn has_staged_frame(&self) -> bool {
        self.state().staged.is_some()
    }

    /// Copy of the pending frame, if any.
    pub fn staged_frame(&self) -> Option<Vec<u8>> {
        self.state().staged.clone()
    }

    /// Releases the interface and the path claim. Closing twice is a no-op.
    pub fn close(&self) {
        let mut state = self.state();
        state.staged = None;
        if state.device.take().is_some() {
            info!("Session on {} closed", self.path);
        }
    }

    /// Stages a frame for the next commit, replacing any pending frame.
    ///
    /// Purely local: nothing is sent to the device. A buffer of the wrong
    /// length is rejected and the pending frame is left as it was.
    pub fn stage_frame(&self, buffer: impl Into<Vec<u8>>) -> Result<()> {
        let buffer = buffer.into();
        let mut state = self.state();
        if state.device.is_none() {
            return Err(Error::SessionClosed);
        }

        let expected = self.expected_frame_size();
        if buffer.len() != expected {
            debug!(
                "Rejected frame for {}: {} bytes, expected {}",
                self.path,
                buffer.len(),
                expected
            );
            return Err(Error::InvalidFrameSize {
                expected,
                actual: buffer.len(),
            });
        }

        state.staged = Some(buffer);
        debug!("Staged {} byte frame for {}", expected, self.path);
        Ok(())
    }

    /// Sends the staged frame and tells the device to render it.
    ///
    /// The staged frame is consumed only on success; after a
    /// `TransferFailed` it remains pending so the commit can be retried.
    pub fn commit(&self) -> Result<()> {
        let mut state = self.state();
        let SessionState { device, staged } = &mut *state;
        let device = device.as_mut().ok_or(Error::SessionClosed)?;
        let frame = staged.as_ref().ok_or(Error::NoFrameStaged)?;

        let packets = build_write_packets(frame);
        let result = packets
            .iter()
            .try_for_each(|packet| self.send(&mut *device.handle, packet))
            .and_then(|()| self.send(&mut *device.handle, &build_render_packet()));

        match result {
            Ok(()) => {
                debug!(
                    "Frame committed to {} ({} write packets)",
                    self.path,
                    packets.len()
                );
                *staged = None;
                Ok(())
            }
            Err(e) => {
                warn!("Commit to {} failed: {}", self.path, e);
                Err(e)
            }
        }
    }

    /// Blanks the display. Any staged frame is left untouched.
    pub fn clear(&self) -> Result<()> {
        let mut state = self.state();
        let device = state.device.as_mut().ok_or(Error::SessionClosed)?;

        self.send(&mut *device.handle, &build_blank_packet())
            .inspect_err(|e| warn!("Clear on {} failed: {}", self.path, e))?;

        debug!("Display on {} cleared", self.path);
        Ok(())
    }

    fn send(&self, handle: &mut dyn UsbHandle, packet: &[u8]) -> Result<()> {
        let written = handle.write(packet)?;
        if written != packet.len() {
            return Err(Error::TransferFailed(format!(
                "partial write to {}: {} of {} bytes",
                self.path,
                written,
                packet.len()
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for MatrixSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatrixSession")
            .field("path", &self.path)
            .field("geometry", &self.geometry)
            .field("open", &self.is_open())
            .finish()
    }
}
