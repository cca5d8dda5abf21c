//! Controller handle: a session slot that may or may not be open.
//!
//! This is the shape the flat C API works with. A controller is created
//! unopened, bound to a device path later, and every draw call on it reports
//! `SessionClosed` until then.

use crate::registry::SessionRegistry;
use crate::session::MatrixSession;
use crate::transport::UsbBackend;
use crate::{Error, Geometry, Result};
use std::sync::Arc;
use tracing::debug;

/// LED matrix controller.
pub struct Controller {
    backend: Arc<dyn UsbBackend>,
    registry: Arc<SessionRegistry>,
    geometry: Geometry,
    session: Option<MatrixSession>,
}

impl Controller {
    /// Creates an unopened controller.
    pub fn new(
        backend: Arc<dyn UsbBackend>,
        registry: Arc<SessionRegistry>,
        geometry: Geometry,
    ) -> Self {
        Self {
            backend,
            registry,
            geometry,
            session: None,
        }
    }

    /// Geometry used for the next open.
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Binds the controller to `path` using the current geometry.
    pub fn open(&mut self, path: &str) -> Result<()> {
        self.open_with(path, self.geometry)
    }

    /// Binds the controller to `path` with `geometry`.
    ///
    /// A session on another path stays open until the new one succeeds, so a
    /// failed open leaves the controller as it was. Reopening the path already
    /// held closes the old session first, since the path cannot be claimed
    /// twice; if that reopen fails the controller ends up closed.
    pub fn open_with(&mut self, path: &str, geometry: Geometry) -> Result<()> {
        if self.path() == Some(path) {
            self.close();
        }
        let session =
            MatrixSession::open(self.backend.as_ref(), &self.registry, path, geometry)?;

        self.close();
        self.geometry = geometry;
        self.session = Some(session);
        Ok(())
    }

    /// Closes the session if one is open. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
            debug!("Controller released {}", session.path());
        }
    }

    /// Whether the controller holds an open session.
    pub fn is_open(&self) -> bool {
        self.session.as_ref().is_some_and(MatrixSession::is_open)
    }

    /// Path of the open session.
    pub fn path(&self) -> Option<&str> {
        self.session.as_ref().map(MatrixSession::path)
    }

    /// The open session.
    pub fn session(&self) -> Option<&MatrixSession> {
        self.session.as_ref()
    }

    fn open_session(&self) -> Result<&MatrixSession> {
        self.session.as_ref().ok_or(Error::SessionClosed)
    }

    /// Stages a frame.
    pub fn prepare_draw(&self, buffer: &[u8]) -> Result<()> {
        self.open_session()?.stage_frame(buffer)
    }

    /// Commits the staged frame.
    pub fn draw(&self) -> Result<()> {
        self.open_session()?.commit()
    }

    /// Blanks the display.
    pub fn clear(&self) -> Result<()> {
        self.open_session()?.clear()
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryBackend;

    fn controller(backend: &MemoryBackend, registry: &Arc<SessionRegistry>) -> Controller {
        Controller::new(
            Arc::new(backend.clone()),
            Arc::clone(registry),
            Geometry::default(),
        )
    }

    #[test]
    fn test_unopened_controller() {
        let backend = MemoryBackend::new().with_device("DEV0");
        let registry = Arc::new(SessionRegistry::new());
        let mut ctl = controller(&backend, &registry);

        assert!(!ctl.is_open());
        assert_eq!(ctl.path(), None);
        assert!(matches!(ctl.prepare_draw(&[0; 64]), Err(Error::SessionClosed)));
        assert!(matches!(ctl.draw(), Err(Error::SessionClosed)));
        assert!(matches!(ctl.clear(), Err(Error::SessionClosed)));

        // Closing a never-opened controller is harmless
        ctl.close();
    }

    #[test]
    fn test_draw_flow() {
        let backend = MemoryBackend::new().with_device("DEV0");
        let registry = Arc::new(SessionRegistry::new());
        let mut ctl = controller(&backend, &registry);

        ctl.open("DEV0").unwrap();
        assert_eq!(ctl.path(), Some("DEV0"));

        ctl.prepare_draw(&[0x11; 64]).unwrap();
        ctl.draw().unwrap();
        assert_eq!(backend.frame_writes("DEV0"), vec![vec![0x11; 64]]);
        assert!(matches!(ctl.draw(), Err(Error::NoFrameStaged)));
    }

    #[test]
    fn test_reopen_releases_previous_path() {
        let backend = MemoryBackend::new().with_device("DEV0").with_device("DEV1");
        let registry = Arc::new(SessionRegistry::new());
        let mut ctl = controller(&backend, &registry);

        ctl.open("DEV0").unwrap();
        ctl.open("DEV1").unwrap();
        assert!(!registry.is_claimed("DEV0"));
        assert!(registry.is_claimed("DEV1"));
    }

    #[test]
    fn test_failed_open_keeps_current_session() {
        let backend = MemoryBackend::new().with_device("DEV0");
        let registry = Arc::new(SessionRegistry::new());
        let mut ctl = controller(&backend, &registry);

        ctl.open("DEV0").unwrap();
        assert!(matches!(ctl.open("DEV9"), Err(Error::DeviceNotFound(_))));
        let other_geometry = Geometry::new(16, 16, 1).unwrap();
        assert!(ctl.open_with("DEV9", other_geometry).is_err());

        assert!(ctl.is_open());
        assert_eq!(ctl.path(), Some("DEV0"));
        assert_eq!(ctl.geometry(), Geometry::default());
        ctl.prepare_draw(&[0x01; 64]).unwrap();
        ctl.draw().unwrap();
    }

    #[test]
    fn test_reopen_same_path() {
        let backend = MemoryBackend::new().with_device("DEV0");
        let registry = Arc::new(SessionRegistry::new());
        let mut ctl = controller(&backend, &registry);

        ctl.open("DEV0").unwrap();
        let wide = Geometry::new(9, 34, 1).unwrap();
        ctl.open_with("DEV0", wide).unwrap();
        assert_eq!(ctl.session().unwrap().expected_frame_size(), 306);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_two_controllers_same_path() {
        let backend = MemoryBackend::new().with_device("DEV0");
        let registry = Arc::new(SessionRegistry::new());
        let mut first = controller(&backend, &registry);
        let mut second = controller(&backend, &registry);

        first.open("DEV0").unwrap();
        assert!(matches!(second.open("DEV0"), Err(Error::AccessDenied(_))));

        drop(first);
        second.open("DEV0").unwrap();
    }
}
