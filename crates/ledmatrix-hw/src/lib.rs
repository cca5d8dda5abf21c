//! LED Matrix Hardware Library
//!
//! Session management and frame transfer for USB-attached LED matrices.
//! A [`MatrixSession`] holds one device exclusively; frames are staged
//! locally, then committed to the device over a [`UsbBackend`].

pub mod controller;
pub mod error;
pub mod ffi;
pub mod frame;
pub mod geometry;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod transport;

pub use controller::Controller;
pub use error::{status_code, Error, Result, STATUS_OK};
pub use frame::Frame;
pub use geometry::Geometry;
pub use registry::{PathClaim, SessionRegistry};
pub use session::MatrixSession;
pub use transport::{HidBackend, MemoryBackend, UsbBackend, UsbHandle};
