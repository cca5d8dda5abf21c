//! C ABI for foreign callers.
//!
//! Handles are heap-allocated [`Controller`]s. Every call returns `0` on
//! success or the status code of the failure (see [`Error::status`]).
//!
//! Controllers created here share one process-wide [`SessionRegistry`],
//! since `NewController` has nowhere to receive one from.

#![allow(non_snake_case)]

use crate::controller::Controller;
use crate::error::status_code;
use crate::registry::SessionRegistry;
use crate::transport::HidBackend;
use crate::{Error, Geometry};
use std::ffi::{c_char, c_int, CStr};
use std::sync::{Arc, OnceLock};
use tracing::warn;

static REGISTRY: OnceLock<Arc<SessionRegistry>> = OnceLock::new();

fn registry() -> Arc<SessionRegistry> {
    Arc::clone(REGISTRY.get_or_init(|| Arc::new(SessionRegistry::new())))
}

fn into_handle(controller: Controller) -> *mut Controller {
    Box::into_raw(Box::new(controller))
}

/// Creates a new, unopened controller using the HID backend.
#[no_mangle]
pub extern "C" fn NewController() -> *mut Controller {
    into_handle(Controller::new(
        Arc::new(HidBackend::new()),
        registry(),
        Geometry::default(),
    ))
}

/// Binds a controller to the device at `path` with the given geometry.
///
/// # Safety
///
/// `handle` must be null or a pointer returned by `NewController` that has
/// not been deleted. `path` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn OpenController(
    handle: *mut Controller,
    path: *const c_char,
    rows: u16,
    columns: u16,
    bytes_per_pixel: u8,
) -> c_int {
    let Some(controller) = handle.as_mut() else {
        return Error::SessionClosed.status();
    };
    if path.is_null() {
        return Error::DeviceNotFound(String::new()).status();
    }
    let Ok(path) = CStr::from_ptr(path).to_str() else {
        warn!("Rejected device path that is not valid UTF-8");
        return Error::DeviceNotFound(String::new()).status();
    };

    let result = Geometry::new(rows, columns, bytes_per_pixel)
        .and_then(|geometry| controller.open_with(path, geometry));
    status_code(&result)
}

/// Closes (if open) and frees a controller. Null is ignored.
///
/// # Safety
///
/// `handle` must be null or a pointer returned by `NewController` that has
/// not already been deleted.
#[no_mangle]
pub unsafe extern "C" fn DeleteController(handle: *mut Controller) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Stages `len` bytes from `buffer` as the next frame.
///
/// # Safety
///
/// `handle` as for `OpenController`. `buffer` must be null (only with
/// `len == 0`) or point to at least `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn PrepareDraw(
    handle: *mut Controller,
    buffer: *const u8,
    len: usize,
) -> c_int {
    let Some(controller) = handle.as_ref() else {
        return Error::SessionClosed.status();
    };
    let frame: &[u8] = if buffer.is_null() {
        if len != 0 {
            return Error::InvalidFrameSize {
                expected: controller.geometry().frame_size(),
                actual: 0,
            }
            .status();
        }
        &[]
    } else {
        std::slice::from_raw_parts(buffer, len)
    };
    status_code(&controller.prepare_draw(frame))
}

/// Commits the staged frame.
///
/// # Safety
///
/// `handle` as for `OpenController`.
#[no_mangle]
pub unsafe extern "C" fn DrawMatrix(handle: *mut Controller) -> c_int {
    match handle.as_ref() {
        Some(controller) => status_code(&controller.draw()),
        None => Error::SessionClosed.status(),
    }
}

/// Blanks the display.
///
/// # Safety
///
/// `handle` as for `OpenController`.
#[no_mangle]
pub unsafe extern "C" fn ClearMatrix(handle: *mut Controller) -> c_int {
    match handle.as_ref() {
        Some(controller) => status_code(&controller.clear()),
        None => Error::SessionClosed.status(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::STATUS_OK;
    use crate::transport::{MemoryBackend, UsbBackend};
    use std::ffi::CString;

    fn memory_handle(backend: &MemoryBackend) -> *mut Controller {
        into_handle(Controller::new(
            Arc::new(backend.clone()),
            Arc::new(SessionRegistry::new()),
            Geometry::default(),
        ))
    }

    #[test]
    fn test_draw_scenario() {
        let backend = MemoryBackend::new().with_device("DEV0");
        let handle = memory_handle(&backend);
        let path = CString::new("DEV0").unwrap();
        let frame = [0x42u8; 64];

        unsafe {
            assert_eq!(OpenController(handle, path.as_ptr(), 8, 8, 1), STATUS_OK);
            assert_eq!(PrepareDraw(handle, frame.as_ptr(), frame.len()), STATUS_OK);
            assert_eq!(DrawMatrix(handle), STATUS_OK);
            assert_eq!(DrawMatrix(handle), Error::NoFrameStaged.status());
            assert_eq!(ClearMatrix(handle), STATUS_OK);
            DeleteController(handle);
        }

        assert_eq!(backend.frame_writes("DEV0"), vec![frame.to_vec()]);
        // The device was released with the handle
        assert!(backend.open("DEV0").is_ok());
    }

    #[test]
    fn test_wrong_size_reports_status() {
        let backend = MemoryBackend::new().with_device("DEV0");
        let handle = memory_handle(&backend);
        let path = CString::new("DEV0").unwrap();
        let short = [0u8; 10];

        unsafe {
            assert_eq!(OpenController(handle, path.as_ptr(), 8, 8, 1), STATUS_OK);
            let status = PrepareDraw(handle, short.as_ptr(), short.len());
            assert_ne!(status, STATUS_OK);
            assert_eq!(status, 4);
            assert_eq!(PrepareDraw(handle, std::ptr::null(), 64), 4);
            DeleteController(handle);
        }
        assert_eq!(backend.write_count("DEV0"), 0);
    }

    #[test]
    fn test_non_utf8_path_rejected() {
        let backend = MemoryBackend::new().with_device("DEV0");
        let handle = memory_handle(&backend);
        let path = CString::new("DEV0").unwrap();
        let garbled = CString::new(vec![b'D', 0xFF, 0xFE]).unwrap();

        unsafe {
            assert_eq!(OpenController(handle, path.as_ptr(), 8, 8, 1), STATUS_OK);
            assert_eq!(
                OpenController(handle, garbled.as_ptr(), 8, 8, 1),
                Error::DeviceNotFound(String::new()).status()
            );
            // The existing session is untouched
            assert_eq!((*handle).path(), Some("DEV0"));
            assert_eq!(ClearMatrix(handle), STATUS_OK);
            DeleteController(handle);
        }
    }

    #[test]
    fn test_unopened_and_null_handles() {
        let backend = MemoryBackend::new();
        let handle = memory_handle(&backend);
        let missing = CString::new("DEV0").unwrap();

        unsafe {
            assert_eq!(DrawMatrix(handle), Error::SessionClosed.status());
            assert_eq!(ClearMatrix(handle), Error::SessionClosed.status());
            assert_eq!(
                OpenController(handle, missing.as_ptr(), 8, 8, 1),
                Error::DeviceNotFound(String::new()).status()
            );
            assert_eq!(
                OpenController(handle, missing.as_ptr(), 0, 8, 1),
                Error::InvalidGeometry(String::new()).status()
            );
            DeleteController(handle);

            let null = std::ptr::null_mut();
            assert_eq!(DrawMatrix(null), Error::SessionClosed.status());
            assert_eq!(PrepareDraw(null, std::ptr::null(), 0), 3);
            DeleteController(null);
        }
    }
}
