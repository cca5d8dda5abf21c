//! Registry of device paths currently held by open sessions.

use crate::{Error, Result};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Tracks which device paths are claimed, so two sessions never drive the
/// same matrix.
///
/// Share one registry (behind an `Arc`) between every session that may
/// target the same devices.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    claimed: Mutex<HashSet<String>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn claimed(&self) -> MutexGuard<'_, HashSet<String>> {
        self.claimed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims `path`, failing with `AccessDenied` if it is already held.
    ///
    /// The claim is released when the returned guard is dropped.
    pub fn claim(self: &Arc<Self>, path: &str) -> Result<PathClaim> {
        if !self.claimed().insert(path.to_string()) {
            return Err(Error::AccessDenied(path.to_string()));
        }
        debug!("Claimed {}", path);
        Ok(PathClaim {
            registry: Arc::clone(self),
            path: path.to_string(),
        })
    }

    /// Whether `path` is currently claimed.
    pub fn is_claimed(&self, path: &str) -> bool {
        self.claimed().contains(path)
    }

    /// Number of claimed paths.
    pub fn len(&self) -> usize {
        self.claimed().len()
    }

    /// Whether no paths are claimed.
    pub fn is_empty(&self) -> bool {
        self.claimed().is_empty()
    }
}

/// Exclusive ownership of a device path. Dropping it releases the path.
#[derive(Debug)]
pub struct PathClaim {
    registry: Arc<SessionRegistry>,
    path: String,
}

impl PathClaim {
    /// The claimed path.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Drop for PathClaim {
    fn drop(&mut self) {
        self.registry.claimed().remove(&self.path);
        debug!("Released {}", self.path);
    }
}
