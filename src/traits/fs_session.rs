//! Session-level backend capabilities.

use std::time::Duration;

use crate::FsError;

/// Backend-wide behavior that is not tied to reading or writing one file.
///
/// Every method has a default, so simple backends only write
/// `impl FsSession for MyBackend {}`.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsSession`.
pub trait FsSession: Send + Sync {
    /// Separator used in this backend's locations.
    fn sep(&self) -> char {
        '/'
    }

    /// Whether glob patterns match names ignoring ASCII case.
    fn case_insensitive(&self) -> bool {
        false
    }

    /// Produce a URL granting temporary access to a location.
    ///
    /// # Errors
    ///
    /// [`FsError::NotSupported`] unless the backend can sign URLs.
    fn sign(&self, path: &str, expiration: Duration) -> Result<String, FsError> {
        let _ = (path, expiration);
        Err(FsError::NotSupported { operation: "sign" })
    }

    /// Drop cached listings for `path`, or for everything when `None`.
    fn invalidate_cache(&self, path: Option<&str>) -> Result<(), FsError> {
        let _ = path;
        Ok(())
    }
}
