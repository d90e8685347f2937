//! Read operations for backends.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Read;

use crate::{FsError, Metadata};

/// Read operations for a backend.
///
/// Locations are backend-relative strings with the protocol stripped, using
/// the backend's separator.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self`; backends
/// use interior mutability (`RwLock`, `Mutex`) for their own state.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsRead`.
pub trait FsRead: Send + Sync {
    /// Read entire file contents as bytes.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the location does not exist
    /// - [`FsError::NotAFile`] if the location is a directory
    fn read(&self, path: &str) -> Result<Vec<u8>, FsError>;

    /// Read up to `len` bytes starting at `offset`.
    ///
    /// Reading past the end returns the bytes that exist (possibly none).
    fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>, FsError>;

    /// Check if a location exists.
    ///
    /// Returns `Ok(false)` for missing locations; errors are reserved for
    /// unexpected failures.
    fn exists(&self, path: &str) -> Result<bool, FsError>;

    /// Get metadata for a location (follows symlinks).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the location does not exist
    fn metadata(&self, path: &str) -> Result<Metadata, FsError>;

    /// Open a file for streaming reads.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the location does not exist
    /// - [`FsError::NotAFile`] if the location is a directory
    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>, FsError>;

    /// Content-independent checksum of a location.
    ///
    /// The default hashes the metadata, so it changes whenever size or
    /// modification time change. Backends with server-side checksums (ETags,
    /// CRCs) should override it.
    fn checksum(&self, path: &str) -> Result<u64, FsError> {
        let meta = self.metadata(path)?;
        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        meta.size.hash(&mut hasher);
        meta.modified.hash(&mut hasher);
        meta.file_type.hash(&mut hasher);
        Ok(hasher.finish())
    }
}
