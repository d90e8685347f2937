//! Write operations for backends.

use std::io::Write;

use crate::FsError;

/// Write operations for a backend.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsWrite`.
pub trait FsWrite: Send + Sync {
    /// Write data to a file (creates if missing, truncates if present).
    ///
    /// Whether missing parent directories are an error is backend-specific:
    /// local disks require them, object stores do not.
    fn write(&self, path: &str, data: &[u8]) -> Result<(), FsError>;

    /// Remove a file.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the file does not exist
    /// - [`FsError::NotAFile`] if the location is a directory
    fn remove_file(&self, path: &str) -> Result<(), FsError>;

    /// Rename/move a file or directory within this backend.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the source does not exist
    fn rename(&self, from: &str, to: &str) -> Result<(), FsError>;

    /// Copy a file within this backend.
    ///
    /// This is the native primitive used for same-backend transfers, so
    /// backends should use server-side copies where they exist.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the source does not exist
    /// - [`FsError::NotAFile`] if the source is a directory
    fn copy(&self, from: &str, to: &str) -> Result<(), FsError>;

    /// Open a file for streaming writes.
    ///
    /// Data is only guaranteed to be visible after the writer is flushed or
    /// dropped.
    fn open_write(&self, path: &str) -> Result<Box<dyn Write + Send>, FsError>;

    /// Create an empty file, or with `truncate` empty an existing one.
    ///
    /// Without `truncate` an existing file keeps its contents; backends that
    /// track modification times bump the timestamp.
    fn touch(&self, path: &str, truncate: bool) -> Result<(), FsError>;
}
