//! Directory operations for backends.

use crate::{DirEntry, FsError};

/// Directory operations for a backend.
///
/// Object stores have no real directories; they report key prefixes as
/// directories and may treat `create_dir` as a no-op.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsDir`.
pub trait FsDir: Send + Sync {
    /// List directory contents.
    ///
    /// The outer `Result` says whether the directory could be opened; each
    /// item's `Result` says whether that entry could be read.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the location does not exist
    /// - [`FsError::NotADirectory`] if the location is not a directory
    fn read_dir(&self, path: &str) -> Result<ReadDirIter, FsError>;

    /// Create a directory (parent must exist).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the parent does not exist
    /// - [`FsError::AlreadyExists`] if the location already exists
    fn create_dir(&self, path: &str) -> Result<(), FsError>;

    /// Create a directory and all missing parents. Idempotent.
    fn create_dir_all(&self, path: &str) -> Result<(), FsError>;

    /// Remove an empty directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the location does not exist
    /// - [`FsError::DirectoryNotEmpty`] if the directory is not empty
    fn remove_dir(&self, path: &str) -> Result<(), FsError>;

    /// Remove a directory and everything below it.
    fn remove_dir_all(&self, path: &str) -> Result<(), FsError>;
}

/// Iterator over directory entries.
///
/// Wraps a boxed iterator so every backend can return its own listing type.
///
/// - Outer `Result` (from [`FsDir::read_dir`]) = "can I open this directory?"
/// - Inner `Result` (per item) = "can I read this entry?"
pub struct ReadDirIter(Box<dyn Iterator<Item = Result<DirEntry, FsError>> + Send + 'static>);

impl ReadDirIter {
    /// Create from any compatible iterator.
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = Result<DirEntry, FsError>> + Send + 'static,
    {
        Self(Box::new(iter))
    }

    /// Create from a pre-collected vector.
    pub fn from_vec(entries: Vec<Result<DirEntry, FsError>>) -> Self {
        Self(Box::new(entries.into_iter()))
    }

    /// Collect all entries, short-circuiting on first error.
    pub fn collect_all(self) -> Result<Vec<DirEntry>, FsError> {
        self.collect()
    }
}

impl Iterator for ReadDirIter {
    type Item = Result<DirEntry, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}
