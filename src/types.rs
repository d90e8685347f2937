//! Core value types shared by backends and paths.

use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

/// Type of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileType {
    /// Regular file or object.
    File,
    /// Directory, or a key prefix on object stores.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Anything else (sockets, devices, FIFOs).
    Other,
}

/// Metadata for a filesystem entry.
///
/// Remote stores rarely report every field, so the timestamps and permissions
/// are optional.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metadata {
    /// Type of the entry.
    pub file_type: FileType,
    /// Size in bytes (0 for directories).
    pub size: u64,
    /// Creation time, if the backend tracks it.
    pub created: Option<SystemTime>,
    /// Last modification time, if the backend tracks it.
    pub modified: Option<SystemTime>,
    /// Permission bits, if the backend has them.
    pub permissions: Option<Permissions>,
}

impl Metadata {
    /// Returns `true` if this is a regular file.
    #[inline]
    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    /// Returns `true` if this is a symbolic link.
    #[inline]
    pub fn is_symlink(&self) -> bool {
        self.file_type == FileType::Symlink
    }

    /// Metadata for a directory with nothing else known.
    pub fn directory() -> Self {
        Self {
            file_type: FileType::Directory,
            ..Default::default()
        }
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            file_type: FileType::File,
            size: 0,
            created: None,
            modified: None,
            permissions: None,
        }
    }
}

/// A directory entry returned from `read_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirEntry {
    /// Name of the entry (final segment only).
    pub name: String,
    /// Full backend location of the entry.
    pub path: String,
    /// Type of the entry.
    pub file_type: FileType,
    /// Size in bytes.
    pub size: u64,
}

/// Unix-style permissions stored as a mode bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Permissions(u32);

impl Permissions {
    /// Create permissions from a Unix mode (e.g., 0o755).
    #[inline]
    pub const fn from_mode(mode: u32) -> Self {
        Self(mode & 0o7777)
    }

    /// Get the raw mode value.
    #[inline]
    pub const fn mode(&self) -> u32 {
        self.0
    }

    /// Returns `true` if these permissions deny writing.
    #[inline]
    pub const fn readonly(&self) -> bool {
        (self.0 & 0o222) == 0
    }
}

/// One level of a top-down directory walk.
///
/// `dirs` and `files` hold entry names; join them onto `root` to get paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry<P> {
    /// The directory being listed.
    pub root: P,
    /// Names of subdirectories.
    pub dirs: Vec<String>,
    /// Names of files.
    pub files: Vec<String>,
}

/// Backend-specific configuration (credentials, endpoints, cache flags).
///
/// Options are kept in key order, so two option sets with the same entries
/// compare and hash equal no matter how they were built. The resolver relies on
/// this to share backend handles.
///
/// ```rust
/// use anypath::BackendOptions;
///
/// let a = BackendOptions::new().with("region", "eu-west-1").with("anon", "true");
/// let b = BackendOptions::new().with("anon", "true").with("region", "eu-west-1");
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BackendOptions(BTreeMap<String, String>);

impl BackendOptions {
    /// Empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert or replace an option.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up an option.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns `true` if no options are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over options in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for BackendOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl fmt::Display for BackendOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}={value}")?;
        }
        f.write_str("}")
    }
}
