//! Error types for anypath.
//!
//! Two layers of errors exist:
//!
//! - [`FsError`] is what a backend returns. It describes what went wrong at the
//!   storage level and carries the backend location involved.
//! - [`PathError`] is what [`UPath`](crate::UPath) operations return. Backend
//!   failures pass through unchanged in kind, wrapped with the operation name
//!   and the full address of the path that triggered them.

use std::io;

use crate::transfer::TransferReport;

/// Backend error type with contextual variants.
///
/// All variants carry the backend location (protocol stripped) and, where it
/// helps, the operation that failed. Uses `#[non_exhaustive]` for forward
/// compatibility.
///
/// # Examples
///
/// ```rust
/// use anypath::FsError;
///
/// let err = FsError::NotFound { path: "bucket/missing.txt".into() };
/// assert_eq!(err.to_string(), "not found: bucket/missing.txt");
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// Path does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The location that was not found.
        path: String,
    },

    /// Path already exists when it shouldn't.
    #[error("{operation}: already exists: {path}")]
    AlreadyExists {
        /// The location that already exists.
        path: String,
        /// The operation that failed.
        operation: &'static str,
    },

    /// Expected a file but found something else.
    #[error("not a file: {path}")]
    NotAFile {
        /// The location that is not a file.
        path: String,
    },

    /// Expected a directory but found something else.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The location that is not a directory.
        path: String,
    },

    /// Directory is not empty when it should be.
    #[error("directory not empty: {path}")]
    DirectoryNotEmpty {
        /// The location of the non-empty directory.
        path: String,
    },

    /// Permission denied for operation.
    #[error("{operation}: permission denied: {path}")]
    PermissionDenied {
        /// The location where permission was denied.
        path: String,
        /// The operation that was denied.
        operation: &'static str,
    },

    /// Invalid data encountered.
    #[error("invalid data: {path} ({details})")]
    InvalidData {
        /// The location with invalid data.
        path: String,
        /// Details about the invalid data.
        details: String,
    },

    /// The backend does not implement this capability.
    #[error("operation not supported: {operation}")]
    NotSupported {
        /// The unsupported operation.
        operation: &'static str,
    },

    /// No backend factory is registered for the protocol.
    #[error("no backend registered for protocol {protocol:?}")]
    UnknownProtocol {
        /// The protocol that could not be resolved.
        protocol: String,
    },

    /// Generic backend error.
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error with context.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The location involved in the operation.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Convert an I/O error, keeping the location and operation as context.
    ///
    /// Common [`io::ErrorKind`]s map onto the specific variants so callers can
    /// match on them regardless of which backend produced them.
    pub fn io(operation: &'static str, path: impl Into<String>, error: io::Error) -> Self {
        let path = path.into();
        match error.kind() {
            io::ErrorKind::NotFound => FsError::NotFound { path },
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied { path, operation },
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists { path, operation },
            io::ErrorKind::NotADirectory => FsError::NotADirectory { path },
            io::ErrorKind::IsADirectory => FsError::NotAFile { path },
            io::ErrorKind::DirectoryNotEmpty => FsError::DirectoryNotEmpty { path },
            _ => FsError::Io {
                operation,
                path,
                source: error,
            },
        }
    }
}

impl From<io::Error> for FsError {
    fn from(error: io::Error) -> Self {
        FsError::io("io", String::new(), error)
    }
}

/// Error returned by [`UPath`](crate::UPath) operations.
///
/// Structural and local-only checks fail before any I/O. Delegated operations
/// wrap backend failures in [`PathError::Backend`] without reinterpreting them.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// A local-only operation was invoked on a non-local path.
    #[error("{operation} is not supported for protocol {protocol:?}: {path}")]
    Unsupported {
        /// The rejected operation.
        operation: &'static str,
        /// Protocol of the path.
        protocol: String,
        /// Full address of the path.
        path: String,
    },

    /// Malformed structural input.
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath {
        /// The offending path or argument.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// `relative_to` was called with a path that is not a prefix.
    #[error("{path:?} is not relative to {other:?}")]
    RelativePath {
        /// Full address of the path.
        path: String,
        /// Full address of the attempted base.
        other: String,
    },

    /// A backend operation failed.
    #[error("{operation} failed for {path}: {source}")]
    Backend {
        /// The path operation that failed.
        operation: &'static str,
        /// Full address of the path.
        path: String,
        /// The backend error.
        #[source]
        source: FsError,
    },

    /// A best-effort transfer finished with failures.
    #[error("transfer finished with {} failure(s) and {} success(es)", .0.failed.len(), .0.succeeded.len())]
    Transfer(TransferReport),
}

impl PathError {
    /// Returns the backend error if this is a [`PathError::Backend`].
    pub fn backend_error(&self) -> Option<&FsError> {
        match self {
            PathError::Backend { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns `true` when the underlying backend reported a missing path.
    pub fn is_not_found(&self) -> bool {
        matches!(self.backend_error(), Some(FsError::NotFound { .. }))
    }
}
