//! Dispatch helpers shared by the local-only and delegated operations.

use std::io;

use super::UPath;
use crate::{Fs, FsError, PathError};

impl UPath {
    /// Reject a local-only operation on a non-local path.
    ///
    /// Runs before anything else, so a rejected call never resolves a
    /// backend.
    pub(crate) fn require_local(&self, operation: &'static str) -> Result<(), PathError> {
        if self.is_local() {
            Ok(())
        } else {
            Err(PathError::Unsupported {
                operation,
                protocol: self.protocol.clone(),
                path: self.urlpath(),
            })
        }
    }

    /// Resolve the backend and run `f` with it and this path's location.
    pub(crate) fn delegate<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&dyn Fs, &str) -> Result<T, FsError>,
    ) -> Result<T, PathError> {
        let fs = self
            .resolver
            .resolve(&self.protocol, &self.options)
            .map_err(|e| self.backend_err(operation, e))?;
        f(fs.as_ref(), &self.location).map_err(|e| self.backend_err(operation, e))
    }

    pub(crate) fn backend_err(&self, operation: &'static str, source: FsError) -> PathError {
        PathError::Backend {
            operation,
            path: self.urlpath(),
            source,
        }
    }

    pub(crate) fn io_err(&self, operation: &'static str, error: io::Error) -> PathError {
        self.backend_err(operation, FsError::io(operation, self.location.clone(), error))
    }
}
