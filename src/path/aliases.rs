//! Alternative names for existing operations.

use super::UPath;
use crate::transfer::{OnError, TransferReport};
use crate::{Metadata, PathError};

impl UPath {
    /// Same as [`info`](UPath::info).
    pub fn stat(&self) -> Result<Metadata, PathError> {
        self.info()
    }

    /// Same as [`ls`](UPath::ls).
    pub fn listdir(&self) -> Result<Vec<UPath>, PathError> {
        self.ls()
    }

    /// Same as [`rm`](UPath::rm) without recursion.
    pub fn unlink(&self) -> Result<(), PathError> {
        self.rm(false)
    }

    /// Same as [`rm`](UPath::rm).
    pub fn delete(&self, recursive: bool) -> Result<(), PathError> {
        self.rm(recursive)
    }

    /// Same as [`copy`](UPath::copy).
    pub fn cp(&self, dst: &UPath, recursive: bool, on_error: OnError) -> Result<TransferReport, PathError> {
        self.copy(dst, recursive, on_error)
    }

    /// Same as [`move_to`](UPath::move_to).
    pub fn mv(&self, dst: &UPath, recursive: bool, on_error: OnError) -> Result<TransferReport, PathError> {
        self.move_to(dst, recursive, on_error)
    }

    /// Same as [`move_to`](UPath::move_to); call it as `path.r#move(..)`.
    pub fn r#move(&self, dst: &UPath, recursive: bool, on_error: OnError) -> Result<TransferReport, PathError> {
        self.move_to(dst, recursive, on_error)
    }

    /// Move (recursively, fail-fast) to `target` and return it.
    pub fn rename(&self, target: &UPath) -> Result<UPath, PathError> {
        self.move_to(target, true, OnError::Raise)?;
        Ok(target.clone())
    }

    /// Same as [`rename`](UPath::rename).
    pub fn replace(&self, target: &UPath) -> Result<UPath, PathError> {
        self.rename(target)
    }

    /// Same as [`mkdir`](UPath::mkdir).
    pub fn makedir(&self, parents: bool, exist_ok: bool) -> Result<(), PathError> {
        self.mkdir(parents, exist_ok)
    }

    /// Same as [`makedirs`](UPath::makedirs).
    pub fn mkdirs(&self, exist_ok: bool) -> Result<(), PathError> {
        self.makedirs(exist_ok)
    }

    /// Same as [`du`](UPath::du).
    pub fn disk_usage(&self, maxdepth: Option<usize>) -> Result<u64, PathError> {
        self.du(maxdepth)
    }

    /// Same as [`put`](UPath::put).
    pub fn upload(&self, target: &UPath, recursive: bool) -> Result<TransferReport, PathError> {
        self.put(target, recursive)
    }

    /// Same as [`get`](UPath::get).
    pub fn download(&self, target: &UPath, recursive: bool) -> Result<TransferReport, PathError> {
        self.get(target, recursive)
    }

    /// Same as [`write_bytes`](UPath::write_bytes).
    pub fn pipe_file(&self, data: &[u8]) -> Result<(), PathError> {
        self.write_bytes(data)
    }

    /// Whether `other` addresses the same location.
    ///
    /// Local paths are resolved first, so a relative path equals its
    /// absolute form. Anything else compares as `==`.
    pub fn samefile(&self, other: &UPath) -> bool {
        let absolute = |path: &UPath| path.resolve(false).unwrap_or_else(|_| path.clone());
        absolute(self) == absolute(other)
    }
}
