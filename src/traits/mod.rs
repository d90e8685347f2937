//! # Backend Traits
//!
//! The capability interface every storage backend implements.
//!
//! ```text
//! FsRead + FsWrite + FsDir + FsSession = Fs
//! ```
//!
//! | Trait | Methods |
//! |-------|---------|
//! | [`FsRead`] | `read`, `read_range`, `exists`, `metadata`, `open_read`, `checksum` |
//! | [`FsWrite`] | `write`, `remove_file`, `rename`, `copy`, `open_write`, `touch` |
//! | [`FsDir`] | `read_dir`, `create_dir`, `create_dir_all`, `remove_dir`, `remove_dir_all` |
//! | [`FsSession`] | `sep`, `sign`, `invalidate_cache` (all defaulted) |
//!
//! All traits take backend locations as `&str`: the protocol and wrapper
//! chain are already stripped, and the location uses the backend's own
//! separator.
//!
//! ## Blanket Implementation
//!
//! Implement the four component traits and [`Fs`] comes for free:
//!
//! ```rust
//! use anypath::{Fs, FsDir, FsError, FsRead, FsSession, FsWrite, Metadata, ReadDirIter};
//!
//! struct NullBackend;
//!
//! # impl FsRead for NullBackend {
//! #     fn read(&self, _: &str) -> Result<Vec<u8>, FsError> { Ok(vec![]) }
//! #     fn read_range(&self, _: &str, _: u64, _: usize) -> Result<Vec<u8>, FsError> { Ok(vec![]) }
//! #     fn exists(&self, _: &str) -> Result<bool, FsError> { Ok(false) }
//! #     fn metadata(&self, p: &str) -> Result<Metadata, FsError> { Err(FsError::NotFound { path: p.into() }) }
//! #     fn open_read(&self, _: &str) -> Result<Box<dyn std::io::Read + Send>, FsError> { Ok(Box::new(std::io::empty())) }
//! # }
//! # impl FsWrite for NullBackend {
//! #     fn write(&self, _: &str, _: &[u8]) -> Result<(), FsError> { Ok(()) }
//! #     fn remove_file(&self, _: &str) -> Result<(), FsError> { Ok(()) }
//! #     fn rename(&self, _: &str, _: &str) -> Result<(), FsError> { Ok(()) }
//! #     fn copy(&self, _: &str, _: &str) -> Result<(), FsError> { Ok(()) }
//! #     fn open_write(&self, _: &str) -> Result<Box<dyn std::io::Write + Send>, FsError> { Ok(Box::new(std::io::sink())) }
//! #     fn touch(&self, _: &str, _: bool) -> Result<(), FsError> { Ok(()) }
//! # }
//! # impl FsDir for NullBackend {
//! #     fn read_dir(&self, _: &str) -> Result<ReadDirIter, FsError> { Ok(ReadDirIter::from_vec(vec![])) }
//! #     fn create_dir(&self, _: &str) -> Result<(), FsError> { Ok(()) }
//! #     fn create_dir_all(&self, _: &str) -> Result<(), FsError> { Ok(()) }
//! #     fn remove_dir(&self, _: &str) -> Result<(), FsError> { Ok(()) }
//! #     fn remove_dir_all(&self, _: &str) -> Result<(), FsError> { Ok(()) }
//! # }
//! impl FsSession for NullBackend {}
//!
//! fn use_fs(_: &dyn Fs) {}
//! use_fs(&NullBackend);
//! ```

mod fs_dir;
mod fs_read;
mod fs_session;
mod fs_write;

pub use fs_dir::{FsDir, ReadDirIter};
pub use fs_read::FsRead;
pub use fs_session::FsSession;
pub use fs_write::FsWrite;

/// A complete backend: reading, writing, directories and session behavior.
///
/// This is the handle type the resolver hands out (`Arc<dyn Fs>`) and the
/// only thing a [`UPath`](crate::UPath) knows about its storage.
///
/// # Blanket Implementation
///
/// Automatically implemented for any type that implements all four component
/// traits. Never implement `Fs` directly.
pub trait Fs: FsRead + FsWrite + FsDir + FsSession {}

impl<T: FsRead + FsWrite + FsDir + FsSession> Fs for T {}
