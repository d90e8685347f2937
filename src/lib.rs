//! # anypath
//!
//! **pathlib-style paths over local disk and pluggable remote backends.**
//!
//! One value type, [`UPath`], addresses local files, object stores and
//! chained/cached protocols with the same syntax. Structural operations are
//! pure string algebra. I/O goes through a shared backend handle that the
//! path's [`Resolver`] hands out per `(protocol, options)`.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use anypath::UPath;
//!
//! # fn main() -> Result<(), anypath::PathError> {
//! let root = UPath::new("memory://bucket/reports")?;
//! let file = &root / "2024/q1.csv";
//! file.write_text("region,total\neu,10\n")?;
//!
//! assert_eq!(file.suffix(), ".csv");
//! assert_eq!(file.parent().name(), "2024");
//! assert_eq!(file.relative_to(&root)?, "2024/q1.csv");
//! assert_eq!(root.rglob("*.csv")?, vec![file.clone()]);
//! # Ok(())
//! # }
//! ```
//!
//! ---
//!
//! ## Addresses
//!
//! ```text
//! [wrapper::]*[scheme://]location
//!
//! simplecache::s3://bucket/key.txt   wrappers ["simplecache"], protocol "s3"
//! gs://bucket/key                    protocol "gs"
//! /local/abs/path                    protocol "file"
//! relative/path                      protocol "file"
//! ```
//!
//! Without a `scheme://` the address is a local path. See [`protocol`].
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`UPath`] | The path value: structural, local-only and delegated operations |
//! | [`Resolver`] | `(protocol, options)` → shared backend handle, with invalidation |
//! | [`Fs`] | Backend capability interface (`FsRead + FsWrite + FsDir + FsSession`) |
//! | [`FsExt`] | walk / find / glob / du / head / tail built on the primitives |
//! | [`PathError`] | Errors from path operations |
//! | [`FsError`] | Errors from backends |
//! | [`BackendOptions`] | Per-backend configuration, compared by value |
//!
//! ---
//!
//! ## Operation Routing
//!
//! | Class | Examples | Non-local paths |
//! |-------|----------|-----------------|
//! | structural | `parent`, `join`, `with_suffix`, `relative_to`, `matches` | same rules, remote flavor |
//! | local-only | `chmod`, `owner`, `is_symlink`, `symlink_to` | [`PathError::Unsupported`], nothing resolved |
//! | universal | `is_absolute`, `is_reserved`, `resolve` | fixed fallback answer |
//! | delegated | `exists`, `ls`, `read_bytes`, `mkdir`, `sign` | forwarded to the backend |
//!
//! Copies and moves between different backends stream through
//! [`transfer`], with fail-fast or best-effort error handling ([`OnError`]).
//!
//! ---
//!
//! ## Backends
//!
//! Every resolver knows `file` ([`LocalBackend`]) and `memory`
//! ([`MemoryBackend`]). Others are registered as factories:
//!
//! ```rust
//! use std::sync::Arc;
//! use anypath::{BackendContext, BackendOptions, Fs, FsError, MemoryBackend, Resolver, ResolverConfig, UPath};
//!
//! let resolver = Arc::new(Resolver::new(ResolverConfig::default()));
//! resolver.register("s3", |ctx: &BackendContext<'_>| -> Result<Arc<dyn Fs>, FsError> {
//!     // a real factory would build a client from ctx.options
//!     let _region = ctx.options.get("region");
//!     Ok(Arc::new(MemoryBackend::new()))
//! });
//!
//! let opts = BackendOptions::new().with("region", "eu-west-1");
//! let p = UPath::in_resolver("s3://bucket/key", opts, resolver).unwrap();
//! assert!(!p.exists().unwrap());
//! ```
//!
//! ---
//!
//! ## Thread Safety
//!
//! All backend traits require `Send + Sync` and take `&self`. `UPath` is
//! immutable and `Send + Sync`. The resolver's handle map and the session
//! cache are the only shared mutable state, behind `RwLock`s.
//!
//! ---
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade (handle construction and
//! invalidation, transfer decisions, best-effort failures) and never
//! installs a logger.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for [`Metadata`], [`DirEntry`], [`Permissions`], [`BackendOptions`]; `UPath::read_json` / `write_json` |

// Private modules
mod backends;
mod error;
mod ext;
mod path;
mod resolver;
mod session;
mod traits;
mod types;

// Public modules
pub mod protocol;
pub mod pure;
pub mod transfer;

// Public re-exports - error types
pub use error::{FsError, PathError};

// Public re-exports - core types
pub use types::{BackendOptions, DirEntry, FileType, Metadata, Permissions, WalkEntry};

// Public re-exports - backend traits
pub use traits::{Fs, FsDir, FsRead, FsSession, FsWrite, ReadDirIter};

// Public re-exports - path value
pub use path::{Parents, UPath};

// Public re-exports - resolution
pub use resolver::{
    BackendContext, BackendFactory, Resolver, ResolverConfig, SessionCacheConfig, DEFAULT_SESSION_PROTOCOL,
    MEMORY_PROTOCOL, SESSION_CACHE_ENV,
};
pub use session::SessionCache;

// Public re-exports - backends and transfers
pub use backends::{LocalBackend, MemoryBackend};
pub use transfer::{OnError, TransferFailure, TransferReport};

// Public re-exports - infrastructure
pub use ext::FsExt;

// Conditional re-exports
#[cfg(feature = "serde")]
pub use ext::FsExtJson;
