//! # UPath
//!
//! One immutable path value for local disk and remote stores.
//!
//! A [`UPath`] is a parsed address (wrapper chain, protocol, location) plus
//! backend options and the [`Resolver`] that supplies its backend. The
//! operations are grouped by how they are routed:
//!
//! | Group | Module | Touches a backend |
//! |-------|--------|-------------------|
//! | structural (`parent`, `join`, `with_suffix`...) | `pure_ops` | never |
//! | local-only (`chmod`, `owner`, `is_symlink`...) | `local_ops` | `std::fs` directly, local paths only |
//! | delegated (`exists`, `ls`, `read_bytes`, `mkdir`...) | `delegated` | resolved handle |
//! | aliases (`stat`, `unlink`, `mv`...) | `aliases` | whatever the target does |
//!
//! ```rust
//! use anypath::UPath;
//!
//! let p = UPath::new("s3://bucket/data/2024/report.csv").unwrap();
//! assert_eq!(p.protocol(), "s3");
//! assert_eq!(p.path(), "bucket/data/2024/report.csv");
//! assert_eq!(p.name(), "report.csv");
//! assert_eq!(p.parent().path(), "bucket/data/2024");
//! assert_eq!((&p.parent() / "other.csv").urlpath(), "s3://bucket/data/2024/other.csv");
//! ```

mod aliases;
mod delegated;
mod local_ops;
mod pure_ops;
mod router;

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Div;
use std::str::FromStr;
use std::sync::Arc;

use crate::protocol::{CHAIN_DELIMITER, LOCAL_PROTOCOL, SCHEME_MARKER, parse_address, protocol_chain};
use crate::pure::Flavor;
use crate::{BackendOptions, Fs, PathError, Resolver};

pub use pure_ops::Parents;

/// A path on any backend.
///
/// Cloning is cheap apart from the strings. Every operation that looks like
/// a mutation returns a new value; the protocol, wrapper chain, options and
/// resolver always carry over to derived paths.
///
/// Equality, hashing and ordering use [`urlpath`](UPath::urlpath), so two
/// paths with different options but the same address compare equal.
#[derive(Clone)]
pub struct UPath {
    wrappers: Vec<String>,
    protocol: String,
    location: String,
    options: BackendOptions,
    resolver: Arc<Resolver>,
}

impl UPath {
    /// Parse an address using the global resolver and no options.
    ///
    /// # Errors
    ///
    /// [`PathError::InvalidPath`] for a malformed protocol chain.
    pub fn new(raw: &str) -> Result<Self, PathError> {
        Self::with_options(raw, BackendOptions::new())
    }

    /// Parse an address with backend options, using the global resolver.
    ///
    /// # Errors
    ///
    /// [`PathError::InvalidPath`] for a malformed protocol chain.
    pub fn with_options(raw: &str, options: BackendOptions) -> Result<Self, PathError> {
        Self::in_resolver(raw, options, Resolver::global())
    }

    /// Parse an address bound to a specific resolver.
    ///
    /// # Errors
    ///
    /// [`PathError::InvalidPath`] for a malformed protocol chain.
    pub fn in_resolver(raw: &str, options: BackendOptions, resolver: Arc<Resolver>) -> Result<Self, PathError> {
        let parsed = parse_address(raw)?;
        Ok(Self {
            wrappers: parsed.wrappers,
            protocol: parsed.protocol,
            location: parsed.location,
            options,
            resolver,
        })
    }

    /// Local path from a host path, taken literally (no chain parsing).
    pub fn from_local(path: impl AsRef<std::path::Path>) -> Self {
        let location = Flavor::native().normalize(&path.as_ref().to_string_lossy());
        Self {
            wrappers: Vec::new(),
            protocol: LOCAL_PROTOCOL.to_owned(),
            location,
            options: BackendOptions::new(),
            resolver: Resolver::global(),
        }
    }

    /// Same protocol, wrappers, options and resolver with a new location.
    ///
    /// The location is normalized for this path's flavor.
    pub fn with_location(&self, location: impl AsRef<str>) -> Self {
        Self {
            wrappers: self.wrappers.clone(),
            protocol: self.protocol.clone(),
            location: self.flavor().normalize(location.as_ref()),
            options: self.options.clone(),
            resolver: Arc::clone(&self.resolver),
        }
    }

    /// Backend location: protocol and chain stripped.
    pub fn path(&self) -> &str {
        &self.location
    }

    /// `protocol://location`.
    pub fn fullpath(&self) -> String {
        format!("{}{SCHEME_MARKER}{}", self.protocol, self.location)
    }

    /// Full address including the wrapper chain, e.g.
    /// `simplecache::s3://bucket/key`.
    pub fn urlpath(&self) -> String {
        let mut out = String::new();
        for wrapper in &self.wrappers {
            out.push_str(wrapper);
            out.push_str(CHAIN_DELIMITER);
        }
        out.push_str(&self.fullpath());
        out
    }

    /// Canonical backend protocol; `file` for local paths.
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Wrapper segments, outermost first, as written.
    pub fn wrappers(&self) -> &[String] {
        &self.wrappers
    }

    /// Wrapper protocols followed by the backend protocol.
    pub fn protocol_chain(&self) -> Vec<String> {
        protocol_chain(&self.wrappers, &self.protocol)
    }

    /// Backend options.
    pub fn options(&self) -> &BackendOptions {
        &self.options
    }

    /// Resolver this path asks for its backend.
    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    /// Returns `true` for local-filesystem paths.
    pub fn is_local(&self) -> bool {
        self.protocol == LOCAL_PROTOCOL
    }

    /// Shared backend handle for this path's protocol and options.
    ///
    /// Resolved on every call, so an invalidated handle is never reused.
    ///
    /// # Errors
    ///
    /// [`PathError::Backend`] when the protocol is unknown or the factory
    /// fails.
    pub fn fs(&self) -> Result<Arc<dyn Fs>, PathError> {
        self.resolver
            .resolve(&self.protocol, &self.options)
            .map_err(|e| self.backend_err("resolve", e))
    }

    pub(crate) fn flavor(&self) -> Flavor {
        Flavor::for_protocol(&self.protocol)
    }
}

impl FromStr for UPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl PartialEq for UPath {
    fn eq(&self, other: &Self) -> bool {
        self.wrappers == other.wrappers && self.protocol == other.protocol && self.location == other.location
    }
}

impl Eq for UPath {}

impl Hash for UPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.urlpath().hash(state);
    }
}

impl PartialOrd for UPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.urlpath().cmp(&other.urlpath())
    }
}

impl fmt::Debug for UPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UPath({:?})", self.urlpath())
    }
}

impl fmt::Display for UPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.urlpath())
    }
}

impl Div<&str> for &UPath {
    type Output = UPath;

    fn div(self, segment: &str) -> UPath {
        self.join(segment)
    }
}

impl Div<&str> for UPath {
    type Output = UPath;

    fn div(self, segment: &str) -> UPath {
        self.join(segment)
    }
}
