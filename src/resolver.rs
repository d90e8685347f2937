//! Backend resolution and handle sharing.
//!
//! A [`Resolver`] maps `(protocol, options)` to one shared backend handle.
//! Paths never own a backend; they ask their resolver on every I/O call, so
//! evicting a handle ("session rotation") is visible to every path at once.
//!
//! ```rust
//! use std::sync::Arc;
//! use anypath::{BackendOptions, Resolver, ResolverConfig};
//!
//! let resolver = Resolver::new(ResolverConfig::default());
//! let opts = BackendOptions::new();
//! let a = resolver.resolve("memory", &opts).unwrap();
//! let b = resolver.resolve("memory", &opts).unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//!
//! resolver.invalidate("memory", &opts);
//! let c = resolver.resolve("memory", &opts).unwrap();
//! assert!(!Arc::ptr_eq(&a, &c));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use log::debug;

use crate::protocol::LOCAL_PROTOCOL;
use crate::{BackendOptions, Fs, FsError, LocalBackend, MemoryBackend, SessionCache};

/// Environment variable naming the session cache directory.
pub const SESSION_CACHE_ENV: &str = "ANYPATH_SESSION_CACHE";

/// Protocol that receives the session cache configured from the environment.
pub const DEFAULT_SESSION_PROTOCOL: &str = "s3";

/// Protocol of the built-in [`MemoryBackend`].
pub const MEMORY_PROTOCOL: &str = "memory";

/// Everything a factory gets to build a backend.
#[derive(Debug, Clone, Copy)]
pub struct BackendContext<'a> {
    /// Canonical protocol being resolved.
    pub protocol: &'a str,
    /// Options the path was created with.
    pub options: &'a BackendOptions,
    /// Session cache, when one is configured for this protocol.
    pub session: Option<&'a SessionCache>,
}

/// Builds backends for one protocol.
///
/// Closures with the right signature are factories too:
///
/// ```rust
/// use std::sync::Arc;
/// use anypath::{BackendContext, Fs, FsError, MemoryBackend, Resolver, ResolverConfig};
///
/// let resolver = Resolver::new(ResolverConfig::default());
/// resolver.register("s3", |_: &BackendContext<'_>| -> Result<Arc<dyn Fs>, FsError> {
///     Ok(Arc::new(MemoryBackend::new()))
/// });
/// assert!(resolver.is_registered("s3"));
/// ```
pub trait BackendFactory: Send + Sync {
    /// Construct a fresh backend.
    fn create(&self, ctx: &BackendContext<'_>) -> Result<Arc<dyn Fs>, FsError>;
}

impl<F> BackendFactory for F
where
    F: Fn(&BackendContext<'_>) -> Result<Arc<dyn Fs>, FsError> + Send + Sync,
{
    fn create(&self, ctx: &BackendContext<'_>) -> Result<Arc<dyn Fs>, FsError> {
        self(ctx)
    }
}

/// Session cache settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCacheConfig {
    /// Protocol whose factory receives the cache.
    pub protocol: String,
    /// Directory for persisted entries; `None` keeps them in memory.
    pub dir: Option<PathBuf>,
}

/// Explicit resolver configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Optional session cache handed to one protocol.
    pub session_cache: Option<SessionCacheConfig>,
}

impl ResolverConfig {
    /// Read configuration from the environment.
    ///
    /// A non-empty `ANYPATH_SESSION_CACHE` enables a persisted session
    /// cache in that directory for the `s3` protocol.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let session_cache = lookup(SESSION_CACHE_ENV)
            .filter(|dir| !dir.trim().is_empty())
            .map(|dir| SessionCacheConfig {
                protocol: DEFAULT_SESSION_PROTOCOL.to_owned(),
                dir: Some(PathBuf::from(dir)),
            });
        Self { session_cache }
    }
}

type HandleKey = (String, BackendOptions);

/// Registry of backend factories plus the cache of constructed handles.
///
/// `file` ([`LocalBackend`]) and `memory` ([`MemoryBackend`]) are always
/// registered. Lookups are keyed by protocol and options compared by value,
/// so option insertion order never matters.
pub struct Resolver {
    factories: RwLock<HashMap<String, Arc<dyn BackendFactory>>>,
    handles: RwLock<HashMap<HandleKey, Arc<dyn Fs>>>,
    session: Option<(String, SessionCache)>,
}

static GLOBAL: OnceLock<Arc<Resolver>> = OnceLock::new();

impl Resolver {
    /// Create an isolated resolver.
    pub fn new(config: ResolverConfig) -> Self {
        let session = config.session_cache.map(|cfg| {
            let cache = match cfg.dir {
                Some(dir) => SessionCache::persistent(dir),
                None => SessionCache::in_memory(),
            };
            (cfg.protocol.to_ascii_lowercase(), cache)
        });

        let resolver = Self {
            factories: RwLock::default(),
            handles: RwLock::default(),
            session,
        };
        resolver.register(LOCAL_PROTOCOL, |_: &BackendContext<'_>| -> Result<Arc<dyn Fs>, FsError> {
            Ok(Arc::new(LocalBackend::new()))
        });
        resolver.register(MEMORY_PROTOCOL, |_: &BackendContext<'_>| -> Result<Arc<dyn Fs>, FsError> {
            Ok(Arc::new(MemoryBackend::new()))
        });
        resolver
    }

    /// The process-wide resolver used by [`UPath::new`](crate::UPath::new).
    ///
    /// Created with the default configuration unless [`Resolver::set_global`]
    /// ran first.
    pub fn global() -> Arc<Resolver> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Resolver::new(ResolverConfig::default()))))
    }

    /// Install the process-wide resolver.
    ///
    /// # Errors
    ///
    /// Returns the resolver back if the global one already exists.
    pub fn set_global(resolver: Arc<Resolver>) -> Result<(), Arc<Resolver>> {
        GLOBAL.set(resolver)
    }

    /// Register (or replace) the factory for `protocol`.
    ///
    /// Handles built by a replaced factory are evicted.
    pub fn register(&self, protocol: &str, factory: impl BackendFactory + 'static) {
        let protocol = protocol.to_ascii_lowercase();
        let replaced = self
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(protocol.clone(), Arc::new(factory))
            .is_some();
        if replaced {
            let evicted = self.invalidate_protocol(&protocol);
            debug!("replaced backend factory for {protocol} ({evicted} handle(s) evicted)");
        } else {
            debug!("registered backend factory for {protocol}");
        }
    }

    /// Returns `true` if a factory exists for `protocol`.
    pub fn is_registered(&self, protocol: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&protocol.to_ascii_lowercase())
    }

    /// Registered protocols, sorted.
    pub fn protocols(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        out.sort();
        out
    }

    /// Shared handle for `(protocol, options)`, constructing it on first use.
    ///
    /// Construction happens outside the lock; if two callers race, the first
    /// handle inserted wins and both receive it. A handle whose factory was
    /// replaced while it was being built is discarded and built again.
    ///
    /// # Errors
    ///
    /// - [`FsError::UnknownProtocol`] if no factory is registered
    /// - whatever the factory returns
    pub fn resolve(&self, protocol: &str, options: &BackendOptions) -> Result<Arc<dyn Fs>, FsError> {
        let key: HandleKey = (protocol.to_ascii_lowercase(), options.clone());
        loop {
            if let Some(handle) = self
                .handles
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&key)
            {
                debug!("reusing {} handle for options {}", key.0, key.1);
                return Ok(Arc::clone(handle));
            }

            let factory = self.factory(&key.0)?;
            let ctx = BackendContext {
                protocol: &key.0,
                options,
                session: self.session_cache(&key.0),
            };
            let created = factory.create(&ctx)?;

            let mut handles = self.handles.write().unwrap_or_else(PoisonError::into_inner);
            // `register` swaps the factory before it evicts handles
            if !Arc::ptr_eq(&self.factory(&key.0)?, &factory) {
                debug!("factory for {} replaced during construction, rebuilding", key.0);
                continue;
            }
            let handle = handles.entry(key.clone()).or_insert_with_key(|(protocol, options)| {
                debug!("constructed {protocol} handle for options {options}");
                created
            });
            return Ok(Arc::clone(handle));
        }
    }

    fn factory(&self, protocol: &str) -> Result<Arc<dyn BackendFactory>, FsError> {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(protocol)
            .cloned()
            .ok_or_else(|| FsError::UnknownProtocol {
                protocol: protocol.to_owned(),
            })
    }

    /// Evict the handle for `(protocol, options)`.
    ///
    /// Returns `true` if a handle was cached.
    pub fn invalidate(&self, protocol: &str, options: &BackendOptions) -> bool {
        let key: HandleKey = (protocol.to_ascii_lowercase(), options.clone());
        let removed = self
            .handles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
            .is_some();
        if removed {
            debug!("invalidated {} handle for options {}", key.0, key.1);
        }
        removed
    }

    /// Evict every handle of `protocol`; returns how many were cached.
    pub fn invalidate_protocol(&self, protocol: &str) -> usize {
        let protocol = protocol.to_ascii_lowercase();
        let mut handles = self.handles.write().unwrap_or_else(PoisonError::into_inner);
        let before = handles.len();
        handles.retain(|(p, _), _| *p != protocol);
        let evicted = before - handles.len();
        if evicted > 0 {
            debug!("invalidated {evicted} {protocol} handle(s)");
        }
        evicted
    }

    /// Evict every cached handle; returns how many were cached.
    pub fn invalidate_all(&self) -> usize {
        let mut handles = self.handles.write().unwrap_or_else(PoisonError::into_inner);
        let evicted = handles.len();
        handles.clear();
        debug!("invalidated all {evicted} handle(s)");
        evicted
    }

    /// Number of cached handles.
    pub fn cached_handles(&self) -> usize {
        self.handles.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Session cache configured for `protocol`, if any.
    pub fn session_cache(&self, protocol: &str) -> Option<&SessionCache> {
        self.session
            .as_ref()
            .filter(|(p, _)| p.eq_ignore_ascii_case(protocol))
            .map(|(_, cache)| cache)
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("protocols", &self.protocols())
            .field("cached_handles", &self.cached_handles())
            .field("session_protocol", &self.session.as_ref().map(|(p, _)| p))
            .finish()
    }
}
