//! Credential/session cache shared with one backend protocol.
//!
//! Values live in memory for the threads of this process and, when a
//! directory is configured, in one `<key>.json` file per entry so that other
//! processes can reuse sessions instead of negotiating new ones.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use log::{debug, warn};

/// Two-level session store: process memory first, then the cache directory.
///
/// Persistence is best effort. A failing disk write is logged and the value
/// is still served from memory.
///
/// ```rust
/// use anypath::SessionCache;
///
/// let cache = SessionCache::in_memory();
/// cache.set("profile-a", r#"{"token":"abc"}"#);
/// assert_eq!(cache.get("profile-a").as_deref(), Some(r#"{"token":"abc"}"#));
/// ```
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: RwLock<HashMap<String, String>>,
    dir: Option<PathBuf>,
}

impl SessionCache {
    /// Cache that never touches disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Cache persisted under `dir` (created on first write).
    pub fn persistent(dir: impl Into<PathBuf>) -> Self {
        Self {
            entries: RwLock::default(),
            dir: Some(dir.into()),
        }
    }

    /// Directory backing this cache, if any.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Look up a value, falling back to the cache directory.
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Some(value.clone());
        }

        let file = self.file_for(key)?;
        match fs::read_to_string(&file) {
            Ok(value) => {
                debug!("session cache hit on disk for {key}");
                self.entries
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key.to_owned(), value.clone());
                Some(value)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("failed to read session cache entry {}: {e}", file.display());
                None
            }
        }
    }

    /// Returns `true` if the key is cached in memory or on disk.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Store a value in memory and, if configured, on disk.
    pub fn set(&self, key: &str, value: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());

        let Some(file) = self.file_for(key) else {
            return;
        };
        let written = file
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::write(&file, value));
        if let Err(e) = written {
            warn!("failed to persist session cache entry {}: {e}", file.display());
        }
    }

    /// Remove a value everywhere.
    pub fn remove(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);

        if let Some(file) = self.file_for(key) {
            match fs::remove_file(&file) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("failed to remove session cache entry {}: {e}", file.display()),
            }
        }
    }

    fn file_for(&self, key: &str) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
            .collect();
        Some(dir.join(format!("{name}.json")))
    }
}
