//! Process-local object store.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use log::warn;

use super::child_location;
use crate::{
    DirEntry, FileType, FsDir, FsError, FsRead, FsSession, FsWrite, Metadata, ReadDirIter,
};

/// In-memory backend with object-store semantics (protocol `memory`).
///
/// Keys are flat strings; directories exist implicitly whenever a key lives
/// below them, or explicitly after `create_dir`. Leading and trailing `/`
/// are ignored, so `memory:///a/b` and `memory://a/b` address the same key.
///
/// Clones share the same store.
///
/// ```rust
/// use anypath::{FsExt, FsRead, FsWrite, MemoryBackend};
///
/// let fs = MemoryBackend::new();
/// fs.write("bucket/data/a.txt", b"hello").unwrap();
/// assert!(fs.is_dir("bucket/data").unwrap());
/// assert_eq!(fs.read("bucket/data/a.txt").unwrap(), b"hello");
/// ```
#[derive(Clone, Default)]
pub struct MemoryBackend {
    store: Arc<RwLock<Store>>,
}

#[derive(Default)]
struct Store {
    files: BTreeMap<String, MemoryFile>,
    dirs: BTreeSet<String>,
}

struct MemoryFile {
    data: Vec<u8>,
    created: SystemTime,
    modified: SystemTime,
}

impl MemoryFile {
    fn new(data: Vec<u8>) -> Self {
        let now = SystemTime::now();
        Self {
            data,
            created: now,
            modified: now,
        }
    }
}

impl Store {
    fn is_dir(&self, key: &str) -> bool {
        if key.is_empty() || self.dirs.contains(key) {
            return true;
        }
        let prefix = format!("{key}/");
        has_prefix(self.files.keys(), &prefix) || has_prefix(self.dirs.iter(), &prefix)
    }

    fn file_type(&self, key: &str) -> Option<FileType> {
        if self.files.contains_key(key) {
            Some(FileType::File)
        } else if self.is_dir(key) {
            Some(FileType::Directory)
        } else {
            None
        }
    }

    /// Fails if any ancestor of `key` is a file.
    fn check_ancestors(&self, key: &str) -> Result<(), FsError> {
        let mut current = key;
        while let Some((parent, _)) = current.rsplit_once('/') {
            if self.files.contains_key(parent) {
                return Err(FsError::NotADirectory {
                    path: parent.to_owned(),
                });
            }
            current = parent;
        }
        Ok(())
    }

    fn put(&mut self, key: &str, data: Vec<u8>) {
        match self.files.get_mut(key) {
            Some(file) => {
                file.data = data;
                file.modified = SystemTime::now();
            }
            None => {
                self.files.insert(key.to_owned(), MemoryFile::new(data));
            }
        }
    }

    fn children(&self, key: &str) -> BTreeMap<String, (FileType, u64)> {
        let prefix = if key.is_empty() {
            String::new()
        } else {
            format!("{key}/")
        };
        let mut out = BTreeMap::new();
        for (name, file) in &self.files {
            if let Some(rest) = name.strip_prefix(&prefix) {
                match rest.split_once('/') {
                    Some((dir, _)) => out.insert(dir.to_owned(), (FileType::Directory, 0)),
                    None => out.insert(rest.to_owned(), (FileType::File, file.data.len() as u64)),
                };
            }
        }
        for dir in &self.dirs {
            if let Some(rest) = dir.strip_prefix(&prefix) {
                let first = rest.split('/').next().unwrap_or(rest);
                if !first.is_empty() {
                    out.entry(first.to_owned()).or_insert((FileType::Directory, 0));
                }
            }
        }
        out
    }
}

fn has_prefix<'a>(mut keys: impl Iterator<Item = &'a String>, prefix: &str) -> bool {
    keys.any(|key| key.starts_with(prefix))
}

fn key(path: &str) -> &str {
    path.trim_matches('/')
}

impl MemoryBackend {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read_store(&self) -> RwLockReadGuard<'_, Store> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, Store> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn not_a_file_or_missing(store: &Store, path: &str) -> FsError {
        if store.is_dir(key(path)) {
            FsError::NotAFile { path: path.to_owned() }
        } else {
            FsError::NotFound { path: path.to_owned() }
        }
    }
}

impl FsRead for MemoryBackend {
    fn read(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let store = self.read_store();
        match store.files.get(key(path)) {
            Some(file) => Ok(file.data.clone()),
            None => Err(Self::not_a_file_or_missing(&store, path)),
        }
    }

    fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>, FsError> {
        let store = self.read_store();
        let data = match store.files.get(key(path)) {
            Some(file) => &file.data,
            None => return Err(Self::not_a_file_or_missing(&store, path)),
        };
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let end = start.saturating_add(len).min(data.len());
        Ok(data[start..end].to_vec())
    }

    fn exists(&self, path: &str) -> Result<bool, FsError> {
        Ok(self.read_store().file_type(key(path)).is_some())
    }

    fn metadata(&self, path: &str) -> Result<Metadata, FsError> {
        let store = self.read_store();
        if let Some(file) = store.files.get(key(path)) {
            return Ok(Metadata {
                file_type: FileType::File,
                size: file.data.len() as u64,
                created: Some(file.created),
                modified: Some(file.modified),
                permissions: None,
            });
        }
        if store.is_dir(key(path)) {
            Ok(Metadata::directory())
        } else {
            Err(FsError::NotFound { path: path.to_owned() })
        }
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>, FsError> {
        Ok(Box::new(Cursor::new(self.read(path)?)))
    }
}

impl FsWrite for MemoryBackend {
    fn write(&self, path: &str, data: &[u8]) -> Result<(), FsError> {
        let mut store = self.write_store();
        if key(path).is_empty() || store.is_dir(key(path)) {
            return Err(FsError::NotAFile { path: path.to_owned() });
        }
        store.check_ancestors(key(path))?;
        store.put(key(path), data.to_vec());
        Ok(())
    }

    fn remove_file(&self, path: &str) -> Result<(), FsError> {
        let mut store = self.write_store();
        match store.files.remove(key(path)) {
            Some(_) => Ok(()),
            None => Err(Self::not_a_file_or_missing(&store, path)),
        }
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        let (src, dst) = (key(from), key(to));
        let mut store = self.write_store();
        store.check_ancestors(dst)?;

        if let Some(file) = store.files.remove(src) {
            store.files.insert(dst.to_owned(), file);
            return Ok(());
        }
        if src.is_empty() || !store.is_dir(src) {
            return Err(FsError::NotFound { path: from.to_owned() });
        }

        let prefix = format!("{src}/");
        let moved: Vec<String> = store
            .files
            .keys()
            .filter(|name| name.starts_with(&prefix))
            .cloned()
            .collect();
        for name in moved {
            if let Some(file) = store.files.remove(&name) {
                store.files.insert(format!("{dst}/{}", &name[prefix.len()..]), file);
            }
        }
        let dirs: Vec<String> = store
            .dirs
            .iter()
            .filter(|name| *name == src || name.starts_with(&prefix))
            .cloned()
            .collect();
        for name in dirs {
            store.dirs.remove(&name);
            store.dirs.insert(format!("{dst}{}", &name[src.len()..]));
        }
        Ok(())
    }

    fn copy(&self, from: &str, to: &str) -> Result<(), FsError> {
        let data = self.read(from)?;
        self.write(to, &data)
    }

    fn open_write(&self, path: &str) -> Result<Box<dyn Write + Send>, FsError> {
        let store = self.read_store();
        if key(path).is_empty() || store.is_dir(key(path)) {
            return Err(FsError::NotAFile { path: path.to_owned() });
        }
        store.check_ancestors(key(path))?;
        drop(store);
        Ok(Box::new(MemoryWriter {
            backend: self.clone(),
            key: key(path).to_owned(),
            buf: Vec::new(),
            dirty: true,
        }))
    }

    fn touch(&self, path: &str, truncate: bool) -> Result<(), FsError> {
        let mut store = self.write_store();
        let k = key(path);
        if let Some(file) = store.files.get_mut(k) {
            if truncate {
                file.data.clear();
            }
            file.modified = SystemTime::now();
            return Ok(());
        }
        if store.is_dir(k) {
            return Ok(());
        }
        store.check_ancestors(k)?;
        store.put(k, Vec::new());
        Ok(())
    }
}

/// Buffers writes and commits the whole object on flush and on drop.
struct MemoryWriter {
    backend: MemoryBackend,
    key: String,
    buf: Vec<u8>,
    dirty: bool,
}

impl MemoryWriter {
    /// A file created above the key since `open_write` makes the commit fail.
    fn commit(&mut self) -> Result<(), FsError> {
        if !self.dirty {
            return Ok(());
        }
        self.dirty = false;
        let mut store = self.backend.write_store();
        store.check_ancestors(&self.key)?;
        store.put(&self.key, self.buf.clone());
        Ok(())
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        self.dirty = true;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit()
            .map_err(|e| io::Error::new(io::ErrorKind::NotADirectory, e.to_string()))
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        if let Err(e) = self.commit() {
            warn!("dropping buffered write to {}: {e}", self.key);
        }
    }
}

impl FsDir for MemoryBackend {
    fn read_dir(&self, path: &str) -> Result<ReadDirIter, FsError> {
        let store = self.read_store();
        let k = key(path);
        if store.files.contains_key(k) {
            return Err(FsError::NotADirectory { path: path.to_owned() });
        }
        if !store.is_dir(k) {
            return Err(FsError::NotFound { path: path.to_owned() });
        }
        let entries = store
            .children(k)
            .into_iter()
            .map(|(name, (file_type, size))| {
                Ok(DirEntry {
                    path: child_location(path, &name, '/'),
                    name,
                    file_type,
                    size,
                })
            })
            .collect();
        Ok(ReadDirIter::from_vec(entries))
    }

    fn create_dir(&self, path: &str) -> Result<(), FsError> {
        let mut store = self.write_store();
        let k = key(path);
        if store.file_type(k).is_some() {
            return Err(FsError::AlreadyExists {
                path: path.to_owned(),
                operation: "create_dir",
            });
        }
        store.check_ancestors(k)?;
        let parent = k.rsplit_once('/').map_or("", |(parent, _)| parent);
        if !store.is_dir(parent) {
            return Err(FsError::NotFound { path: parent.to_owned() });
        }
        store.dirs.insert(k.to_owned());
        Ok(())
    }

    fn create_dir_all(&self, path: &str) -> Result<(), FsError> {
        let mut store = self.write_store();
        let k = key(path);
        if store.files.contains_key(k) {
            return Err(FsError::AlreadyExists {
                path: path.to_owned(),
                operation: "create_dir_all",
            });
        }
        store.check_ancestors(k)?;
        if !k.is_empty() {
            store.dirs.insert(k.to_owned());
        }
        Ok(())
    }

    fn remove_dir(&self, path: &str) -> Result<(), FsError> {
        let mut store = self.write_store();
        let k = key(path);
        if store.files.contains_key(k) {
            return Err(FsError::NotADirectory { path: path.to_owned() });
        }
        if k.is_empty() {
            return Err(FsError::PermissionDenied {
                path: path.to_owned(),
                operation: "remove_dir",
            });
        }
        if !store.is_dir(k) {
            return Err(FsError::NotFound { path: path.to_owned() });
        }
        if !store.children(k).is_empty() {
            return Err(FsError::DirectoryNotEmpty { path: path.to_owned() });
        }
        store.dirs.remove(k);
        Ok(())
    }

    fn remove_dir_all(&self, path: &str) -> Result<(), FsError> {
        let mut store = self.write_store();
        let k = key(path);
        if store.files.contains_key(k) {
            return Err(FsError::NotADirectory { path: path.to_owned() });
        }
        if !store.is_dir(k) {
            return Err(FsError::NotFound { path: path.to_owned() });
        }
        if k.is_empty() {
            store.files.clear();
            store.dirs.clear();
            return Ok(());
        }
        let prefix = format!("{k}/");
        store.files.retain(|name, _| !name.starts_with(&prefix));
        store.dirs.retain(|name| name != k && !name.starts_with(&prefix));
        Ok(())
    }
}

impl FsSession for MemoryBackend {}
