//! Operations forwarded to the resolved backend.
//!
//! Each one resolves the handle for this path's protocol and options, passes
//! the location along, and wraps whatever comes back (locations become
//! [`UPath`]s carrying the caller's protocol, wrappers, options and
//! resolver). Backend failures surface as [`PathError::Backend`].

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::time::{Duration, SystemTime};

use log::warn;

use super::UPath;
use crate::transfer::{self, OnError, TransferReport};
use crate::{Fs, FsError, FsExt, Metadata, PathError, WalkEntry};

/// Read-ahead size used when searching for a block delimiter.
const DELIMITER_SCAN: usize = 64 * 1024;

impl UPath {
    // ---------------------------------------------------------------- queries

    /// Whether anything exists at this path.
    pub fn exists(&self) -> Result<bool, PathError> {
        self.delegate("exists", |fs, loc| fs.exists(loc))
    }

    /// Whether this path is a regular file. Missing paths are not.
    pub fn is_file(&self) -> Result<bool, PathError> {
        self.delegate("is_file", |fs, loc| fs.is_file(loc))
    }

    /// Whether this path is a directory (or a key prefix). Missing paths are
    /// not.
    pub fn is_dir(&self) -> Result<bool, PathError> {
        self.delegate("is_dir", |fs, loc| fs.is_dir(loc))
    }

    /// Backend metadata.
    pub fn info(&self) -> Result<Metadata, PathError> {
        self.delegate("info", |fs, loc| fs.metadata(loc))
    }

    /// Size in bytes.
    pub fn size(&self) -> Result<u64, PathError> {
        self.delegate("size", |fs, loc| fs.file_size(loc))
    }

    /// Last modification time.
    ///
    /// Fails with [`FsError::NotSupported`] if the backend does not track it.
    pub fn modified(&self) -> Result<SystemTime, PathError> {
        self.delegate("modified", |fs, loc| {
            fs.metadata(loc)?
                .modified
                .ok_or(FsError::NotSupported { operation: "modified" })
        })
    }

    /// Creation time.
    ///
    /// Fails with [`FsError::NotSupported`] if the backend does not track it.
    pub fn created(&self) -> Result<SystemTime, PathError> {
        self.delegate("created", |fs, loc| {
            fs.metadata(loc)?
                .created
                .ok_or(FsError::NotSupported { operation: "created" })
        })
    }

    /// Backend checksum of the content or its metadata.
    pub fn checksum(&self) -> Result<u64, PathError> {
        self.delegate("checksum", |fs, loc| fs.checksum(loc))
    }

    /// Hex key that changes whenever the file changes.
    pub fn ukey(&self) -> Result<String, PathError> {
        self.delegate("ukey", |fs, loc| fs.checksum(loc).map(|sum| format!("{sum:016x}")))
    }

    // --------------------------------------------------------------- contents

    /// Open for streaming reads.
    pub fn open_read(&self) -> Result<Box<dyn Read + Send>, PathError> {
        self.delegate("open_read", |fs, loc| fs.open_read(loc))
    }

    /// Open for streaming writes, replacing any existing content.
    pub fn open_write(&self) -> Result<Box<dyn Write + Send>, PathError> {
        self.delegate("open_write", |fs, loc| fs.open_write(loc))
    }

    /// Whole content.
    pub fn read_bytes(&self) -> Result<Vec<u8>, PathError> {
        self.delegate("read_bytes", |fs, loc| fs.read(loc))
    }

    /// Whole content as UTF-8.
    pub fn read_text(&self) -> Result<String, PathError> {
        self.delegate("read_text", |fs, loc| {
            String::from_utf8(fs.read(loc)?).map_err(|e| FsError::InvalidData {
                path: loc.to_owned(),
                details: e.to_string(),
            })
        })
    }

    /// Replace the content.
    pub fn write_bytes(&self, data: &[u8]) -> Result<(), PathError> {
        self.delegate("write_bytes", |fs, loc| fs.write(loc, data))
    }

    /// Replace the content with UTF-8 text.
    pub fn write_text(&self, text: &str) -> Result<(), PathError> {
        self.delegate("write_text", |fs, loc| fs.write(loc, text.as_bytes()))
    }

    /// First `size` bytes.
    pub fn head(&self, size: usize) -> Result<Vec<u8>, PathError> {
        self.delegate("head", |fs, loc| fs.head(loc, size))
    }

    /// Last `size` bytes.
    pub fn tail(&self, size: usize) -> Result<Vec<u8>, PathError> {
        self.delegate("tail", |fs, loc| fs.tail(loc, size))
    }

    /// `length` bytes starting at `offset`.
    ///
    /// With a delimiter the block is widened to whole records: it starts just
    /// after the first delimiter at or past `offset` (or at 0) and ends just
    /// after the first delimiter at or past `offset + length` (or at EOF).
    /// Consecutive blocks therefore split a file without cutting a record.
    ///
    /// ```rust
    /// use anypath::UPath;
    ///
    /// let p = UPath::new("memory://docs/read-block-example.csv").unwrap();
    /// p.write_bytes(b"a,1\nb,2\nc,3\n").unwrap();
    /// assert_eq!(p.read_block(0, 5, Some(b"\n")).unwrap(), b"a,1\nb,2\n");
    /// assert_eq!(p.read_block(5, 5, Some(b"\n")).unwrap(), b"c,3\n");
    /// ```
    pub fn read_block(&self, offset: u64, length: usize, delimiter: Option<&[u8]>) -> Result<Vec<u8>, PathError> {
        self.delegate("read_block", |fs, loc| {
            let Some(delimiter) = delimiter.filter(|d| !d.is_empty()) else {
                return fs.read_range(loc, offset, length);
            };
            let size = fs.file_size(loc)?;
            let start = if offset == 0 {
                0
            } else {
                seek_delimiter(fs, loc, offset, delimiter, size)?
            };
            let target = offset.saturating_add(length as u64);
            let end = if target >= size {
                size
            } else {
                seek_delimiter(fs, loc, target, delimiter, size)?
            };
            if end <= start {
                return Ok(Vec::new());
            }
            let len = usize::try_from(end - start).map_err(|_| FsError::InvalidData {
                path: loc.to_owned(),
                details: "block does not fit in memory".to_owned(),
            })?;
            fs.read_range(loc, start, len)
        })
    }

    /// Contents of every file this path expands to.
    ///
    /// The path may be a glob pattern; with `recursive` directories are
    /// expanded to the files below them. Directories themselves are skipped.
    /// Under [`OnError::Continue`] unreadable files are logged and left out.
    ///
    /// ```rust
    /// use anypath::{OnError, UPath};
    ///
    /// let root = UPath::new("memory://cat-example").unwrap();
    /// (&root / "a.txt").write_text("A").unwrap();
    /// (&root / "sub/b.txt").write_text("B").unwrap();
    ///
    /// let all = root.cat(true, OnError::Raise).unwrap();
    /// assert_eq!(all.len(), 2);
    /// assert_eq!(all[&(&root / "sub/b.txt")], b"B");
    /// assert_eq!(root.join("*.txt").cat(false, OnError::Raise).unwrap().len(), 1);
    /// ```
    pub fn cat(&self, recursive: bool, on_error: OnError) -> Result<BTreeMap<UPath, Vec<u8>>, PathError> {
        let fs = self.fs()?;
        let found = fs
            .expand_path(&self.location, recursive, None)
            .map_err(|e| self.backend_err("cat", e))?;

        let mut out = BTreeMap::new();
        for location in found {
            let path = self.with_location(&location);
            match fs.read(&location) {
                Ok(data) => {
                    out.insert(path, data);
                }
                Err(FsError::NotAFile { .. }) => {}
                Err(e) => match on_error {
                    OnError::Raise => return Err(path.backend_err("cat", e)),
                    OnError::Continue => warn!("cat skipped {path}: {e}"),
                },
            }
        }
        Ok(out)
    }

    // ---------------------------------------------------------------- listing

    /// Direct children, sorted. The path itself is never included.
    pub fn ls(&self) -> Result<Vec<UPath>, PathError> {
        let entries = self.delegate("ls", |fs, loc| fs.read_dir(loc)?.collect_all())?;
        let mut out: Vec<UPath> = entries
            .into_iter()
            .map(|entry| self.with_location(entry.path))
            .filter(|child| child != self)
            .collect();
        out.sort();
        Ok(out)
    }

    /// Iterator form of [`ls`](UPath::ls).
    pub fn iterdir(&self) -> Result<impl Iterator<Item = UPath>, PathError> {
        Ok(self.ls()?.into_iter())
    }

    /// Paths below this one matching `pattern`.
    ///
    /// `*`, `?` and `[...]` stay within one segment; `**` spans any number.
    pub fn glob(&self, pattern: &str) -> Result<Vec<UPath>, PathError> {
        let full = self.join(pattern);
        let found = full.delegate("glob", |fs, loc| fs.glob(loc))?;
        Ok(self.wrap_all(found))
    }

    /// [`glob`](UPath::glob) at any depth.
    pub fn rglob(&self, pattern: &str) -> Result<Vec<UPath>, PathError> {
        self.join("**").glob(pattern)
    }

    /// Every file below this path (and directories with `withdirs`).
    pub fn find(&self, maxdepth: Option<usize>, withdirs: bool) -> Result<Vec<UPath>, PathError> {
        let found = self.delegate("find", |fs, loc| fs.find(loc, maxdepth, withdirs))?;
        Ok(self.wrap_all(found))
    }

    /// Top-down walk; join `dirs` / `files` names onto each `root`.
    ///
    /// ```rust
    /// use anypath::UPath;
    ///
    /// let root = UPath::new("memory://walk-example").unwrap();
    /// (&root / "a/one.txt").write_text("1").unwrap();
    /// (&root / "top.txt").write_text("2").unwrap();
    ///
    /// let levels = root.walk(None).unwrap();
    /// assert_eq!(levels[0].root, root);
    /// assert_eq!(levels[0].dirs, vec!["a"]);
    /// assert_eq!(levels[0].files, vec!["top.txt"]);
    /// assert_eq!(levels[1].root, &root / "a");
    /// ```
    pub fn walk(&self, maxdepth: Option<usize>) -> Result<Vec<WalkEntry<UPath>>, PathError> {
        let levels = self.delegate("walk", |fs, loc| fs.walk(loc, maxdepth))?;
        Ok(levels
            .into_iter()
            .map(|level| WalkEntry {
                root: self.with_location(level.root),
                dirs: level.dirs,
                files: level.files,
            })
            .collect())
    }

    /// Expand a pattern (or, with `recursive`, a directory) into paths.
    pub fn expand_path(&self, recursive: bool, maxdepth: Option<usize>) -> Result<Vec<UPath>, PathError> {
        let found = self.delegate("expand_path", |fs, loc| fs.expand_path(loc, recursive, maxdepth))?;
        Ok(self.wrap_all(found))
    }

    /// Total bytes of the files below this path.
    pub fn du(&self, maxdepth: Option<usize>) -> Result<u64, PathError> {
        self.delegate("du", |fs, loc| fs.du(loc, maxdepth))
    }

    // --------------------------------------------------------------- mutation

    /// Create this directory.
    ///
    /// With `parents` missing ancestors are created too. An existing
    /// directory is an error unless `exist_ok`; an existing file always is.
    pub fn mkdir(&self, parents: bool, exist_ok: bool) -> Result<(), PathError> {
        self.delegate("mkdir", |fs, loc| {
            if fs.exists(loc)? {
                if exist_ok && fs.is_dir(loc)? {
                    return Ok(());
                }
                return Err(FsError::AlreadyExists {
                    path: loc.to_owned(),
                    operation: "mkdir",
                });
            }
            if parents {
                fs.create_dir_all(loc)
            } else {
                fs.create_dir(loc)
            }
        })
    }

    /// `mkdir` with parents.
    pub fn makedirs(&self, exist_ok: bool) -> Result<(), PathError> {
        self.mkdir(true, exist_ok)
    }

    /// Remove an empty directory.
    pub fn rmdir(&self) -> Result<(), PathError> {
        self.delegate("rmdir", |fs, loc| fs.remove_dir(loc))
    }

    /// Remove a file, or a directory (with everything in it when
    /// `recursive`).
    pub fn rm(&self, recursive: bool) -> Result<(), PathError> {
        self.delegate("rm", |fs, loc| {
            if !fs.metadata(loc)?.is_dir() {
                fs.remove_file(loc)
            } else if recursive {
                fs.remove_dir_all(loc)
            } else {
                fs.remove_dir(loc)
            }
        })
    }

    /// Remove a file.
    pub fn rm_file(&self) -> Result<(), PathError> {
        self.delegate("rm_file", |fs, loc| fs.remove_file(loc))
    }

    /// Create the file if missing, otherwise bump its modification time.
    ///
    /// Fails on an existing file unless `exist_ok`; `truncate` empties it.
    pub fn touch(&self, exist_ok: bool, truncate: bool) -> Result<(), PathError> {
        self.delegate("touch", |fs, loc| {
            if !exist_ok && fs.exists(loc)? {
                return Err(FsError::AlreadyExists {
                    path: loc.to_owned(),
                    operation: "touch",
                });
            }
            fs.touch(loc, truncate)
        })
    }

    // ---------------------------------------------------------------- session

    /// Pre-signed URL valid for `expiration`.
    pub fn sign(&self, expiration: Duration) -> Result<String, PathError> {
        self.delegate("sign", |fs, loc| fs.sign(loc, expiration))
    }

    /// Drop the backend's cached listings for this path.
    pub fn invalidate_cache(&self) -> Result<(), PathError> {
        self.delegate("invalidate_cache", |fs, loc| fs.invalidate_cache(Some(loc)))
    }

    /// Evict the shared handle for this path's protocol and options.
    ///
    /// The next operation on any path with the same key gets a fresh
    /// backend. Returns `true` if a handle was cached.
    pub fn clear_instance_cache(&self) -> bool {
        self.resolver.invalidate(&self.protocol, &self.options)
    }

    // -------------------------------------------------------------- transfers

    /// Copy to `dst`, which may live on another backend.
    pub fn copy(&self, dst: &UPath, recursive: bool, on_error: OnError) -> Result<TransferReport, PathError> {
        transfer::copy(self, dst, recursive, on_error)
    }

    /// Move to `dst`, which may live on another backend.
    ///
    /// Sources are deleted only after their copy is verified.
    pub fn move_to(&self, dst: &UPath, recursive: bool, on_error: OnError) -> Result<TransferReport, PathError> {
        transfer::move_path(self, dst, recursive, on_error)
    }

    /// Upload this local path to `target`.
    pub fn put(&self, target: &UPath, recursive: bool) -> Result<TransferReport, PathError> {
        self.require_local("put")?;
        transfer::copy(self, target, recursive, OnError::Raise)
    }

    /// Download this path to the local `target`.
    pub fn get(&self, target: &UPath, recursive: bool) -> Result<TransferReport, PathError> {
        target.require_local("get")?;
        transfer::copy(self, target, recursive, OnError::Raise)
    }

    /// Upload the local `source` into this path.
    pub fn send(&self, source: &UPath, recursive: bool) -> Result<TransferReport, PathError> {
        source.put(self, recursive)
    }

    /// Download `source` into this local path.
    pub fn receive(&self, source: &UPath, recursive: bool) -> Result<TransferReport, PathError> {
        source.get(self, recursive)
    }

    // ------------------------------------------------------------------- json

    /// Read and deserialize JSON content.
    #[cfg(feature = "serde")]
    pub fn read_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, PathError> {
        use crate::FsExtJson;
        self.delegate("read_json", |fs, loc| fs.read_json(loc))
    }

    /// Serialize `value` as JSON and write it.
    #[cfg(feature = "serde")]
    pub fn write_json<T: serde::Serialize>(&self, value: &T) -> Result<(), PathError> {
        use crate::FsExtJson;
        self.delegate("write_json", |fs, loc| fs.write_json(loc, value))
    }

    fn wrap_all(&self, locations: Vec<String>) -> Vec<UPath> {
        locations.into_iter().map(|loc| self.with_location(loc)).collect()
    }
}

/// Position just past the first `delimiter` found at or after `from`, or
/// `size` if there is none.
fn seek_delimiter(fs: &dyn Fs, loc: &str, from: u64, delimiter: &[u8], size: u64) -> Result<u64, FsError> {
    let mut window: Vec<u8> = Vec::new();
    let mut window_start = from;
    let mut pos = from;
    while pos < size {
        let chunk = fs.read_range(loc, pos, DELIMITER_SCAN)?;
        if chunk.is_empty() {
            break;
        }
        pos += chunk.len() as u64;
        window.extend_from_slice(&chunk);
        if let Some(i) = window.windows(delimiter.len()).position(|w| w == delimiter) {
            return Ok(window_start + (i + delimiter.len()) as u64);
        }
        // keep a partial delimiter that may continue in the next chunk
        let keep = (delimiter.len() - 1).min(window.len());
        let drop = window.len() - keep;
        window.drain(..drop);
        window_start += drop as u64;
    }
    Ok(size)
}
