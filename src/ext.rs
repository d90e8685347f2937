//! # Extension Traits
//!
//! Convenience algorithms built from the primitive backend operations.
//!
//! ## Overview
//!
//! [`FsExt`] provides the tree-level operations paths need (walking,
//! finding, globbing, disk usage) on top of `read_dir` and `metadata`.
//! They are default methods with a blanket implementation, so any [`Fs`]
//! backend gets them for free, including `dyn Fs` handles.
//!
//! ## Available Methods
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`is_file`](FsExt::is_file) | Check if a location is a regular file |
//! | [`is_dir`](FsExt::is_dir) | Check if a location is a directory |
//! | [`file_size`](FsExt::file_size) | Size from metadata |
//! | [`walk`](FsExt::walk) | Top-down directory walk |
//! | [`find`](FsExt::find) | All files (optionally directories) below a location |
//! | [`glob`](FsExt::glob) | Locations matching a wildcard pattern |
//! | [`du`](FsExt::du) | Total size of the files below a location |
//! | [`head`](FsExt::head) / [`tail`](FsExt::tail) | First / last bytes of a file |
//! | [`expand_path`](FsExt::expand_path) | Expand a pattern or directory into concrete locations |
//!
//! ## JSON Support (Feature-Gated)
//!
//! With the `serde` feature enabled, [`FsExtJson`] adds `read_json` and
//! `write_json`.

use std::collections::BTreeSet;

use crate::backends::child_location;
use crate::pure::{glob_full_match, has_magic};
use crate::{FileType, Fs, FsError, WalkEntry};

/// Extension methods for any backend.
///
/// Results are sorted so listings are stable across backends.
///
/// # Example
///
/// ```rust
/// use anypath::{Fs, FsError, FsExt};
///
/// fn count_csv(fs: &dyn Fs, dir: &str) -> Result<usize, FsError> {
///     Ok(fs.glob(&format!("{dir}/**/*.csv"))?.len())
/// }
/// ```
pub trait FsExt: Fs {
    /// Check if the location is a regular file.
    ///
    /// Returns `Ok(false)` if the location doesn't exist (not an error).
    fn is_file(&self, path: &str) -> Result<bool, FsError> {
        match self.metadata(path) {
            Ok(m) => Ok(m.is_file()),
            Err(FsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Check if the location is a directory.
    ///
    /// Returns `Ok(false)` if the location doesn't exist (not an error).
    fn is_dir(&self, path: &str) -> Result<bool, FsError> {
        match self.metadata(path) {
            Ok(m) => Ok(m.is_dir()),
            Err(FsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Get the size of a file in bytes.
    fn file_size(&self, path: &str) -> Result<u64, FsError> {
        Ok(self.metadata(path)?.size)
    }

    /// Walk a directory tree top-down.
    ///
    /// Each level lists the names of its subdirectories and files.
    /// `maxdepth` of `Some(1)` lists only `path` itself. Walking a file
    /// yields nothing.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `path` does not exist
    /// - [`FsError::InvalidData`] if `maxdepth` is `Some(0)`
    fn walk(&self, path: &str, maxdepth: Option<usize>) -> Result<Vec<WalkEntry<String>>, FsError> {
        if maxdepth == Some(0) {
            return Err(FsError::InvalidData {
                path: path.to_owned(),
                details: "maxdepth must be at least 1".to_owned(),
            });
        }
        if !self.metadata(path)?.is_dir() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        let mut stack = vec![(path.to_owned(), 1usize)];
        while let Some((dir, depth)) = stack.pop() {
            let mut entries = self.read_dir(&dir)?.collect_all()?;
            entries.sort_by(|a, b| a.name.cmp(&b.name));

            let mut dirs = Vec::new();
            let mut files = Vec::new();
            let mut below = Vec::new();
            for entry in entries {
                if entry.file_type == FileType::Directory {
                    dirs.push(entry.name);
                    below.push(entry.path);
                } else {
                    files.push(entry.name);
                }
            }
            out.push(WalkEntry { root: dir, dirs, files });

            if maxdepth.is_none_or(|max| depth < max) {
                // reversed so the first subdirectory is visited next
                stack.extend(below.into_iter().rev().map(|sub| (sub, depth + 1)));
            }
        }
        Ok(out)
    }

    /// Every file below `path`, sorted.
    ///
    /// With `withdirs` directories (including `path`) are listed too. A file
    /// location yields itself; a missing location yields nothing.
    fn find(&self, path: &str, maxdepth: Option<usize>, withdirs: bool) -> Result<Vec<String>, FsError> {
        match self.metadata(path) {
            Ok(meta) if !meta.is_dir() => return Ok(vec![path.to_owned()]),
            Ok(_) => {}
            Err(FsError::NotFound { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        }

        let sep = self.sep();
        let mut out = Vec::new();
        if withdirs {
            out.push(path.to_owned());
        }
        for level in self.walk(path, maxdepth)? {
            if withdirs {
                out.extend(level.dirs.iter().map(|name| child_location(&level.root, name, sep)));
            }
            out.extend(level.files.iter().map(|name| child_location(&level.root, name, sep)));
        }
        out.sort();
        Ok(out)
    }

    /// Locations matching a wildcard pattern, sorted.
    ///
    /// `*`, `?` and `[...]` match within one segment, `**` spans segments.
    /// A pattern without wildcards returns itself if it exists.
    fn glob(&self, pattern: &str) -> Result<Vec<String>, FsError> {
        if !has_magic(pattern) {
            return Ok(if self.exists(pattern)? {
                vec![pattern.to_owned()]
            } else {
                Vec::new()
            });
        }

        let sep = self.sep();
        let parts: Vec<&str> = pattern.split(sep).filter(|part| !part.is_empty()).collect();
        let literal = parts.iter().take_while(|part| !has_magic(part)).count();
        let mut root = parts[..literal].join(&sep.to_string());
        if pattern.starts_with(sep) {
            root.insert(0, sep);
        }
        let depth = if parts[literal..].contains(&"**") {
            None
        } else {
            Some(parts.len() - literal)
        };

        let mut out: Vec<String> = self
            .find(&root, depth, true)?
            .into_iter()
            .filter(|candidate| glob_full_match(candidate, pattern, sep, self.case_insensitive()))
            .collect();
        out.dedup();
        Ok(out)
    }

    /// Total size in bytes of the files below `path` (or of `path` itself).
    fn du(&self, path: &str, maxdepth: Option<usize>) -> Result<u64, FsError> {
        let mut total = 0;
        for file in self.find(path, maxdepth, false)? {
            total += self.metadata(&file)?.size;
        }
        Ok(total)
    }

    /// First `size` bytes of a file.
    fn head(&self, path: &str, size: usize) -> Result<Vec<u8>, FsError> {
        self.read_range(path, 0, size)
    }

    /// Last `size` bytes of a file.
    fn tail(&self, path: &str, size: usize) -> Result<Vec<u8>, FsError> {
        let len = self.file_size(path)?;
        let offset = len.saturating_sub(size as u64);
        self.read_range(path, offset, size)
    }

    /// Expand a pattern or location into concrete locations.
    ///
    /// Patterns go through [`glob`](FsExt::glob). With `recursive`, every
    /// directory found is expanded with [`find`](FsExt::find).
    ///
    /// # Errors
    ///
    /// [`FsError::NotFound`] when nothing matches.
    fn expand_path(&self, path: &str, recursive: bool, maxdepth: Option<usize>) -> Result<Vec<String>, FsError> {
        let mut out = BTreeSet::new();
        let roots = if has_magic(path) {
            self.glob(path)?
        } else if self.exists(path)? {
            vec![path.to_owned()]
        } else {
            Vec::new()
        };

        for root in roots {
            if recursive {
                out.extend(self.find(&root, maxdepth, true)?);
            }
            out.insert(root);
        }

        if out.is_empty() {
            return Err(FsError::NotFound { path: path.to_owned() });
        }
        Ok(out.into_iter().collect())
    }
}

impl<B: Fs + ?Sized> FsExt for B {}

// =============================================================================
// JSON Support (Feature-Gated)
// =============================================================================

#[cfg(feature = "serde")]
mod json {
    use super::*;
    use serde::{Serialize, de::DeserializeOwned};

    /// JSON serialization extension methods.
    ///
    /// Available when the `serde` feature is enabled.
    pub trait FsExtJson: Fs {
        /// Read a file and deserialize it as JSON.
        ///
        /// # Errors
        ///
        /// - `FsError::NotFound` if the file doesn't exist
        /// - `FsError::InvalidData` if parsing fails
        fn read_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FsError> {
            let data = self.read(path)?;
            serde_json::from_slice(&data).map_err(|e| FsError::InvalidData {
                path: path.to_owned(),
                details: e.to_string(),
            })
        }

        /// Serialize a value and write it as pretty-printed JSON.
        fn write_json<T: Serialize>(&self, path: &str, value: &T) -> Result<(), FsError> {
            let json = serde_json::to_vec_pretty(value).map_err(|e| FsError::InvalidData {
                path: path.to_owned(),
                details: e.to_string(),
            })?;
            self.write(path, &json)
        }
    }

    impl<B: Fs + ?Sized> FsExtJson for B {}
}

#[cfg(feature = "serde")]
pub use json::FsExtJson;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBackend;
    use crate::{FsDir, FsRead, FsSession, FsWrite, Metadata, ReadDirIter};

    fn sample() -> MemoryBackend {
        let fs = MemoryBackend::new();
        fs.write("b/top.txt", b"12345").unwrap();
        fs.write("b/data/one.csv", b"1").unwrap();
        fs.write("b/data/two.csv", b"22").unwrap();
        fs.write("b/data/deep/three.csv", b"333").unwrap();
        fs.create_dir_all("b/empty").unwrap();
        fs
    }

    #[test]
    fn is_file_and_is_dir() {
        let fs = sample();
        assert!(fs.is_file("b/top.txt").unwrap());
        assert!(!fs.is_dir("b/top.txt").unwrap());
        assert!(fs.is_dir("b/data").unwrap());
        assert!(!fs.is_file("b/missing").unwrap());
        assert!(!fs.is_dir("b/missing").unwrap());
    }

    #[test]
    fn walk_is_top_down_and_sorted() {
        let fs = sample();
        let levels = fs.walk("b", None).unwrap();
        assert_eq!(levels[0].root, "b");
        assert_eq!(levels[0].dirs, vec!["data", "empty"]);
        assert_eq!(levels[0].files, vec!["top.txt"]);
        assert_eq!(levels[1].root, "b/data");
        assert_eq!(levels[2].root, "b/data/deep");
        assert_eq!(levels[3].root, "b/empty");
    }

    #[test]
    fn walk_respects_maxdepth() {
        let fs = sample();
        assert_eq!(fs.walk("b", Some(1)).unwrap().len(), 1);
        assert!(matches!(fs.walk("b", Some(0)), Err(FsError::InvalidData { .. })));
        assert!(matches!(fs.walk("b/nope", None), Err(FsError::NotFound { .. })));
    }

    #[test]
    fn find_lists_files() {
        let fs = sample();
        assert_eq!(
            fs.find("b/data", None, false).unwrap(),
            vec!["b/data/deep/three.csv", "b/data/one.csv", "b/data/two.csv"]
        );
        assert_eq!(fs.find("b/data", Some(1), false).unwrap().len(), 2);
        assert_eq!(fs.find("b/top.txt", None, false).unwrap(), vec!["b/top.txt"]);
        assert!(fs.find("b/missing", None, false).unwrap().is_empty());
        assert!(fs.find("b", None, true).unwrap().contains(&"b/empty".to_owned()));
    }

    #[test]
    fn glob_matches_segments() {
        let fs = sample();
        assert_eq!(fs.glob("b/data/*.csv").unwrap(), vec!["b/data/one.csv", "b/data/two.csv"]);
        assert_eq!(fs.glob("b/**/three.csv").unwrap(), vec!["b/data/deep/three.csv"]);
        assert_eq!(fs.glob("b/data/t?o.csv").unwrap(), vec!["b/data/two.csv"]);
        assert_eq!(fs.glob("b/top.txt").unwrap(), vec!["b/top.txt"]);
        assert!(fs.glob("b/*.md").unwrap().is_empty());
    }

    /// Memory store that reports case-insensitive names.
    struct CaseFolding(MemoryBackend);

    impl FsRead for CaseFolding {
        fn read(&self, path: &str) -> Result<Vec<u8>, FsError> {
            self.0.read(path)
        }
        fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>, FsError> {
            self.0.read_range(path, offset, len)
        }
        fn exists(&self, path: &str) -> Result<bool, FsError> {
            self.0.exists(path)
        }
        fn metadata(&self, path: &str) -> Result<Metadata, FsError> {
            self.0.metadata(path)
        }
        fn open_read(&self, path: &str) -> Result<Box<dyn std::io::Read + Send>, FsError> {
            self.0.open_read(path)
        }
    }

    impl FsWrite for CaseFolding {
        fn write(&self, path: &str, data: &[u8]) -> Result<(), FsError> {
            self.0.write(path, data)
        }
        fn remove_file(&self, path: &str) -> Result<(), FsError> {
            self.0.remove_file(path)
        }
        fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
            self.0.rename(from, to)
        }
        fn copy(&self, from: &str, to: &str) -> Result<(), FsError> {
            self.0.copy(from, to)
        }
        fn open_write(&self, path: &str) -> Result<Box<dyn std::io::Write + Send>, FsError> {
            self.0.open_write(path)
        }
        fn touch(&self, path: &str, truncate: bool) -> Result<(), FsError> {
            self.0.touch(path, truncate)
        }
    }

    impl FsDir for CaseFolding {
        fn read_dir(&self, path: &str) -> Result<ReadDirIter, FsError> {
            self.0.read_dir(path)
        }
        fn create_dir(&self, path: &str) -> Result<(), FsError> {
            self.0.create_dir(path)
        }
        fn create_dir_all(&self, path: &str) -> Result<(), FsError> {
            self.0.create_dir_all(path)
        }
        fn remove_dir(&self, path: &str) -> Result<(), FsError> {
            self.0.remove_dir(path)
        }
        fn remove_dir_all(&self, path: &str) -> Result<(), FsError> {
            self.0.remove_dir_all(path)
        }
    }

    impl FsSession for CaseFolding {
        fn case_insensitive(&self) -> bool {
            true
        }
    }

    #[test]
    fn glob_follows_the_backend_case_rule() {
        let fs = sample();
        assert!(fs.glob("b/data/*.CSV").unwrap().is_empty());

        let folding = CaseFolding(sample());
        assert_eq!(
            folding.glob("b/data/*.CSV").unwrap(),
            vec!["b/data/one.csv", "b/data/two.csv"]
        );
        assert_eq!(folding.glob("b/**/THREE.csv").unwrap(), vec!["b/data/deep/three.csv"]);
    }

    #[test]
    fn du_sums_file_sizes() {
        let fs = sample();
        assert_eq!(fs.du("b", None).unwrap(), 11);
        assert_eq!(fs.du("b/data", Some(1)).unwrap(), 3);
        assert_eq!(fs.du("b/top.txt", None).unwrap(), 5);
    }

    #[test]
    fn head_and_tail() {
        let fs = sample();
        assert_eq!(fs.head("b/top.txt", 2).unwrap(), b"12");
        assert_eq!(fs.tail("b/top.txt", 2).unwrap(), b"45");
        assert_eq!(fs.tail("b/top.txt", 100).unwrap(), b"12345");
    }

    #[test]
    fn expand_path_variants() {
        let fs = sample();
        assert_eq!(fs.expand_path("b/top.txt", false, None).unwrap(), vec!["b/top.txt"]);
        let all = fs.expand_path("b/data", true, None).unwrap();
        assert!(all.contains(&"b/data".to_owned()));
        assert!(all.contains(&"b/data/deep/three.csv".to_owned()));
        assert!(matches!(
            fs.expand_path("b/nothing*", false, None),
            Err(FsError::NotFound { .. })
        ));
    }

    #[test]
    fn fs_ext_available_on_dyn_fs() {
        let backend = sample();
        let fs: &dyn Fs = &backend;
        assert!(fs.is_file("b/top.txt").unwrap());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_round_trip() {
        let fs = MemoryBackend::new();
        fs.write_json("b/cfg.json", &serde_json::json!({"a": 1})).unwrap();
        let value: serde_json::Value = fs.read_json("b/cfg.json").unwrap();
        assert_eq!(value["a"], 1);
        fs.write("b/bad.json", b"{").unwrap();
        assert!(matches!(
            fs.read_json::<serde_json::Value>("b/bad.json"),
            Err(FsError::InvalidData { .. })
        ));
    }
}
