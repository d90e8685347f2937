//! Host filesystem backend.

use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{MAIN_SEPARATOR, Path};
use std::time::SystemTime;

use super::child_location;
use crate::pure::Flavor;
use crate::{DirEntry, FileType, FsDir, FsError, FsRead, FsSession, FsWrite, Metadata, Permissions, ReadDirIter};

/// Thin wrapper over `std::fs` (protocol `file`).
///
/// Locations are host paths; relative ones resolve against the current
/// directory, and an empty location means `.`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalBackend;

impl LocalBackend {
    /// Create the backend.
    pub fn new() -> Self {
        Self
    }
}

fn host(path: &str) -> &Path {
    if path.is_empty() { Path::new(".") } else { Path::new(path) }
}

fn file_type_of(ft: fs::FileType) -> FileType {
    if ft.is_dir() {
        FileType::Directory
    } else if ft.is_file() {
        FileType::File
    } else if ft.is_symlink() {
        FileType::Symlink
    } else {
        FileType::Other
    }
}

fn convert_metadata(meta: &fs::Metadata) -> Metadata {
    #[cfg(unix)]
    let permissions = {
        use std::os::unix::fs::PermissionsExt;
        Some(Permissions::from_mode(meta.permissions().mode()))
    };
    #[cfg(not(unix))]
    let permissions = Some(Permissions::from_mode(if meta.permissions().readonly() {
        0o444
    } else {
        0o666
    }));

    Metadata {
        file_type: file_type_of(meta.file_type()),
        size: if meta.is_dir() { 0 } else { meta.len() },
        created: meta.created().ok(),
        modified: meta.modified().ok(),
        permissions,
    }
}

impl FsRead for LocalBackend {
    fn read(&self, path: &str) -> Result<Vec<u8>, FsError> {
        if host(path).is_dir() {
            return Err(FsError::NotAFile { path: path.to_owned() });
        }
        fs::read(host(path)).map_err(|e| FsError::io("read", path, e))
    }

    fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>, FsError> {
        let mut file = File::open(host(path)).map_err(|e| FsError::io("read_range", path, e))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| FsError::io("read_range", path, e))?;
        let mut buf = Vec::with_capacity(len.min(64 * 1024));
        file.take(len as u64)
            .read_to_end(&mut buf)
            .map_err(|e| FsError::io("read_range", path, e))?;
        Ok(buf)
    }

    fn exists(&self, path: &str) -> Result<bool, FsError> {
        host(path)
            .try_exists()
            .map_err(|e| FsError::io("exists", path, e))
    }

    fn metadata(&self, path: &str) -> Result<Metadata, FsError> {
        fs::metadata(host(path))
            .map(|meta| convert_metadata(&meta))
            .map_err(|e| FsError::io("metadata", path, e))
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>, FsError> {
        if host(path).is_dir() {
            return Err(FsError::NotAFile { path: path.to_owned() });
        }
        let file = File::open(host(path)).map_err(|e| FsError::io("open_read", path, e))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

impl FsWrite for LocalBackend {
    fn write(&self, path: &str, data: &[u8]) -> Result<(), FsError> {
        fs::write(host(path), data).map_err(|e| FsError::io("write", path, e))
    }

    fn remove_file(&self, path: &str) -> Result<(), FsError> {
        if host(path).is_dir() {
            return Err(FsError::NotAFile { path: path.to_owned() });
        }
        fs::remove_file(host(path)).map_err(|e| FsError::io("remove_file", path, e))
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        fs::rename(host(from), host(to)).map_err(|e| FsError::io("rename", from, e))
    }

    fn copy(&self, from: &str, to: &str) -> Result<(), FsError> {
        if host(from).is_dir() {
            return Err(FsError::NotAFile { path: from.to_owned() });
        }
        fs::copy(host(from), host(to))
            .map(|_| ())
            .map_err(|e| FsError::io("copy", from, e))
    }

    fn open_write(&self, path: &str) -> Result<Box<dyn Write + Send>, FsError> {
        let file = File::create(host(path)).map_err(|e| FsError::io("open_write", path, e))?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn touch(&self, path: &str, truncate: bool) -> Result<(), FsError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(truncate)
            .open(host(path))
            .map_err(|e| FsError::io("touch", path, e))?;
        file.set_modified(SystemTime::now())
            .map_err(|e| FsError::io("touch", path, e))
    }
}

impl FsDir for LocalBackend {
    fn read_dir(&self, path: &str) -> Result<ReadDirIter, FsError> {
        let iter = fs::read_dir(host(path)).map_err(|e| FsError::io("read_dir", path, e))?;
        let parent = path.to_owned();
        let mut entries: Vec<Result<DirEntry, FsError>> = iter
            .map(|entry| {
                let entry = entry.map_err(|e| FsError::io("read_dir", parent.as_str(), e))?;
                let name = entry.file_name().to_string_lossy().into_owned();
                let location = child_location(&parent, &name, MAIN_SEPARATOR);
                let file_type = entry
                    .file_type()
                    .map(file_type_of)
                    .map_err(|e| FsError::io("read_dir", location.as_str(), e))?;
                let size = match file_type {
                    FileType::File => entry.metadata().map(|m| m.len()).unwrap_or(0),
                    _ => 0,
                };
                Ok(DirEntry {
                    name,
                    path: location,
                    file_type,
                    size,
                })
            })
            .collect();
        entries.sort_by(|a, b| match (a, b) {
            (Ok(a), Ok(b)) => a.name.cmp(&b.name),
            _ => std::cmp::Ordering::Equal,
        });
        Ok(ReadDirIter::from_vec(entries))
    }

    fn create_dir(&self, path: &str) -> Result<(), FsError> {
        fs::create_dir(host(path)).map_err(|e| FsError::io("create_dir", path, e))
    }

    fn create_dir_all(&self, path: &str) -> Result<(), FsError> {
        fs::create_dir_all(host(path)).map_err(|e| FsError::io("create_dir_all", path, e))
    }

    fn remove_dir(&self, path: &str) -> Result<(), FsError> {
        fs::remove_dir(host(path)).map_err(|e| FsError::io("remove_dir", path, e))
    }

    fn remove_dir_all(&self, path: &str) -> Result<(), FsError> {
        if host(path).is_file() {
            return Err(FsError::NotADirectory { path: path.to_owned() });
        }
        fs::remove_dir_all(host(path)).map_err(|e| FsError::io("remove_dir_all", path, e))
    }
}

impl FsSession for LocalBackend {
    fn sep(&self) -> char {
        MAIN_SEPARATOR
    }

    fn case_insensitive(&self) -> bool {
        Flavor::native().is_case_insensitive()
    }
}
