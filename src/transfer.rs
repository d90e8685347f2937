//! Copy and move between arbitrary backends.
//!
//! When source and destination share one backend handle the backend's own
//! `copy` / `rename` is used. Everything else streams: the source is opened,
//! its first chunk read, and only then is the destination opened, so a
//! source that fails immediately never leaves an empty destination behind.
//! A failure mid-stream removes the partial destination.

use std::io::{self, Read, Write};
use std::sync::Arc;

use log::{debug, trace, warn};

use crate::{Fs, FsError, FsExt, PathError, UPath};

/// Size of the first chunk read before the destination is opened.
const FIRST_CHUNK: usize = 64 * 1024;

/// What to do when one file of a transfer fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnError {
    /// Stop at the first failure and return it. Files already transferred
    /// stay where they are.
    #[default]
    Raise,
    /// Keep going and report every failure at the end.
    Continue,
}

/// One file that could not be transferred.
#[derive(Debug)]
pub struct TransferFailure {
    /// Source path.
    pub source: UPath,
    /// Destination path.
    pub dest: UPath,
    /// What went wrong.
    pub error: FsError,
}

/// Outcome of a copy or move.
#[derive(Debug, Default)]
pub struct TransferReport {
    /// `(source, destination)` pairs that completed.
    pub succeeded: Vec<(UPath, UPath)>,
    /// Pairs that failed, with their errors.
    pub failed: Vec<TransferFailure>,
}

impl TransferReport {
    /// Returns `true` if nothing failed.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn into_result(self) -> Result<TransferReport, PathError> {
        if self.is_clean() {
            Ok(self)
        } else {
            Err(PathError::Transfer(self))
        }
    }
}

struct Endpoints {
    src_fs: Arc<dyn Fs>,
    dst_fs: Arc<dyn Fs>,
    native: bool,
}

impl Endpoints {
    fn resolve(src: &UPath, dst: &UPath, operation: &'static str) -> Result<Self, PathError> {
        let src_fs = src
            .resolver()
            .resolve(src.protocol(), src.options())
            .map_err(|e| src.backend_err(operation, e))?;
        let dst_fs = dst
            .resolver()
            .resolve(dst.protocol(), dst.options())
            .map_err(|e| dst.backend_err(operation, e))?;
        let native = src.protocol() == dst.protocol() && Arc::ptr_eq(&src_fs, &dst_fs);
        Ok(Self { src_fs, dst_fs, native })
    }
}

/// Copy `src` to `dst`.
///
/// A directory source needs `recursive`; its tree is mirrored under `dst`.
///
/// # Errors
///
/// - [`PathError::Backend`] for the first failure with [`OnError::Raise`]
///   (or for a problem with `src` itself)
/// - [`PathError::Transfer`] with the full report when any file failed
///   under [`OnError::Continue`]
pub fn copy(src: &UPath, dst: &UPath, recursive: bool, on_error: OnError) -> Result<TransferReport, PathError> {
    let ends = Endpoints::resolve(src, dst, "copy")?;
    debug!(
        "copy {src} -> {dst} ({})",
        if ends.native { "native" } else { "streamed" }
    );

    let mut report = TransferReport::default();
    for (source, dest) in plan(&ends, src, dst, recursive, on_error, &mut report)? {
        trace!("copying {source} -> {dest}");
        let copied = if ends.native {
            ends.src_fs.copy(source.path(), dest.path())
        } else {
            stream(ends.src_fs.as_ref(), source.path(), ends.dst_fs.as_ref(), dest.path())
        };
        match copied {
            Ok(()) => report.succeeded.push((source, dest)),
            Err(error) => record(&mut report, on_error, "copy", source, dest, error)?,
        }
    }
    report.into_result()
}

/// Move `src` to `dst`.
///
/// On one shared backend this is a `rename`. Otherwise every file is copied,
/// the destination size is checked against the source, and only verified
/// sources are deleted. Directories emptied by the move are removed.
///
/// # Errors
///
/// Same as [`copy`]; failed or unverified files keep their source.
pub fn move_path(src: &UPath, dst: &UPath, recursive: bool, on_error: OnError) -> Result<TransferReport, PathError> {
    let ends = Endpoints::resolve(src, dst, "move")?;
    if ends.native {
        debug!("move {src} -> {dst} (native rename)");
        if !recursive && ends.src_fs.is_dir(src.path()).map_err(|e| src.backend_err("move", e))? {
            return Err(src.backend_err(
                "move",
                FsError::NotAFile {
                    path: src.path().to_owned(),
                },
            ));
        }
        ends.src_fs
            .rename(src.path(), dst.path())
            .map_err(|e| src.backend_err("move", e))?;
        return Ok(TransferReport {
            succeeded: vec![(src.clone(), dst.clone())],
            failed: Vec::new(),
        });
    }

    let copied = match copy(src, dst, recursive, on_error) {
        Ok(report) => report,
        Err(PathError::Transfer(report)) => report,
        Err(e) => return Err(e),
    };

    let mut report = TransferReport {
        succeeded: Vec::with_capacity(copied.succeeded.len()),
        failed: copied.failed,
    };
    for (source, dest) in copied.succeeded {
        match verify_and_delete(&ends, &source, &dest) {
            Ok(()) => report.succeeded.push((source, dest)),
            Err(error) => record(&mut report, on_error, "move", source, dest, error)?,
        }
    }

    if recursive && report.is_clean() {
        remove_empty_dirs(ends.src_fs.as_ref(), src.path());
    }
    report.into_result()
}

/// Per-file `(source, destination)` pairs; creates destination directories
/// for recursive copies.
fn plan(
    ends: &Endpoints,
    src: &UPath,
    dst: &UPath,
    recursive: bool,
    on_error: OnError,
    report: &mut TransferReport,
) -> Result<Vec<(UPath, UPath)>, PathError> {
    let meta = ends
        .src_fs
        .metadata(src.path())
        .map_err(|e| src.backend_err("copy", e))?;
    if !meta.is_dir() {
        return Ok(vec![(src.clone(), dst.clone())]);
    }
    if !recursive {
        return Err(src.backend_err(
            "copy",
            FsError::NotAFile {
                path: src.path().to_owned(),
            },
        ));
    }

    let levels = ends
        .src_fs
        .walk(src.path(), None)
        .map_err(|e| src.backend_err("copy", e))?;
    let mut pairs = Vec::new();
    for level in levels {
        let root = src.with_location(&level.root);
        let rel = root.relative_to(src)?;
        let target = if rel == "." { dst.clone() } else { dst.join(&rel) };

        if let Err(error) = ends.dst_fs.create_dir_all(target.path()) {
            record(report, on_error, "copy", root.clone(), target.clone(), error)?;
            continue;
        }
        for name in &level.files {
            pairs.push((root.join(name), target.join(name)));
        }
    }
    Ok(pairs)
}

/// Stream one file between backends.
fn stream(src_fs: &dyn Fs, src: &str, dst_fs: &dyn Fs, dst: &str) -> Result<(), FsError> {
    let mut reader = src_fs.open_read(src)?;
    let mut first = vec![0; FIRST_CHUNK];
    let n = read_some(&mut reader, &mut first).map_err(|e| FsError::io("read", src, e))?;

    let mut writer = dst_fs.open_write(dst)?;
    let written = writer
        .write_all(&first[..n])
        .and_then(|()| io::copy(&mut reader, &mut writer))
        .and_then(|_| writer.flush());
    drop(writer);

    if let Err(e) = written {
        match dst_fs.remove_file(dst) {
            Ok(()) | Err(FsError::NotFound { .. }) => {}
            Err(cleanup) => warn!("failed to remove partial copy {dst}: {cleanup}"),
        }
        return Err(FsError::io("copy", src, e));
    }
    Ok(())
}

fn read_some(reader: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

fn verify_and_delete(ends: &Endpoints, source: &UPath, dest: &UPath) -> Result<(), FsError> {
    let expected = ends.src_fs.file_size(source.path())?;
    let actual = ends.dst_fs.file_size(dest.path())?;
    if expected != actual {
        return Err(FsError::InvalidData {
            path: dest.path().to_owned(),
            details: format!("size {actual} after copy, expected {expected}"),
        });
    }
    ends.src_fs.remove_file(source.path())
}

fn remove_empty_dirs(fs: &dyn Fs, root: &str) {
    let levels = match fs.walk(root, None) {
        Ok(levels) => levels,
        Err(e) => {
            debug!("not cleaning up {root}: {e}");
            return;
        }
    };
    // walk is top-down, so reversed order visits children first
    for level in levels.iter().rev() {
        if let Err(e) = fs.remove_dir(&level.root) {
            debug!("left {} in place: {e}", level.root);
        }
    }
}

/// Apply the error policy to one failed pair.
fn record(
    report: &mut TransferReport,
    on_error: OnError,
    operation: &'static str,
    source: UPath,
    dest: UPath,
    error: FsError,
) -> Result<(), PathError> {
    match on_error {
        OnError::Raise => Err(source.backend_err(operation, error)),
        OnError::Continue => {
            warn!("{operation} {source} -> {dest} failed: {error}");
            report.failed.push(TransferFailure { source, dest, error });
            Ok(())
        }
    }
}
