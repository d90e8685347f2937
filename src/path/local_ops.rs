//! Local-only operations and the universal ones with a remote fallback.
//!
//! Local-only operations check the protocol first and fail with
//! [`PathError::Unsupported`] on anything but `file`, so a rejected call has
//! no side effects and never resolves a backend.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::UPath;
use crate::PathError;
use crate::pure::{Flavor, is_reserved_windows};

impl UPath {
    /// Change the permission bits of a local file.
    ///
    /// Off Unix only the write bits matter: clearing all of them makes the
    /// file read-only.
    pub fn chmod(&self, mode: u32) -> Result<(), PathError> {
        self.require_local("chmod")?;
        let host = self.host();

        #[cfg(unix)]
        let permissions = {
            use std::os::unix::fs::PermissionsExt;
            fs::Permissions::from_mode(mode)
        };
        #[cfg(not(unix))]
        let permissions = {
            let mut permissions = fs::metadata(host)
                .map_err(|e| self.io_err("chmod", e))?
                .permissions();
            permissions.set_readonly(mode & 0o222 == 0);
            permissions
        };

        fs::set_permissions(host, permissions).map_err(|e| self.io_err("chmod", e))
    }

    /// Name of the user owning a local file, or the numeric uid when the
    /// account database has no entry for it.
    ///
    /// Unsupported off Unix.
    pub fn owner(&self) -> Result<String, PathError> {
        self.require_local("owner")?;
        #[cfg(unix)]
        {
            let meta = fs::metadata(self.host()).map_err(|e| self.io_err("owner", e))?;
            Ok(accounts::owner(&meta))
        }
        #[cfg(not(unix))]
        {
            Err(self.unsupported_here("owner"))
        }
    }

    /// Name of the group owning a local file, or the numeric gid.
    ///
    /// Unsupported off Unix.
    pub fn group(&self) -> Result<String, PathError> {
        self.require_local("group")?;
        #[cfg(unix)]
        {
            let meta = fs::metadata(self.host()).map_err(|e| self.io_err("group", e))?;
            Ok(accounts::group(&meta))
        }
        #[cfg(not(unix))]
        {
            Err(self.unsupported_here("group"))
        }
    }

    /// Whether a local directory is a mount point.
    pub fn is_mount(&self) -> Result<bool, PathError> {
        self.require_local("is_mount")?;
        let host = self.host();
        match fs::symlink_metadata(host) {
            Ok(meta) if !meta.file_type().is_symlink() => Ok(kinds::mount_point(host, &meta)),
            _ => Ok(false),
        }
    }

    /// Whether a local path is a symbolic link (not followed).
    pub fn is_symlink(&self) -> Result<bool, PathError> {
        self.probe("is_symlink", false, |ft| ft.is_symlink())
    }

    /// Whether a local path is a Unix socket.
    pub fn is_socket(&self) -> Result<bool, PathError> {
        self.probe("is_socket", true, kinds::socket)
    }

    /// Whether a local path is a FIFO.
    pub fn is_fifo(&self) -> Result<bool, PathError> {
        self.probe("is_fifo", true, kinds::fifo)
    }

    /// Whether a local path is a block device.
    pub fn is_block_device(&self) -> Result<bool, PathError> {
        self.probe("is_block_device", true, kinds::block_device)
    }

    /// Whether a local path is a character device.
    pub fn is_char_device(&self) -> Result<bool, PathError> {
        self.probe("is_char_device", true, kinds::char_device)
    }

    /// Make this local path a symbolic link pointing at `target`.
    ///
    /// `target` is stored as written; relative targets resolve against the
    /// link's directory.
    pub fn symlink_to(&self, target: &str) -> Result<(), PathError> {
        self.require_local("symlink_to")?;
        kinds::symlink(target, self.host()).map_err(|e| self.io_err("symlink_to", e))
    }

    /// Local location with forward slashes.
    pub fn as_posix(&self) -> Result<String, PathError> {
        self.require_local("as_posix")?;
        Ok(self.location.replace('\\', "/"))
    }

    /// Whether the path is absolute. Remote paths always are.
    pub fn is_absolute(&self) -> bool {
        self.flavor().is_absolute(&self.location)
    }

    /// Whether the final segment is a reserved Windows device name.
    ///
    /// Always `false` for POSIX and remote paths.
    pub fn is_reserved(&self) -> bool {
        match self.flavor() {
            Flavor::Windows => is_reserved_windows(&self.name()),
            Flavor::Posix | Flavor::Remote => false,
        }
    }

    /// Canonical absolute form of a local path; remote paths return
    /// themselves.
    ///
    /// Symlinks and `..` are resolved against the real filesystem. With
    /// `strict` every component must exist; otherwise the longest existing
    /// prefix is canonicalized and the rest appended as written.
    pub fn resolve(&self, strict: bool) -> Result<UPath, PathError> {
        if !self.is_local() {
            return Ok(self.clone());
        }

        let host = self.host();
        let absolute = if host.is_absolute() {
            host.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| self.io_err("resolve", e))?
                .join(host)
        };

        let resolved = match fs::canonicalize(&absolute) {
            Ok(path) => path,
            Err(e) if strict => return Err(self.io_err("resolve", e)),
            Err(_) => canonicalize_existing_prefix(&absolute),
        };
        let text = resolved.to_string_lossy();
        // verbatim prefix added by canonicalize on Windows
        let location: &str = text.strip_prefix(r"\\?\").unwrap_or(&*text);
        Ok(self.with_location(location))
    }

    /// Like [`exists`](UPath::exists), but a dangling local symlink counts.
    pub fn lexists(&self) -> Result<bool, PathError> {
        if !self.is_local() {
            return self.exists();
        }
        match fs::symlink_metadata(self.host()) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.io_err("lexists", e)),
        }
    }

    fn host(&self) -> &Path {
        Path::new(&self.location)
    }

    fn probe(
        &self,
        operation: &'static str,
        follow: bool,
        test: impl FnOnce(&fs::FileType) -> bool,
    ) -> Result<bool, PathError> {
        self.require_local(operation)?;
        let meta = if follow {
            fs::metadata(self.host())
        } else {
            fs::symlink_metadata(self.host())
        };
        match meta {
            Ok(meta) => Ok(test(&meta.file_type())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.io_err(operation, e)),
        }
    }

    #[cfg(not(unix))]
    fn unsupported_here(&self, operation: &'static str) -> PathError {
        PathError::Unsupported {
            operation,
            protocol: self.protocol.clone(),
            path: self.urlpath(),
        }
    }
}

fn canonicalize_existing_prefix(path: &Path) -> PathBuf {
    for ancestor in path.ancestors().skip(1) {
        if let Ok(base) = fs::canonicalize(ancestor) {
            return match path.strip_prefix(ancestor) {
                Ok(rest) => base.join(rest),
                Err(_) => base,
            };
        }
    }
    path.to_path_buf()
}

#[cfg(unix)]
mod kinds {
    use std::fs::{FileType, Metadata};
    use std::io;
    use std::os::unix::fs::{FileTypeExt, MetadataExt};
    use std::path::Path;

    pub(super) fn socket(ft: &FileType) -> bool {
        ft.is_socket()
    }

    pub(super) fn fifo(ft: &FileType) -> bool {
        ft.is_fifo()
    }

    pub(super) fn block_device(ft: &FileType) -> bool {
        ft.is_block_device()
    }

    pub(super) fn char_device(ft: &FileType) -> bool {
        ft.is_char_device()
    }

    /// A different device than the parent, or the same inode (`/`).
    pub(super) fn mount_point(host: &Path, meta: &Metadata) -> bool {
        match std::fs::symlink_metadata(host.join("..")) {
            Ok(parent) => meta.dev() != parent.dev() || meta.ino() == parent.ino(),
            Err(_) => false,
        }
    }

    pub(super) fn symlink(target: &str, link: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(target, link)
    }
}

#[cfg(not(unix))]
mod kinds {
    use std::fs::{FileType, Metadata};
    use std::io;
    use std::path::Path;

    pub(super) fn socket(_: &FileType) -> bool {
        false
    }

    pub(super) fn fifo(_: &FileType) -> bool {
        false
    }

    pub(super) fn block_device(_: &FileType) -> bool {
        false
    }

    pub(super) fn char_device(_: &FileType) -> bool {
        false
    }

    pub(super) fn mount_point(host: &Path, meta: &Metadata) -> bool {
        meta.is_dir() && host.parent().is_none()
    }

    #[cfg(windows)]
    pub(super) fn symlink(target: &str, link: &Path) -> io::Result<()> {
        let pointee = link.parent().map_or_else(|| Path::new(target).to_path_buf(), |dir| dir.join(target));
        if pointee.is_dir() {
            std::os::windows::fs::symlink_dir(target, link)
        } else {
            std::os::windows::fs::symlink_file(target, link)
        }
    }

    #[cfg(not(windows))]
    pub(super) fn symlink(_: &str, _: &Path) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "symbolic links are not available"))
    }
}

#[cfg(unix)]
mod accounts {
    use std::ffi::CStr;
    use std::fs::Metadata;
    use std::os::unix::fs::MetadataExt;
    use std::ptr;

    const MAX_BUFFER: usize = 1 << 20;

    pub(super) fn owner(meta: &Metadata) -> String {
        let uid = meta.uid();
        user_name(uid).unwrap_or_else(|| uid.to_string())
    }

    pub(super) fn group(meta: &Metadata) -> String {
        let gid = meta.gid();
        group_name(gid).unwrap_or_else(|| gid.to_string())
    }

    fn user_name(uid: libc::uid_t) -> Option<String> {
        let mut buf = vec![0 as libc::c_char; 1024];
        loop {
            // SAFETY: all-zero is a valid passwd; it is only read after a
            // successful lookup filled it in.
            let mut entry: libc::passwd = unsafe { std::mem::zeroed() };
            let mut found: *mut libc::passwd = ptr::null_mut();
            // SAFETY: every pointer refers to a live local and `buf.len()`
            // is the real capacity of `buf`.
            let rc = unsafe { libc::getpwuid_r(uid, &mut entry, buf.as_mut_ptr(), buf.len(), &mut found) };
            if rc == libc::ERANGE && buf.len() < MAX_BUFFER {
                buf.resize(buf.len() * 2, 0);
                continue;
            }
            if rc != 0 || found.is_null() || entry.pw_name.is_null() {
                return None;
            }
            // SAFETY: on success pw_name points at a NUL-terminated string
            // inside `buf`, which is still alive.
            let name = unsafe { CStr::from_ptr(entry.pw_name) };
            return Some(name.to_string_lossy().into_owned());
        }
    }

    fn group_name(gid: libc::gid_t) -> Option<String> {
        let mut buf = vec![0 as libc::c_char; 1024];
        loop {
            // SAFETY: see `user_name`.
            let mut entry: libc::group = unsafe { std::mem::zeroed() };
            let mut found: *mut libc::group = ptr::null_mut();
            // SAFETY: see `user_name`.
            let rc = unsafe { libc::getgrgid_r(gid, &mut entry, buf.as_mut_ptr(), buf.len(), &mut found) };
            if rc == libc::ERANGE && buf.len() < MAX_BUFFER {
                buf.resize(buf.len() * 2, 0);
                continue;
            }
            if rc != 0 || found.is_null() || entry.gr_name.is_null() {
                return None;
            }
            // SAFETY: see `user_name`.
            let name = unsafe { CStr::from_ptr(entry.gr_name) };
            return Some(name.to_string_lossy().into_owned());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{BackendOptions, Resolver};

    fn p(raw: &str) -> UPath {
        UPath::in_resolver(raw, BackendOptions::new(), Arc::new(Resolver::default())).unwrap()
    }

    fn local(dir: &tempfile::TempDir, name: &str) -> UPath {
        p(&dir.path().join(name).to_string_lossy())
    }

    #[test]
    fn local_only_operations_reject_remote_paths() {
        // no factory for s3 in this resolver: resolving would be a Backend error
        let remote = p("s3://bucket/a.txt");
        let checks: Vec<(&str, PathError)> = vec![
            ("chmod", remote.chmod(0o644).unwrap_err()),
            ("owner", remote.owner().unwrap_err()),
            ("group", remote.group().unwrap_err()),
            ("is_mount", remote.is_mount().unwrap_err()),
            ("is_symlink", remote.is_symlink().unwrap_err()),
            ("is_socket", remote.is_socket().unwrap_err()),
            ("is_fifo", remote.is_fifo().unwrap_err()),
            ("is_block_device", remote.is_block_device().unwrap_err()),
            ("is_char_device", remote.is_char_device().unwrap_err()),
            ("symlink_to", remote.symlink_to("x").unwrap_err()),
            ("as_posix", remote.as_posix().unwrap_err()),
        ];
        for (name, err) in checks {
            match err {
                PathError::Unsupported { operation, protocol, path } => {
                    assert_eq!(operation, name);
                    assert_eq!(protocol, "s3");
                    assert_eq!(path, "s3://bucket/a.txt");
                }
                other => panic!("{name}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn universal_operations_fall_back_for_remote() {
        let remote = p("s3://bucket/CON");
        assert!(remote.is_absolute());
        assert!(!remote.is_reserved());
        assert_eq!(remote.resolve(true).unwrap(), remote);
        assert!(!p("relative/x").is_absolute());
    }

    #[cfg(unix)]
    #[test]
    fn chmod_changes_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let file = local(&dir, "f.txt");
        fs::write(file.path(), b"x").unwrap();
        file.chmod(0o600).unwrap();
        let mode = fs::metadata(file.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn chmod_missing_file_is_a_backend_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = local(&dir, "missing").chmod(0o600).unwrap_err();
        assert!(err.is_not_found());
    }

    #[cfg(unix)]
    #[test]
    fn owner_and_group_are_named() {
        let dir = tempfile::tempdir().unwrap();
        let file = local(&dir, "f.txt");
        fs::write(file.path(), b"x").unwrap();
        assert!(!file.owner().unwrap().is_empty());
        assert!(!file.group().unwrap().is_empty());
    }

    #[cfg(not(unix))]
    #[test]
    fn owner_and_group_are_unsupported_off_unix() {
        let dir = tempfile::tempdir().unwrap();
        let file = local(&dir, "f.txt");
        fs::write(file.path(), b"x").unwrap();
        assert!(matches!(file.owner(), Err(PathError::Unsupported { .. })));
        assert!(matches!(file.group(), Err(PathError::Unsupported { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn lexists_sees_dangling_links() {
        let dir = tempfile::tempdir().unwrap();
        let link = local(&dir, "dangling");
        link.symlink_to("nowhere.txt").unwrap();

        assert!(link.lexists().unwrap());
        assert!(!link.exists().unwrap());
        assert!(!local(&dir, "missing").lexists().unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn file_kind_probes() {
        let dir = tempfile::tempdir().unwrap();
        let file = local(&dir, "f.txt");
        fs::write(file.path(), b"x").unwrap();
        let link = local(&dir, "link");
        link.symlink_to("f.txt").unwrap();

        assert!(link.is_symlink().unwrap());
        assert!(!file.is_symlink().unwrap());
        assert!(!file.is_fifo().unwrap());
        assert!(!file.is_socket().unwrap());
        assert!(!file.is_block_device().unwrap());
        assert!(!file.is_char_device().unwrap());
        assert!(!local(&dir, "missing").is_symlink().unwrap());
        assert!(p("/dev/null").is_char_device().unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn mount_points() {
        assert!(p("/").is_mount().unwrap());
        let dir = tempfile::tempdir().unwrap();
        let sub = local(&dir, "sub");
        fs::create_dir(sub.path()).unwrap();
        assert!(!sub.is_mount().unwrap());
        assert!(!local(&dir, "missing").is_mount().unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn resolve_strict_and_lenient() {
        let dir = tempfile::tempdir().unwrap();
        let real = fs::canonicalize(dir.path()).unwrap();
        fs::create_dir(real.join("a")).unwrap();

        let existing = local(&dir, "a");
        assert_eq!(existing.resolve(true).unwrap().path(), real.join("a").to_string_lossy());

        let missing = local(&dir, "a/missing/leaf.txt");
        assert!(missing.resolve(true).unwrap_err().is_not_found());
        assert_eq!(
            missing.resolve(false).unwrap().path(),
            real.join("a/missing/leaf.txt").to_string_lossy()
        );
    }

    #[test]
    fn as_posix_uses_forward_slashes() {
        assert_eq!(p("dir/file.txt").as_posix().unwrap(), "dir/file.txt");
    }
}
