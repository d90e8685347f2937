//! Integration tests exercising paths, resolution and transfers together.
//!
//! These tests verify that:
//! 1. Local-only operations never resolve a backend for remote paths
//! 2. Paths with equal options share one backend handle
//! 3. Streamed transfers never leave partial destinations behind
//! 4. put/get/copy/move work between the local disk and other backends

use anypath::protocol::parse_address;
use anypath::*;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// =============================================================================
// Test Backends
// =============================================================================

/// Memory store that fails every read past its first `good_bytes` bytes.
struct FlakyReads {
    inner: MemoryBackend,
    good_bytes: usize,
}

struct FlakyReader {
    data: io::Cursor<Vec<u8>>,
    remaining: usize,
}

impl Read for FlakyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"));
        }
        let limit = buf.len().min(self.remaining);
        let n = self.data.read(&mut buf[..limit])?;
        self.remaining -= n;
        Ok(n)
    }
}

impl FsRead for FlakyReads {
    fn read(&self, path: &str) -> Result<Vec<u8>, FsError> {
        let data = self.inner.read(path)?;
        if data.len() > self.good_bytes {
            let reset = io::Error::new(io::ErrorKind::ConnectionReset, "connection reset");
            return Err(FsError::io("read", path, reset));
        }
        Ok(data)
    }

    fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>, FsError> {
        self.inner.read_range(path, offset, len)
    }

    fn exists(&self, path: &str) -> Result<bool, FsError> {
        self.inner.exists(path)
    }

    fn metadata(&self, path: &str) -> Result<Metadata, FsError> {
        self.inner.metadata(path)
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>, FsError> {
        Ok(Box::new(FlakyReader {
            data: io::Cursor::new(self.inner.read(path)?),
            remaining: self.good_bytes,
        }))
    }
}

impl FsWrite for FlakyReads {
    fn write(&self, path: &str, data: &[u8]) -> Result<(), FsError> {
        self.inner.write(path, data)
    }

    fn remove_file(&self, path: &str) -> Result<(), FsError> {
        self.inner.remove_file(path)
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        self.inner.rename(from, to)
    }

    fn copy(&self, from: &str, to: &str) -> Result<(), FsError> {
        self.inner.copy(from, to)
    }

    fn open_write(&self, path: &str) -> Result<Box<dyn Write + Send>, FsError> {
        self.inner.open_write(path)
    }

    fn touch(&self, path: &str, truncate: bool) -> Result<(), FsError> {
        self.inner.touch(path, truncate)
    }
}

impl FsDir for FlakyReads {
    fn read_dir(&self, path: &str) -> Result<ReadDirIter, FsError> {
        self.inner.read_dir(path)
    }

    fn create_dir(&self, path: &str) -> Result<(), FsError> {
        self.inner.create_dir(path)
    }

    fn create_dir_all(&self, path: &str) -> Result<(), FsError> {
        self.inner.create_dir_all(path)
    }

    fn remove_dir(&self, path: &str) -> Result<(), FsError> {
        self.inner.remove_dir(path)
    }

    fn remove_dir_all(&self, path: &str) -> Result<(), FsError> {
        self.inner.remove_dir_all(path)
    }
}

impl FsSession for FlakyReads {
    fn sign(&self, path: &str, expiration: Duration) -> Result<String, FsError> {
        Ok(format!("https://signed.example/{path}?ttl={}", expiration.as_secs()))
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn isolated() -> Arc<Resolver> {
    Arc::new(Resolver::new(ResolverConfig::default()))
}

/// Resolver with an `s3` factory that counts constructions.
fn counting_s3() -> (Arc<Resolver>, Arc<AtomicUsize>) {
    let resolver = isolated();
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    resolver.register("s3", move |_: &BackendContext<'_>| -> Result<Arc<dyn Fs>, FsError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MemoryBackend::new()))
    });
    (resolver, built)
}

/// Resolver with a `flaky` protocol whose readers fail after `good_bytes`.
fn with_flaky(good_bytes: usize) -> Arc<Resolver> {
    let resolver = isolated();
    resolver.register("flaky", move |_: &BackendContext<'_>| -> Result<Arc<dyn Fs>, FsError> {
        Ok(Arc::new(FlakyReads {
            inner: MemoryBackend::new(),
            good_bytes,
        }))
    });
    resolver
}

fn at(raw: &str, resolver: &Arc<Resolver>) -> UPath {
    UPath::in_resolver(raw, BackendOptions::new(), Arc::clone(resolver)).unwrap()
}

fn local(dir: &tempfile::TempDir, resolver: &Arc<Resolver>) -> UPath {
    let root = UPath::from_local(dir.path());
    UPath::in_resolver(&root.urlpath(), BackendOptions::new(), Arc::clone(resolver)).unwrap()
}

// =============================================================================
// Tests: Routing
// =============================================================================

#[test]
fn local_only_ops_never_construct_a_remote_backend() {
    let (resolver, built) = counting_s3();
    let path = at("s3://bucket/key.txt", &resolver);

    assert!(matches!(path.chmod(0o644), Err(PathError::Unsupported { .. })));
    assert!(matches!(path.owner(), Err(PathError::Unsupported { .. })));
    assert!(matches!(path.is_symlink(), Err(PathError::Unsupported { .. })));
    assert!(matches!(path.symlink_to("elsewhere"), Err(PathError::Unsupported { .. })));
    assert!(path.is_absolute());
    assert_eq!(path.resolve(true).unwrap(), path);
    assert_eq!(built.load(Ordering::SeqCst), 0);
    assert_eq!(resolver.cached_handles(), 0);

    assert!(!path.exists().unwrap());
    assert_eq!(built.load(Ordering::SeqCst), 1);
}

#[test]
fn unsupported_error_names_operation_and_protocol() {
    let (resolver, _) = counting_s3();
    let err = at("s3://bucket/key.txt", &resolver).group().unwrap_err();
    let message = err.to_string();
    assert!(message.contains("group"), "{message}");
    assert!(message.contains("s3"), "{message}");
}

#[test]
fn unknown_protocol_surfaces_as_backend_error() {
    let path = at("nosuch://bucket/key", &isolated());
    assert_eq!(path.name(), "key");
    match path.exists() {
        Err(PathError::Backend { source, .. }) => {
            assert!(matches!(source, FsError::UnknownProtocol { .. }));
        }
        other => panic!("expected a backend error, got {other:?}"),
    }
}

// =============================================================================
// Tests: Handle Sharing
// =============================================================================

#[test]
fn equal_options_share_one_handle() {
    let (resolver, built) = counting_s3();
    let opts_a = BackendOptions::new().with("region", "eu").with("profile", "ci");
    let opts_b = BackendOptions::new().with("profile", "ci").with("region", "eu");

    let a = UPath::in_resolver("s3://bucket/a.txt", opts_a, Arc::clone(&resolver)).unwrap();
    let b = UPath::in_resolver("s3://bucket/b.txt", opts_b, Arc::clone(&resolver)).unwrap();
    assert!(Arc::ptr_eq(&a.fs().unwrap(), &b.fs().unwrap()));
    assert_eq!(built.load(Ordering::SeqCst), 1);

    a.write_text("shared").unwrap();
    assert_eq!(b.with_location("bucket/a.txt").read_text().unwrap(), "shared");

    let other = UPath::in_resolver("s3://bucket/a.txt", BackendOptions::new().with("region", "us"), resolver).unwrap();
    assert!(!Arc::ptr_eq(&a.fs().unwrap(), &other.fs().unwrap()));
    assert_eq!(built.load(Ordering::SeqCst), 2);
}

#[test]
fn invalidation_is_seen_by_every_holder() {
    let (resolver, built) = counting_s3();
    let a = at("s3://bucket/a", &resolver);
    let b = at("s3://bucket/b", &resolver);
    let before = a.fs().unwrap();

    assert!(b.clear_instance_cache());
    assert!(!b.clear_instance_cache());

    let after = a.fs().unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(Arc::ptr_eq(&after, &b.fs().unwrap()));
    assert_eq!(built.load(Ordering::SeqCst), 2);
}

#[test]
fn concurrent_paths_resolve_to_one_handle() {
    let (resolver, _) = counting_s3();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let path = at(&format!("s3://bucket/file-{i}"), &resolver);
            std::thread::spawn(move || path.fs().unwrap())
        })
        .collect();
    let resolved: Vec<Arc<dyn Fs>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for fs in &resolved[1..] {
        assert!(Arc::ptr_eq(&resolved[0], fs));
    }
    assert_eq!(resolver.cached_handles(), 1);
}

#[test]
fn session_cache_reaches_the_configured_factory() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = Arc::new(Resolver::new(ResolverConfig {
        session_cache: Some(SessionCacheConfig {
            protocol: "s3".to_owned(),
            dir: Some(dir.path().to_path_buf()),
        }),
    }));
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    resolver.register("s3", move |ctx: &BackendContext<'_>| -> Result<Arc<dyn Fs>, FsError> {
        if let Some(cache) = ctx.session {
            cache.set("profile-ci", "token-1");
            counter.fetch_add(1, Ordering::SeqCst);
        }
        Ok(Arc::new(MemoryBackend::new()))
    });

    at("s3://bucket/x", &resolver).fs().unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 1);

    // a second process would find the session on disk
    let reopened = SessionCache::persistent(dir.path());
    assert_eq!(reopened.get("profile-ci").as_deref(), Some("token-1"));
}

#[test]
fn sign_is_forwarded_or_unsupported() {
    let resolver = with_flaky(usize::MAX);
    let url = at("flaky://bucket/report.csv", &resolver)
        .sign(Duration::from_secs(60))
        .unwrap();
    assert_eq!(url, "https://signed.example/bucket/report.csv?ttl=60");

    let err = at("memory://bucket/report.csv", &resolver)
        .sign(Duration::from_secs(60))
        .unwrap_err();
    assert!(matches!(err.backend_error(), Some(FsError::NotSupported { .. })));
}

// =============================================================================
// Tests: Addresses
// =============================================================================

#[test]
fn urlpath_round_trips_through_the_parser() {
    let resolver = isolated();
    for raw in [
        "s3://bucket/a/b.txt",
        "simplecache::s3://bucket/key",
        "gs://b/a.tar.gz",
        "memory://bucket/x",
    ] {
        let path = at(raw, &resolver);
        let parsed = parse_address(&path.urlpath()).unwrap();
        assert_eq!(parsed.wrappers, path.wrappers(), "{raw}");
        assert_eq!(parsed.protocol, path.protocol(), "{raw}");
        assert_eq!(parsed.location, path.path(), "{raw}");
        assert_eq!(at(&path.urlpath(), &resolver), path, "{raw}");
    }
}

#[test]
fn pathlib_scenarios() {
    let resolver = isolated();

    let key = at("s3://bucket/a/b.txt", &resolver);
    assert_eq!((key.name(), key.stem(), key.suffix()), ("b.txt".into(), "b".into(), ".txt".into()));
    assert_eq!(key.parent().urlpath(), "s3://bucket/a");

    let archive = at("gs://b/a.tar.gz", &resolver);
    assert_eq!(archive.suffixes(), vec![".tar", ".gz"]);
    assert_eq!(archive.with_suffix(".zip").unwrap().name(), "a.tar.zip");

    let base = at("memory://bucket/dir", &resolver);
    assert_eq!((&base / "sub").relative_to(&base).unwrap(), "sub");
    assert!(base.relative_to(&(&base / "sub")).is_err());

    let bucket = at("s3://bucket", &resolver);
    assert_eq!(bucket.parent(), bucket);
    assert_eq!(bucket.name(), "");
}

#[cfg(unix)]
#[test]
fn local_joinpath_scenario() {
    let joined = at("/tmp/x", &isolated()).joinpath(["y", "z"]).unwrap();
    assert_eq!(joined.path(), "/tmp/x/y/z");
    assert!(joined.is_local());
    assert_eq!(joined.as_uri().unwrap(), "file:///tmp/x/y/z");
}

// =============================================================================
// Tests: Transfers
// =============================================================================

#[test]
fn failing_first_read_leaves_no_destination() {
    let resolver = with_flaky(0);
    let src = at("flaky://bucket/data.bin", &resolver);
    let dst = at("memory://bucket/data.bin", &resolver);
    src.write_bytes(b"payload").unwrap();

    let err = src.copy(&dst, false, OnError::Raise).unwrap_err();
    assert!(matches!(err, PathError::Backend { .. }), "{err:?}");
    assert!(!dst.exists().unwrap());
}

#[test]
fn failing_mid_stream_removes_the_partial_copy() {
    let resolver = with_flaky(3);
    let src = at("flaky://bucket/data.bin", &resolver);
    let dst = at("memory://bucket/data.bin", &resolver);
    src.write_bytes(b"much longer than three bytes").unwrap();

    assert!(src.copy(&dst, false, OnError::Raise).is_err());
    assert!(!dst.exists().unwrap());
}

#[test]
fn failed_move_keeps_the_source() {
    let resolver = with_flaky(3);
    let src = at("flaky://bucket/data.bin", &resolver);
    let dst = at("memory://bucket/data.bin", &resolver);
    src.write_bytes(b"much longer than three bytes").unwrap();

    assert!(src.move_to(&dst, false, OnError::Raise).is_err());
    assert!(src.exists().unwrap());
    assert!(!dst.exists().unwrap());
}

#[test]
fn continue_collects_every_failure() {
    let resolver = with_flaky(0);
    let src = at("flaky://bucket/tree", &resolver);
    (&src / "a.txt").write_text("a").unwrap();
    (&src / "nested/b.txt").write_text("b").unwrap();
    let dst = at("memory://mirror/tree", &resolver);

    match src.copy(&dst, true, OnError::Continue) {
        Err(PathError::Transfer(report)) => {
            assert_eq!(report.failed.len(), 2);
            assert!(report.succeeded.is_empty());
            assert!(!report.is_clean());
        }
        other => panic!("expected a transfer report, got {other:?}"),
    }
    assert!(!(&dst / "a.txt").exists().unwrap());
}

#[test]
fn put_and_get_between_disk_and_memory() {
    let resolver = isolated();
    let dir = tempfile::tempdir().unwrap();
    let root = local(&dir, &resolver);

    let upload = &root / "upload.txt";
    upload.write_text("from disk").unwrap();
    let remote = at("memory://bucket/upload.txt", &resolver);
    let report = upload.put(&remote, false).unwrap();
    assert_eq!(report.succeeded, vec![(upload.clone(), remote.clone())]);
    assert_eq!(remote.read_text().unwrap(), "from disk");

    let download = &root / "download.txt";
    remote.get(&download, false).unwrap();
    assert_eq!(download.read_text().unwrap(), "from disk");

    // put/get need the local side in the right place
    assert!(matches!(remote.put(&download, false), Err(PathError::Unsupported { .. })));
    assert!(matches!(upload.get(&remote, false), Err(PathError::Unsupported { .. })));
}

#[test]
fn send_and_receive_mirror_put_and_get() {
    let resolver = isolated();
    let dir = tempfile::tempdir().unwrap();
    let root = local(&dir, &resolver);
    let on_disk = &root / "a.txt";
    on_disk.write_text("A").unwrap();

    let remote = at("memory://bucket/a.txt", &resolver);
    remote.send(&on_disk, false).unwrap();
    assert_eq!(remote.read_text().unwrap(), "A");

    let back = &root / "back.txt";
    back.receive(&remote, false).unwrap();
    assert_eq!(back.read_text().unwrap(), "A");
}

#[test]
fn recursive_copy_from_disk_mirrors_the_tree() {
    let resolver = isolated();
    let dir = tempfile::tempdir().unwrap();
    let root = local(&dir, &resolver);
    (&root / "tree/sub").mkdir(true, false).unwrap();
    (&root / "tree/a.txt").write_text("a").unwrap();
    (&root / "tree/sub/b.txt").write_text("bb").unwrap();

    let dst = at("memory://bucket/copy", &resolver);
    let report = (&root / "tree").copy(&dst, true, OnError::Raise).unwrap();
    assert_eq!(report.succeeded.len(), 2);
    assert_eq!((&dst / "a.txt").read_text().unwrap(), "a");
    assert_eq!((&dst / "sub/b.txt").read_text().unwrap(), "bb");
    assert_eq!(dst.du(None).unwrap(), 3);

    let names: Vec<String> = dst.rglob("*.txt").unwrap().iter().map(UPath::name).collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);
}

#[test]
fn recursive_move_from_memory_to_disk() {
    let resolver = isolated();
    let dir = tempfile::tempdir().unwrap();
    let target = &local(&dir, &resolver) / "restored";

    let src = at("memory://bucket/tree", &resolver);
    (&src / "a.txt").write_text("a").unwrap();
    (&src / "sub/b.txt").write_text("b").unwrap();

    let report = src.move_to(&target, true, OnError::Raise).unwrap();
    assert!(report.is_clean());
    assert_eq!((&target / "sub/b.txt").read_text().unwrap(), "b");
    assert!(target.join("a.txt").is_file().unwrap());
    assert!(!src.exists().unwrap());
}

#[test]
fn rename_on_disk_is_native() {
    let resolver = isolated();
    let dir = tempfile::tempdir().unwrap();
    let root = local(&dir, &resolver);
    let from = &root / "old.txt";
    from.write_text("x").unwrap();

    let to = from.rename(&(&root / "new.txt")).unwrap();
    assert!(!from.exists().unwrap());
    assert_eq!(to.read_text().unwrap(), "x");
    assert_eq!(root.ls().unwrap(), vec![to]);
}

// =============================================================================
// Tests: Multi-Path Reads
// =============================================================================

#[test]
fn cat_expands_patterns_and_directories() {
    let resolver = isolated();
    let root = at("memory://bucket/logs", &resolver);
    (&root / "a.log").write_text("A").unwrap();
    (&root / "b.txt").write_text("B").unwrap();
    (&root / "2024/c.log").write_text("C").unwrap();

    let logs = root.join("*.log").cat(false, OnError::Raise).unwrap();
    assert_eq!(logs.keys().cloned().collect::<Vec<_>>(), vec![&root / "a.log"]);

    let all = root.cat(true, OnError::Raise).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[&(&root / "2024/c.log")], b"C");

    let single = (&root / "b.txt").cat(false, OnError::Raise).unwrap();
    assert_eq!(single.into_values().collect::<Vec<_>>(), vec![b"B".to_vec()]);

    assert!(at("memory://bucket/none/*.log", &resolver).cat(false, OnError::Raise).is_err());
}

#[test]
fn cat_error_policy() {
    let resolver = with_flaky(4);
    let root = at("flaky://bucket/data", &resolver);
    let short = &root / "short.bin";
    let long = &root / "long.bin";
    short.write_bytes(b"ok").unwrap();
    long.write_bytes(b"far too long").unwrap();

    match root.cat(true, OnError::Raise) {
        Err(PathError::Backend { operation, path, .. }) => {
            assert_eq!(operation, "cat");
            assert_eq!(path, long.urlpath());
        }
        other => panic!("expected a backend error, got {other:?}"),
    }

    let partial = root.cat(true, OnError::Continue).unwrap();
    assert_eq!(partial.len(), 1);
    assert_eq!(partial[&short], b"ok");
}

#[cfg(unix)]
#[test]
fn lexists_counts_dangling_links_only_locally() {
    let resolver = isolated();
    let dir = tempfile::tempdir().unwrap();
    let link = &local(&dir, &resolver) / "dangling";
    link.symlink_to("missing-target").unwrap();
    assert!(link.lexists().unwrap());
    assert!(!link.exists().unwrap());

    let remote = at("memory://bucket/key", &resolver);
    assert!(!remote.lexists().unwrap());
    remote.write_text("x").unwrap();
    assert!(remote.lexists().unwrap());
}

// =============================================================================
// Tests: Trait Properties
// =============================================================================

#[test]
fn public_types_are_thread_safe() {
    fn assert_send_sync<T: Send + Sync + ?Sized>() {}
    assert_send_sync::<UPath>();
    assert_send_sync::<Resolver>();
    assert_send_sync::<SessionCache>();
    assert_send_sync::<dyn Fs>();
    assert_send_sync::<TransferReport>();
}

#[test]
fn custom_backend_is_usable_as_dyn_fs() {
    fn use_fs(fs: &dyn Fs, path: &str) -> bool {
        fs.exists(path).unwrap()
    }
    let backend = FlakyReads {
        inner: MemoryBackend::new(),
        good_bytes: 0,
    };
    backend.write("k", b"v").unwrap();
    assert!(use_fs(&backend, "k"));
    assert_eq!(backend.file_size("k").unwrap(), 1);
}
