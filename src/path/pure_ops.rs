//! Structural operations. None of these touch a backend.

use std::iter::FusedIterator;

use super::UPath;
use crate::PathError;
use crate::protocol::{CHAIN_DELIMITER, SCHEME_MARKER};
use crate::pure::{self, Flavor};

impl UPath {
    /// Segments, prefixed by the anchor when there is one.
    ///
    /// ```rust
    /// use anypath::UPath;
    ///
    /// let p = UPath::new("s3://bucket/a/b.txt").unwrap();
    /// assert_eq!(p.parts(), vec!["bucket", "a", "b.txt"]);
    /// ```
    pub fn parts(&self) -> Vec<String> {
        self.flavor().parts(&self.location)
    }

    /// The path without its final segment.
    ///
    /// The parent of an anchor (`/`, a bare bucket, `.`) is the path itself.
    pub fn parent(&self) -> UPath {
        self.derive(self.flavor().parent(&self.location))
    }

    /// Successive parents, nearest first, ending at the anchor.
    pub fn parents(&self) -> Parents {
        Parents {
            current: Some(self.clone()),
        }
    }

    /// Returns `true` unless this path is its own parent.
    pub fn has_parent(&self) -> bool {
        self.flavor().parent(&self.location) != self.location
    }

    /// Final segment; empty for anchors.
    pub fn name(&self) -> String {
        self.flavor().name(&self.location)
    }

    /// Final segment without its last suffix.
    pub fn stem(&self) -> String {
        pure::stem(&self.name()).to_owned()
    }

    /// Last suffix including the dot, or an empty string.
    pub fn suffix(&self) -> String {
        pure::suffix(&self.name()).to_owned()
    }

    /// All suffixes of the final segment.
    pub fn suffixes(&self) -> Vec<String> {
        pure::suffixes(&self.name())
    }

    /// Append one segment (which may itself contain separators).
    ///
    /// An absolute segment replaces the location; for unrooted remote paths
    /// that includes the bucket. Also available as the `/` operator.
    pub fn join(&self, segment: &str) -> UPath {
        self.derive(self.flavor().join(&self.location, segment))
    }

    /// Append several segments.
    ///
    /// ```rust
    /// use anypath::UPath;
    ///
    /// let p = UPath::new("/tmp/x").unwrap();
    /// assert_eq!(p.joinpath(["y", "z"]).unwrap().path(), "/tmp/x/y/z");
    /// assert!(p.joinpath(["s3://bucket"]).is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// [`PathError::InvalidPath`] for a segment carrying a protocol marker
    /// (`://` or `::`) or a NUL byte.
    pub fn joinpath<I, S>(&self, segments: I) -> Result<UPath, PathError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let flavor = self.flavor();
        let mut location = self.location.clone();
        for segment in segments {
            let segment = segment.as_ref();
            if segment.contains(SCHEME_MARKER) || segment.contains(CHAIN_DELIMITER) || segment.contains('\0') {
                return Err(PathError::InvalidPath {
                    path: segment.to_owned(),
                    reason: "segment must not carry a protocol or NUL byte".to_owned(),
                });
            }
            location = flavor.join(&location, segment);
        }
        Ok(self.derive(location))
    }

    /// Replace the final segment.
    ///
    /// # Errors
    ///
    /// [`PathError::InvalidPath`] for an empty or separator-containing name,
    /// or when this path has no name.
    pub fn with_name(&self, name: &str) -> Result<UPath, PathError> {
        let location = self
            .flavor()
            .with_name(&self.location, name)
            .map_err(|reason| self.invalid(reason))?;
        Ok(self.derive(location))
    }

    /// Replace the stem, keeping the suffix.
    ///
    /// # Errors
    ///
    /// Same conditions as [`UPath::with_name`], plus an empty stem.
    pub fn with_stem(&self, stem: &str) -> Result<UPath, PathError> {
        let location = self
            .flavor()
            .with_stem(&self.location, stem)
            .map_err(|reason| self.invalid(reason))?;
        Ok(self.derive(location))
    }

    /// Replace the last suffix; an empty suffix removes it.
    ///
    /// ```rust
    /// use anypath::UPath;
    ///
    /// let p = UPath::new("gs://b/a.tar.gz").unwrap();
    /// assert_eq!(p.with_suffix(".bz2").unwrap().name(), "a.tar.bz2");
    /// assert_eq!(p.with_suffix("").unwrap().name(), "a.tar");
    /// assert!(p.with_suffix("gz").is_err());
    /// ```
    ///
    /// # Errors
    ///
    /// [`PathError::InvalidPath`] if the suffix does not start with `.`, is
    /// exactly `.`, contains a separator, or this path has no name.
    pub fn with_suffix(&self, suffix: &str) -> Result<UPath, PathError> {
        let location = self
            .flavor()
            .with_suffix(&self.location, suffix)
            .map_err(|reason| self.invalid(reason))?;
        Ok(self.derive(location))
    }

    /// This path relative to `other`, as a plain string (`.` when equal).
    ///
    /// `other.join(&result)` gives back this path.
    ///
    /// # Errors
    ///
    /// [`PathError::RelativePath`] when the protocols differ or `other` is
    /// not a literal prefix of this path.
    pub fn relative_to(&self, other: &UPath) -> Result<String, PathError> {
        let mismatch = || PathError::RelativePath {
            path: self.urlpath(),
            other: other.urlpath(),
        };
        if self.protocol != other.protocol {
            return Err(mismatch());
        }
        self.flavor()
            .relative_to(&self.location, &other.location)
            .ok_or_else(mismatch)
    }

    /// Returns `true` if [`relative_to`](UPath::relative_to) would succeed.
    pub fn is_relative_to(&self, other: &UPath) -> bool {
        self.relative_to(other).is_ok()
    }

    /// Glob-match this path against `pattern`.
    ///
    /// Relative patterns match from the right, anchored ones match the whole
    /// path. Remote paths match as if rooted at the bucket.
    ///
    /// ```rust
    /// use anypath::UPath;
    ///
    /// let p = UPath::new("s3://bucket/logs/app.log").unwrap();
    /// assert!(p.matches("*.log").unwrap());
    /// assert!(p.matches("logs/*.log").unwrap());
    /// assert!(p.matches("/bucket/**/*.log").unwrap());
    /// assert!(!p.matches("/logs/*.log").unwrap());
    /// ```
    ///
    /// # Errors
    ///
    /// [`PathError::InvalidPath`] for an empty pattern.
    pub fn matches(&self, pattern: &str) -> Result<bool, PathError> {
        if pattern.is_empty() {
            return Err(PathError::InvalidPath {
                path: pattern.to_owned(),
                reason: "empty pattern".to_owned(),
            });
        }
        Ok(self.flavor().matches(&self.location, pattern))
    }

    /// Separator of this path's flavor.
    pub fn sep(&self) -> char {
        self.flavor().sep()
    }

    /// Drive letter or UNC share; empty on POSIX and remote paths.
    pub fn drive(&self) -> String {
        self.flavor().drive(&self.location)
    }

    /// Root marker; empty on relative and remote paths.
    pub fn root(&self) -> String {
        self.flavor().root(&self.location)
    }

    /// Drive plus root.
    pub fn anchor(&self) -> String {
        self.flavor().anchor(&self.location)
    }

    /// `file://` URI for absolute local paths, the full address otherwise.
    ///
    /// # Errors
    ///
    /// [`PathError::InvalidPath`] for a relative local path.
    pub fn as_uri(&self) -> Result<String, PathError> {
        if !self.is_local() {
            return Ok(self.fullpath());
        }
        let flavor = self.flavor();
        if !flavor.is_absolute(&self.location) {
            return Err(self.invalid("relative path can't be expressed as a file URI".to_owned()));
        }
        let path = match flavor {
            Flavor::Windows => {
                let forward = self.location.replace('\\', "/");
                match forward.strip_prefix("//") {
                    // UNC share: file://server/share/...
                    Some(unc) => unc.to_owned(),
                    None => format!("/{forward}"),
                }
            }
            Flavor::Posix | Flavor::Remote => self.location.clone(),
        };
        Ok(format!("file://{}", percent_encode(&path)))
    }

    /// Child of this path at an already-normalized location.
    pub(crate) fn derive(&self, location: String) -> UPath {
        UPath {
            wrappers: self.wrappers.clone(),
            protocol: self.protocol.clone(),
            location,
            options: self.options.clone(),
            resolver: self.resolver.clone(),
        }
    }

    fn invalid(&self, reason: String) -> PathError {
        PathError::InvalidPath {
            path: self.urlpath(),
            reason,
        }
    }
}

fn percent_encode(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~/:@!$&'()*+,;=".contains(&byte) {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Iterator over the ancestors of a [`UPath`], from
/// [`UPath::parents`].
#[derive(Debug, Clone)]
pub struct Parents {
    current: Option<UPath>,
}

impl Iterator for Parents {
    type Item = UPath;

    fn next(&mut self) -> Option<UPath> {
        let current = self.current.take()?;
        let parent = current.parent();
        if parent.location == current.location {
            return None;
        }
        self.current = Some(parent.clone());
        Some(parent)
    }
}

impl FusedIterator for Parents {}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{BackendOptions, Resolver};

    fn p(raw: &str) -> UPath {
        UPath::in_resolver(raw, BackendOptions::new(), Arc::new(Resolver::default())).unwrap()
    }

    #[test]
    fn remote_name_stem_suffix_parent() {
        let path = p("s3://bucket/a/b.txt");
        assert_eq!(path.name(), "b.txt");
        assert_eq!(path.stem(), "b");
        assert_eq!(path.suffix(), ".txt");
        assert_eq!(path.parent().path(), "bucket/a");
        assert_eq!(path.parent().protocol(), "s3");
    }

    #[test]
    fn suffixes_are_the_same_everywhere() {
        assert_eq!(p("gs://b/a.tar.gz").suffixes(), vec![".tar", ".gz"]);
        assert_eq!(p("/tmp/a.tar.gz").suffixes(), vec![".tar", ".gz"]);
        assert_eq!(p("s3://b/.hidden").suffix(), "");
        assert_eq!(p("s3://b/trailing.").suffix(), "");
    }

    #[test]
    fn parent_converges_to_a_fixed_point() {
        for raw in ["s3://bucket/a/b/c.txt", "/tmp/x/y", "rel/a/b", "memory:///x/y"] {
            let mut current = p(raw);
            for _ in 0..10 {
                current = current.parent();
            }
            assert_eq!(current.parent(), current, "{raw}");
            assert!(!current.has_parent(), "{raw}");
        }
    }

    #[test]
    fn parents_end_at_the_anchor() {
        let parents: Vec<String> = p("s3://bucket/a/b/c").parents().map(|x| x.path().to_owned()).collect();
        assert_eq!(parents, vec!["bucket/a/b", "bucket/a", "bucket"]);

        let parents: Vec<String> = p("a/b").parents().map(|x| x.path().to_owned()).collect();
        assert_eq!(parents, vec!["a", "."]);

        assert_eq!(p("s3://bucket").parents().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn local_parents() {
        let parents: Vec<String> = p("/tmp/x/y").parents().map(|x| x.path().to_owned()).collect();
        assert_eq!(parents, vec!["/tmp/x", "/tmp", "/"]);
        assert_eq!(p("/tmp/x").parts(), vec!["/", "tmp", "x"]);
        assert_eq!(p("/tmp/x").anchor(), "/");
        assert_eq!(p("/tmp/x").sep(), '/');
    }

    #[test]
    fn join_and_div() {
        let base = p("s3://bucket/dir");
        assert_eq!((&base / "a/b.txt").path(), "bucket/dir/a/b.txt");
        assert_eq!((&base / "/other/key").path(), "other/key");
        assert_eq!(base.join("../x").path(), "bucket/x");
        assert_eq!((base / "c").urlpath(), "s3://bucket/dir/c");
    }

    #[test]
    fn joinpath_rejects_protocol_markers() {
        let base = p("s3://bucket");
        assert!(matches!(base.joinpath(["a", "b::c"]), Err(PathError::InvalidPath { .. })));
        assert!(base.joinpath(["nul\0"]).is_err());
        assert_eq!(base.joinpath(Vec::<String>::new()).unwrap(), base);
    }

    #[test]
    fn with_name_errors() {
        let path = p("s3://bucket/a.txt");
        assert_eq!(path.with_name("b.csv").unwrap().path(), "bucket/b.csv");
        assert_eq!(path.with_stem("c").unwrap().path(), "bucket/c.txt");
        assert!(path.with_name("").is_err());
        assert!(path.with_name("x/y").is_err());
        assert!(path.with_suffix(".").is_err());
        assert!(p("s3://bucket").with_name("x").is_err());
    }

    #[test]
    fn with_suffix_round_trip() {
        let path = p("/data/report.csv");
        let json = path.with_suffix(".json").unwrap();
        assert_eq!(json.suffix(), ".json");
        assert_eq!(json.with_suffix(".csv").unwrap(), path);
        assert_eq!(path.with_suffix("").unwrap().suffix(), "");
    }

    #[test]
    fn relative_to_inverts_join() {
        let base = p("s3://bucket/dir");
        let child = &base / "sub";
        let rel = child.relative_to(&base).unwrap();
        assert_eq!(rel, "sub");
        assert_eq!(base.join(&rel), child);
        assert_eq!(base.relative_to(&base).unwrap(), ".");

        let deep = p("s3://bucket/dir/a/b.txt");
        assert_eq!(deep.relative_to(&base).unwrap(), "a/b.txt");
        assert!(deep.is_relative_to(&base));
    }

    #[test]
    fn relative_to_errors() {
        let base = p("s3://bucket/dir");
        assert!(matches!(p("gs://bucket/dir/x").relative_to(&base), Err(PathError::RelativePath { .. })));
        assert!(p("s3://bucket/dirty").relative_to(&base).is_err());
        assert!(!p("s3://other/dir").is_relative_to(&base));
    }

    #[test]
    fn matches_patterns() {
        let path = p("s3://bucket/logs/app.log");
        assert!(path.matches("*.log").unwrap());
        assert!(path.matches("app.?og").unwrap());
        assert!(!path.matches("*.txt").unwrap());
        assert!(matches!(path.matches(""), Err(PathError::InvalidPath { .. })));
    }

    #[test]
    fn remote_has_no_drive_or_root() {
        let path = p("s3://bucket/a");
        assert_eq!(path.drive(), "");
        assert_eq!(path.root(), "");
        assert_eq!(path.anchor(), "");
        assert_eq!(path.parts(), vec!["bucket", "a"]);
    }

    #[test]
    fn as_uri() {
        assert_eq!(p("s3://bucket/a b").as_uri().unwrap(), "s3://bucket/a b");
        assert!(p("relative/x").as_uri().is_err());
        if cfg!(unix) {
            assert_eq!(p("/tmp/a b.txt").as_uri().unwrap(), "file:///tmp/a%20b.txt");
        }
    }
}
