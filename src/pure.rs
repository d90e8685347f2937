//! Pure path-string algebra.
//!
//! Everything in this module works on backend locations (protocol already
//! stripped) and never touches a filesystem. Each operation is parameterized
//! by a [`Flavor`], which decides how a location splits into an anchor and
//! segments:
//!
//! | Flavor              | Example                 | Anchor        | Segments      |
//! |---------------------|-------------------------|---------------|---------------|
//! | [`Flavor::Posix`]   | `/tmp/a.txt`            | `/`           | `tmp`, `a.txt`|
//! | [`Flavor::Windows`] | `C:\Users\a.txt`        | `C:\`         | `Users`, `a.txt` |
//! | [`Flavor::Remote`]  | `bucket/dir/a.txt`      | `bucket`      | `dir`, `a.txt`|
//!
//! Locations produced by this module are always normalized, so structural
//! results can be compared as strings.

use crate::protocol::LOCAL_PROTOCOL;

/// Path syntax family used for lexical operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flavor {
    /// POSIX local paths: `/` separator, case-sensitive.
    Posix,
    /// Windows local paths: drive letters and UNC shares, `\` separator,
    /// case-insensitive comparisons.
    Windows,
    /// Remote and object-store locations: `/` separator, and the first
    /// segment of an unrooted location is the bucket.
    Remote,
}

/// Parsed location: anchor (`drive` + `root`) plus the segments after it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ParsedPath {
    /// Drive letter, UNC share, or remote bucket. Uses `/` internally.
    pub(crate) drive: String,
    /// Root marker (`/`, or `//` for POSIX double-slash paths).
    pub(crate) root: String,
    /// Components after the anchor.
    pub(crate) segments: Vec<String>,
}

impl ParsedPath {
    fn has_anchor(&self) -> bool {
        !self.drive.is_empty() || !self.root.is_empty()
    }
}

impl Flavor {
    /// Flavor of the host operating system.
    pub fn native() -> Self {
        if cfg!(windows) {
            Flavor::Windows
        } else {
            Flavor::Posix
        }
    }

    /// Flavor used for locations of `protocol`.
    pub fn for_protocol(protocol: &str) -> Self {
        if protocol == LOCAL_PROTOCOL {
            Self::native()
        } else {
            Flavor::Remote
        }
    }

    /// Separator used when rendering locations.
    pub const fn sep(self) -> char {
        match self {
            Flavor::Windows => '\\',
            Flavor::Posix | Flavor::Remote => '/',
        }
    }

    /// Whether segment comparisons ignore ASCII case.
    pub const fn is_case_insensitive(self) -> bool {
        matches!(self, Flavor::Windows)
    }

    /// Normalize a raw location.
    ///
    /// Local flavors follow `normpath`: redundant separators and `.` vanish,
    /// `..` is folded lexically, and an empty path becomes `.`. The remote
    /// flavor additionally strips trailing separators and never folds `..`
    /// above the bucket or root.
    pub fn normalize(self, raw: &str) -> String {
        match self {
            Flavor::Posix => normalize_posix(raw),
            Flavor::Windows => normalize_windows(raw),
            Flavor::Remote => normalize_remote(raw),
        }
    }

    pub(crate) fn parse(self, location: &str) -> ParsedPath {
        match self {
            Flavor::Posix => parse_posix(location),
            Flavor::Windows => parse_windows(&location.replace('\\', "/")),
            Flavor::Remote => parse_remote(location),
        }
    }

    pub(crate) fn build(self, parsed: &ParsedPath) -> String {
        match self {
            Flavor::Posix => {
                let mut out = parsed.root.clone();
                out.push_str(&parsed.segments.join("/"));
                if out.is_empty() { ".".to_owned() } else { out }
            }
            Flavor::Windows => {
                let mut out = parsed.drive.replace('/', "\\");
                if !parsed.root.is_empty() {
                    out.push('\\');
                }
                out.push_str(&parsed.segments.join("\\"));
                if out.is_empty() { ".".to_owned() } else { out }
            }
            Flavor::Remote => {
                let joined = parsed.segments.join("/");
                if !parsed.root.is_empty() {
                    format!("/{joined}")
                } else if parsed.segments.is_empty() {
                    parsed.drive.clone()
                } else if parsed.drive.is_empty() {
                    joined
                } else {
                    format!("{}/{joined}", parsed.drive)
                }
            }
        }
    }

    /// Whether `location` is absolute.
    ///
    /// Windows requires both a drive and a root. Remote locations are always
    /// absolute: they are addressed from the bucket or the store root.
    pub fn is_absolute(self, location: &str) -> bool {
        let parsed = self.parse(location);
        match self {
            Flavor::Posix => !parsed.root.is_empty(),
            Flavor::Windows => !parsed.drive.is_empty() && !parsed.root.is_empty(),
            Flavor::Remote => true,
        }
    }

    /// Drive component (local flavors only).
    pub fn drive(self, location: &str) -> String {
        match self {
            Flavor::Windows => self.parse(location).drive.replace('/', "\\"),
            Flavor::Posix | Flavor::Remote => String::new(),
        }
    }

    /// Root component (local flavors only).
    pub fn root(self, location: &str) -> String {
        match self {
            Flavor::Posix => self.parse(location).root,
            Flavor::Windows if !self.parse(location).root.is_empty() => "\\".to_owned(),
            Flavor::Windows | Flavor::Remote => String::new(),
        }
    }

    /// Drive plus root (local flavors only).
    pub fn anchor(self, location: &str) -> String {
        let mut out = self.drive(location);
        out.push_str(&self.root(location));
        out
    }

    /// Segments of `location`, prefixed by the anchor when there is one.
    pub fn parts(self, location: &str) -> Vec<String> {
        let parsed = self.parse(location);
        let mut out = Vec::with_capacity(parsed.segments.len() + 1);
        match self {
            Flavor::Posix if !parsed.root.is_empty() => out.push(parsed.root.clone()),
            Flavor::Windows if parsed.has_anchor() => out.push(self.anchor(location)),
            Flavor::Remote if !parsed.root.is_empty() => out.push("/".to_owned()),
            Flavor::Remote if !parsed.drive.is_empty() => out.push(parsed.drive.clone()),
            _ => {}
        }
        out.extend(parsed.segments);
        out
    }

    /// Final segment, or an empty string for anchors and `.`.
    pub fn name(self, location: &str) -> String {
        self.parse(location).segments.pop().unwrap_or_default()
    }

    /// Location with the final segment removed.
    ///
    /// Anchors (`/`, `C:\`, a bare bucket) and `.` are their own parent.
    pub fn parent(self, location: &str) -> String {
        let mut parsed = self.parse(location);
        if parsed.segments.pop().is_none() {
            return location.to_owned();
        }
        self.build(&parsed)
    }

    /// Join `segment` onto `base`.
    ///
    /// An absolute segment overrides the base. For unrooted remote locations
    /// that means the bucket is replaced too.
    pub fn join(self, base: &str, segment: &str) -> String {
        match self {
            Flavor::Posix => {
                if segment.starts_with('/') || base.is_empty() || base == "." {
                    normalize_posix(segment)
                } else {
                    normalize_posix(&format!("{base}/{segment}"))
                }
            }
            Flavor::Windows => join_windows(base, segment),
            Flavor::Remote => {
                if let Some(stripped) = segment.strip_prefix('/') {
                    if base.starts_with('/') {
                        normalize_remote(segment)
                    } else {
                        normalize_remote(stripped)
                    }
                } else if base.is_empty() {
                    normalize_remote(segment)
                } else {
                    normalize_remote(&format!("{base}/{segment}"))
                }
            }
        }
    }

    /// Replace the final segment.
    ///
    /// # Errors
    ///
    /// Returns the reason when `name` is empty, `.`, or contains a separator,
    /// or when `location` has no name to replace.
    pub fn with_name(self, location: &str, name: &str) -> Result<String, String> {
        if name.is_empty() || name == "." || self.contains_sep(name) {
            return Err(format!("invalid name {name:?}"));
        }
        let mut parsed = self.parse(location);
        if parsed.segments.pop().is_none() {
            return Err("path has an empty name".to_owned());
        }
        parsed.segments.push(name.to_owned());
        Ok(self.build(&parsed))
    }

    /// Replace the stem, keeping the final suffix.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Flavor::with_name`], plus an empty stem.
    pub fn with_stem(self, location: &str, new_stem: &str) -> Result<String, String> {
        if new_stem.is_empty() {
            return Err("invalid stem \"\"".to_owned());
        }
        let name = self.name(location);
        if name.is_empty() {
            return Err("path has an empty name".to_owned());
        }
        self.with_name(location, &format!("{new_stem}{}", suffix(&name)))
    }

    /// Replace the final suffix; an empty `new_suffix` removes it.
    ///
    /// # Errors
    ///
    /// Returns the reason when the suffix does not start with `.`, is exactly
    /// `.`, contains a separator, or when `location` has no name.
    pub fn with_suffix(self, location: &str, new_suffix: &str) -> Result<String, String> {
        if !new_suffix.is_empty()
            && (!new_suffix.starts_with('.') || new_suffix == "." || self.contains_sep(new_suffix))
        {
            return Err(format!("invalid suffix {new_suffix:?}"));
        }
        let name = self.name(location);
        if name.is_empty() {
            return Err("path has an empty name".to_owned());
        }
        self.with_name(location, &format!("{}{new_suffix}", stem(&name)))
    }

    /// Compute `location` relative to `other`.
    ///
    /// Returns `None` unless the anchors agree and `other`'s segments are a
    /// literal prefix. Equal locations give `.`.
    pub fn relative_to(self, location: &str, other: &str) -> Option<String> {
        let this = self.parse(location);
        let base = self.parse(other);
        let ci = self.is_case_insensitive();

        if !anchors_compatible(&this, &base, ci) || base.segments.len() > this.segments.len() {
            return None;
        }
        if !this
            .segments
            .iter()
            .zip(&base.segments)
            .all(|(left, right)| compare_component(left, right, ci))
        {
            return None;
        }

        let remaining = &this.segments[base.segments.len()..];
        if remaining.is_empty() {
            Some(".".to_owned())
        } else {
            Some(remaining.join(&self.sep().to_string()))
        }
    }

    /// Glob-match `location` against `pattern`.
    ///
    /// Anchored patterns must match the whole location; relative patterns
    /// match from the right. `*` and `?` stay inside one segment, `[...]`
    /// matches a character class and `**` spans any number of segments.
    /// Remote locations match as if rooted at the bucket, so
    /// `/bucket/*.txt` is an anchored remote pattern.
    pub fn matches(self, location: &str, pattern: &str) -> bool {
        let ci = self.is_case_insensitive();
        let (path_parts, pattern_parts, anchored) = match self {
            Flavor::Remote => {
                let parsed = parse_remote(location);
                let mut parts = Vec::with_capacity(parsed.segments.len() + 1);
                if !parsed.drive.is_empty() {
                    parts.push(parsed.drive);
                }
                parts.extend(parsed.segments);
                let pattern_parts = split_segments(pattern);
                (parts, pattern_parts, pattern.starts_with('/'))
            }
            Flavor::Posix | Flavor::Windows => {
                let this = self.parse(location);
                let pat = self.parse(&self.normalize(pattern));
                if pat.has_anchor() && !anchors_compatible(&this, &pat, ci) {
                    return false;
                }
                let anchored = pat.has_anchor();
                (this.segments, pat.segments, anchored)
            }
        };

        if pattern_parts.is_empty() {
            return anchored && path_parts.is_empty();
        }
        if anchored {
            return glob_match_parts(&path_parts, &pattern_parts, ci);
        }
        (0..=path_parts.len()).any(|start| glob_match_parts(&path_parts[start..], &pattern_parts, ci))
    }

    fn contains_sep(self, text: &str) -> bool {
        text.contains('/') || (self == Flavor::Windows && text.contains('\\'))
    }
}

/// Final suffix of a file name, including the dot.
///
/// Names that start or end with the only dot have no suffix.
pub fn suffix(name: &str) -> &str {
    match name.rfind('.') {
        Some(i) if i > 0 && i + 1 < name.len() => &name[i..],
        _ => "",
    }
}

/// Every suffix of a file name, in order.
///
/// ```rust
/// use anypath::pure::suffixes;
///
/// assert_eq!(suffixes("a.tar.gz"), vec![".tar", ".gz"]);
/// assert!(suffixes(".bashrc").is_empty());
/// assert!(suffixes("trailing.").is_empty());
/// ```
pub fn suffixes(name: &str) -> Vec<String> {
    if name.ends_with('.') {
        return Vec::new();
    }
    name.trim_start_matches('.')
        .split('.')
        .skip(1)
        .map(|part| format!(".{part}"))
        .collect()
}

/// File name without its final suffix.
pub fn stem(name: &str) -> &str {
    &name[..name.len() - suffix(name).len()]
}

/// Whether `text` contains glob metacharacters.
pub fn has_magic(text: &str) -> bool {
    text.contains(['*', '?', '['])
}

/// Whether `name` is a reserved Windows device name (`CON`, `NUL`, `COM1`...).
///
/// Extensions do not help: `con.txt` is reserved too.
pub fn is_reserved_windows(name: &str) -> bool {
    let upper = name.trim_end_matches([' ', '.']).to_ascii_uppercase();
    let base = upper.split('.').next().unwrap_or_default().trim_end();
    if matches!(base, "CON" | "PRN" | "AUX" | "NUL" | "CONIN$" | "CONOUT$") {
        return true;
    }
    let bytes = base.as_bytes();
    bytes.len() == 4
        && (base.starts_with("COM") || base.starts_with("LPT"))
        && bytes[3].is_ascii_digit()
        && bytes[3] != b'0'
}

/// Match one segment against a wildcard pattern.
pub fn wildcard_match(text: &str, pattern: &str, case_insensitive: bool) -> bool {
    let fold = |c: char| {
        if case_insensitive {
            c.to_ascii_lowercase()
        } else {
            c
        }
    };
    let text: Vec<char> = text.chars().map(fold).collect();
    let tokens = tokenize(&pattern.chars().map(fold).collect::<Vec<_>>());

    let mut dp = vec![vec![false; tokens.len() + 1]; text.len() + 1];
    dp[0][0] = true;
    for (j, token) in tokens.iter().enumerate() {
        if matches!(token, Token::Star) {
            dp[0][j + 1] = dp[0][j];
        }
    }
    for i in 1..=text.len() {
        for (j, token) in tokens.iter().enumerate() {
            dp[i][j + 1] = match token {
                Token::Star => dp[i][j] || dp[i - 1][j + 1],
                Token::Any => dp[i - 1][j],
                Token::Literal(c) => dp[i - 1][j] && text[i - 1] == *c,
                Token::Class { negated, ranges } => {
                    let c = text[i - 1];
                    let hit = ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi);
                    dp[i - 1][j] && hit != *negated
                }
            };
        }
    }
    dp[text.len()][tokens.len()]
}

enum Token {
    Star,
    Any,
    Literal(char),
    Class { negated: bool, ranges: Vec<(char, char)> },
}

fn tokenize(pattern: &[char]) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(pattern.len());
    let mut i = 0;
    while i < pattern.len() {
        match pattern[i] {
            '*' => tokens.push(Token::Star),
            '?' => tokens.push(Token::Any),
            '[' => {
                if let Some((token, next)) = parse_class(pattern, i + 1) {
                    tokens.push(token);
                    i = next;
                    continue;
                }
                tokens.push(Token::Literal('['));
            }
            c => tokens.push(Token::Literal(c)),
        }
        i += 1;
    }
    tokens
}

/// Parse a `[...]` class starting after the `[`; returns the token and the
/// index after the closing `]`. An unterminated class is not a class.
fn parse_class(pattern: &[char], start: usize) -> Option<(Token, usize)> {
    let mut i = start;
    let negated = matches!(pattern.get(i), Some('!' | '^'));
    if negated {
        i += 1;
    }
    let first = i;
    let mut ranges = Vec::new();
    while i < pattern.len() {
        let c = pattern[i];
        if c == ']' && i > first {
            return Some((Token::Class { negated, ranges }, i + 1));
        }
        if pattern.get(i + 1) == Some(&'-') && pattern.get(i + 2).is_some_and(|&end| end != ']') {
            ranges.push((c, pattern[i + 2]));
            i += 3;
        } else {
            ranges.push((c, c));
            i += 1;
        }
    }
    None
}

/// Whole-location glob match for backend listings split on `sep`.
pub(crate) fn glob_full_match(location: &str, pattern: &str, sep: char, case_insensitive: bool) -> bool {
    let split = |text: &str| -> Vec<String> {
        text.split(sep)
            .filter(|part| !part.is_empty() && *part != ".")
            .map(ToOwned::to_owned)
            .collect()
    };
    location.starts_with(sep) == pattern.starts_with(sep)
        && glob_match_parts(&split(location), &split(pattern), case_insensitive)
}

fn normalize_posix(raw: &str) -> String {
    if raw.is_empty() {
        return ".".to_owned();
    }
    let root = posix_root(raw);
    let segments = fold_dots(raw[root.len()..].split('/'), !root.is_empty());
    let mut out = root.to_owned();
    out.push_str(&segments.join("/"));
    if out.is_empty() { ".".to_owned() } else { out }
}

fn posix_root(path: &str) -> &'static str {
    if path.starts_with("//") && !path.starts_with("///") {
        "//"
    } else if path.starts_with('/') {
        "/"
    } else {
        ""
    }
}

fn parse_posix(path: &str) -> ParsedPath {
    let root = posix_root(path);
    ParsedPath {
        drive: String::new(),
        root: root.to_owned(),
        segments: split_segments(&path[root.len()..]),
    }
}

fn normalize_windows(raw: &str) -> String {
    let mut parsed = parse_windows(&raw.replace('\\', "/"));
    let rooted = !parsed.root.is_empty();
    parsed.segments = fold_dots(parsed.segments.iter().map(String::as_str), rooted);
    Flavor::Windows.build(&parsed)
}

/// Parse a Windows path that already uses `/` separators.
fn parse_windows(path: &str) -> ParsedPath {
    if let Some((drive, rest)) = parse_unc_prefix(path) {
        return ParsedPath {
            drive: drive.to_owned(),
            root: "/".to_owned(),
            segments: split_segments(rest),
        };
    }

    let (drive, rest) = parse_drive_prefix(path).unwrap_or(("", path));
    let (root, tail) = match rest.strip_prefix('/') {
        Some(stripped) => ("/", stripped),
        None => ("", rest),
    };
    ParsedPath {
        drive: drive.to_owned(),
        root: root.to_owned(),
        segments: split_segments(tail),
    }
}

/// Split a UNC prefix (`//server/share`) from the rest of the path.
fn parse_unc_prefix(path: &str) -> Option<(&str, &str)> {
    let rest = path.strip_prefix("//")?;
    let server_end = rest.find('/')?;
    if server_end == 0 {
        return None;
    }
    let after_server = &rest[server_end + 1..];
    let share_end = after_server.find('/').unwrap_or(after_server.len());
    if share_end == 0 {
        return None;
    }
    let drive_end = 2 + server_end + 1 + share_end;
    let remaining = &path[drive_end..];
    Some((&path[..drive_end], remaining.strip_prefix('/').unwrap_or(remaining)))
}

/// Split a drive letter (`C:`) from the rest of the path.
fn parse_drive_prefix(path: &str) -> Option<(&str, &str)> {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        Some((&path[..2], &path[2..]))
    } else {
        None
    }
}

fn join_windows(base: &str, segment: &str) -> String {
    let base = base.replace('\\', "/");
    let other = segment.replace('\\', "/");
    let other_parsed = parse_windows(&other);

    if !other_parsed.drive.is_empty() {
        return normalize_windows(&other);
    }
    if !other_parsed.root.is_empty() {
        let base_parsed = parse_windows(&base);
        return normalize_windows(&format!("{}{other}", base_parsed.drive));
    }
    if base.is_empty() || base == "." {
        return normalize_windows(&other);
    }
    if base.ends_with('/') || base.ends_with(':') {
        normalize_windows(&format!("{base}{other}"))
    } else {
        normalize_windows(&format!("{base}/{other}"))
    }
}

fn normalize_remote(raw: &str) -> String {
    let rooted = raw.starts_with('/');
    // The bucket of an unrooted location is never folded away.
    let floor = usize::from(!rooted);
    let mut segments: Vec<&str> = Vec::new();
    for part in raw.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if segments.len() > floor {
                    segments.pop();
                }
            }
            _ => segments.push(part),
        }
    }
    let joined = segments.join("/");
    if rooted { format!("/{joined}") } else { joined }
}

fn parse_remote(location: &str) -> ParsedPath {
    if let Some(rest) = location.strip_prefix('/') {
        return ParsedPath {
            drive: String::new(),
            root: "/".to_owned(),
            segments: split_segments(rest),
        };
    }
    let mut segments = split_segments(location);
    let drive = if segments.is_empty() {
        String::new()
    } else {
        segments.remove(0)
    };
    ParsedPath {
        drive,
        root: String::new(),
        segments,
    }
}

/// Fold `..` lexically. Rooted paths drop `..` at the root; relative paths
/// keep leading `..` segments.
fn fold_dots<'a>(parts: impl Iterator<Item = &'a str>, rooted: bool) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for part in parts {
        match part {
            "" | "." => {}
            ".." => {
                if out.last().is_some_and(|last| last != "..") {
                    out.pop();
                } else if !rooted {
                    out.push("..".to_owned());
                }
            }
            _ => out.push(part.to_owned()),
        }
    }
    out
}

fn split_segments(rest: &str) -> Vec<String> {
    rest.split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .map(ToOwned::to_owned)
        .collect()
}

fn anchors_compatible(path: &ParsedPath, other: &ParsedPath, case_insensitive: bool) -> bool {
    compare_component(&path.drive, &other.drive, case_insensitive) && path.root == other.root
}

fn compare_component(left: &str, right: &str, case_insensitive: bool) -> bool {
    if case_insensitive {
        left.eq_ignore_ascii_case(right)
    } else {
        left == right
    }
}

fn glob_match_parts(path_parts: &[String], pattern_parts: &[String], case_insensitive: bool) -> bool {
    let mut memo = vec![vec![None; pattern_parts.len() + 1]; path_parts.len() + 1];
    glob_match_inner(0, 0, path_parts, pattern_parts, case_insensitive, &mut memo)
}

fn glob_match_inner(
    path_idx: usize,
    pattern_idx: usize,
    path_parts: &[String],
    pattern_parts: &[String],
    case_insensitive: bool,
    memo: &mut [Vec<Option<bool>>],
) -> bool {
    if let Some(cached) = memo[path_idx][pattern_idx] {
        return cached;
    }

    let result = if pattern_idx == pattern_parts.len() {
        path_idx == path_parts.len()
    } else if pattern_parts[pattern_idx] == "**" {
        glob_match_inner(path_idx, pattern_idx + 1, path_parts, pattern_parts, case_insensitive, memo)
            || (path_idx < path_parts.len()
                && glob_match_inner(path_idx + 1, pattern_idx, path_parts, pattern_parts, case_insensitive, memo))
    } else {
        path_idx < path_parts.len()
            && wildcard_match(&path_parts[path_idx], &pattern_parts[pattern_idx], case_insensitive)
            && glob_match_inner(path_idx + 1, pattern_idx + 1, path_parts, pattern_parts, case_insensitive, memo)
    };

    memo[path_idx][pattern_idx] = Some(result);
    result
}
