//! Address parsing: wrapper chain, protocol and location.
//!
//! An address has the shape `[wrapper::]*[scheme://]location`. Wrappers are
//! kept verbatim, outermost first. The scheme of the final segment names the
//! backend; without one the address is a local path.

use crate::PathError;
use crate::pure::Flavor;

/// Protocol of local-filesystem paths.
pub const LOCAL_PROTOCOL: &str = "file";

/// Separator between chained protocol segments.
pub const CHAIN_DELIMITER: &str = "::";

/// Marker between a scheme and its location.
pub const SCHEME_MARKER: &str = "://";

/// Decomposition of a raw address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAddress {
    /// Wrapper segments, outermost first, exactly as written.
    pub wrappers: Vec<String>,
    /// Canonical lowercase backend protocol.
    pub protocol: String,
    /// Normalized backend location.
    pub location: String,
}

impl ParsedAddress {
    /// Returns `true` for local-filesystem addresses.
    pub fn is_local(&self) -> bool {
        self.protocol == LOCAL_PROTOCOL
    }
}

/// Parse a raw address.
///
/// ```rust
/// use anypath::protocol::parse_address;
///
/// let parsed = parse_address("simplecache::s3://bucket/key.txt").unwrap();
/// assert_eq!(parsed.wrappers, vec!["simplecache"]);
/// assert_eq!(parsed.protocol, "s3");
/// assert_eq!(parsed.location, "bucket/key.txt");
///
/// let local = parse_address("/tmp/./data//a.csv").unwrap();
/// assert!(local.is_local());
/// assert_eq!(local.location, "/tmp/data/a.csv");
/// ```
///
/// # Errors
///
/// [`PathError::InvalidPath`] when the chain contains an empty segment.
pub fn parse_address(raw: &str) -> Result<ParsedAddress, PathError> {
    let mut segments: Vec<&str> = raw.split(CHAIN_DELIMITER).collect();
    let target = segments.pop().unwrap_or_default();

    if segments.iter().any(|segment| segment.is_empty()) || (!segments.is_empty() && target.is_empty()) {
        return Err(PathError::InvalidPath {
            path: raw.to_owned(),
            reason: "empty segment in protocol chain".to_owned(),
        });
    }

    let (protocol, location) = match split_scheme(target) {
        Some((scheme, rest)) => (scheme, rest),
        None => (LOCAL_PROTOCOL.to_owned(), target),
    };

    let location = Flavor::for_protocol(&protocol).normalize(location);
    Ok(ParsedAddress {
        wrappers: segments.into_iter().map(ToOwned::to_owned).collect(),
        protocol,
        location,
    })
}

/// Protocol names of a wrapper chain followed by the backend protocol.
///
/// Wrappers written as `name://...` contribute `name`; bare wrappers
/// contribute themselves.
pub fn protocol_chain(wrappers: &[String], protocol: &str) -> Vec<String> {
    wrappers
        .iter()
        .map(|wrapper| match split_scheme(wrapper) {
            Some((scheme, _)) => scheme,
            None => wrapper.to_ascii_lowercase(),
        })
        .chain(std::iter::once(protocol.to_owned()))
        .collect()
}

/// Split `scheme://rest`; the scheme is lowercased.
///
/// A scheme is an ASCII letter followed by letters, digits, `+`, `-` or `.`.
/// Anything else before `://` is not a scheme and the whole string is a
/// plain path.
pub(crate) fn split_scheme(text: &str) -> Option<(String, &str)> {
    let (scheme, rest) = text.split_once(SCHEME_MARKER)?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| (scheme.to_ascii_lowercase(), rest))
}
