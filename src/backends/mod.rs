//! Built-in backends.
//!
//! | Backend | Protocol | Storage |
//! |---------|----------|---------|
//! | [`LocalBackend`] | `file` | the host filesystem through `std::fs` |
//! | [`MemoryBackend`] | `memory` | a process-local object store |
//!
//! Every [`Resolver`](crate::Resolver) registers both. Anything else (S3,
//! GCS, Azure...) plugs in through a [`BackendFactory`](crate::BackendFactory).

mod local;
mod memory;

pub use local::LocalBackend;
pub use memory::MemoryBackend;

/// Location of `name` inside `parent`, using `sep`.
pub(crate) fn child_location(parent: &str, name: &str, sep: char) -> String {
    if parent.is_empty() || parent == "." {
        name.to_owned()
    } else if parent.ends_with(sep) {
        format!("{parent}{name}")
    } else {
        format!("{parent}{sep}{name}")
    }
}
