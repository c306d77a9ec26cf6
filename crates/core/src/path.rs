//! Path normalisation and case-insensitive cache keys
//!
//! Every structure that is indexed by file path (the status cache, the root
//! registry, the watcher set) goes through [`PathKey`] so that two spellings
//! of the same location collapse onto one entry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Lexically normalise a path: drop `.` components and fold `..` into the
/// preceding component. The filesystem is never consulted, so paths of
/// deleted files normalise the same way as existing ones.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let last_is_normal = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                );
                let popped = last_is_normal && normalized.pop();
                if !popped && !normalized.has_root() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Whether the caller spelled the path with a trailing separator, which
/// marks it as a directory rather than a file.
pub fn has_trailing_separator(path: &Path) -> bool {
    let raw = path.as_os_str().to_string_lossy();
    raw.len() > 1 && (raw.ends_with('/') || raw.ends_with('\\'))
}

/// Case-insensitive key for a normalised path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathKey(String);

impl PathKey {
    /// Build the key for a path.
    ///
    /// Bytes that are not valid UTF-8 are kept as `%XX` escapes (and a
    /// literal `%` as `%25`), so distinct non-UTF-8 paths keep distinct keys.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let normalized = normalize_path(path.as_ref());
        let bytes = normalized.as_os_str().as_encoded_bytes();
        let mut key = String::with_capacity(bytes.len());
        for chunk in bytes.utf8_chunks() {
            let text = chunk.valid().replace('%', "%25").replace('\\', "/");
            key.push_str(&text.to_lowercase());
            for byte in chunk.invalid() {
                key.push_str(&format!("%{byte:02X}"));
            }
        }
        while key.len() > 1 && key.ends_with('/') {
            key.pop();
        }
        Self(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of bytes in the key; used to order roots parent-first
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `self` equals `root` or lies beneath it
    pub fn is_under(&self, root: &PathKey) -> bool {
        if self.0 == root.0 {
            return true;
        }
        if root.0.ends_with('/') {
            return self.0.starts_with(&root.0);
        }
        self.0.len() > root.0.len()
            && self.0.starts_with(&root.0)
            && self.0.as_bytes()[root.0.len()] == b'/'
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
