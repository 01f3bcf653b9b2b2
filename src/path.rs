//! Hierarchical resource names.
//!
//! [`VfsPath`] is a pure value type: it never touches a backend. Backends
//! receive caller-supplied paths verbatim and must call
//! [`normalize`](VfsPath::normalize) before mapping them onto their own
//! namespace.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// What [`VfsPath::normalize_with`] does with a `..` that would climb above root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EscapePolicy {
    /// Silently drop the segment. The result never leaves root.
    #[default]
    Drop,
    /// Keep leading `..` segments in the result.
    Preserve,
}

/// A `/`-separated resource name.
///
/// The empty string and `/` both denote the root. Empty segments are dropped
/// on construction, while `.` and `..` are kept until the path is normalized.
///
/// Two paths are equal when their canonical string forms are equal.
///
/// # Example
///
/// ```rust
/// use vfs_contract::VfsPath;
///
/// let p = VfsPath::new("docs/./drafts/../report.txt");
/// assert_eq!(p.normalize().to_string(), "/docs/report.txt");
/// assert_eq!(p.normalize().name(), "report.txt");
/// assert_eq!(p.normalize().parent().to_string(), "/docs");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "String", into = "String")
)]
pub struct VfsPath {
    segments: Vec<String>,
}

impl VfsPath {
    /// Parse a path string. No normalization is performed.
    pub fn new(path: &str) -> Self {
        Self {
            segments: split(path).collect(),
        }
    }

    /// The root path.
    #[inline]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Returns `true` if this path has no segments.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Resolve `.` and `..` using [`EscapePolicy::Drop`].
    pub fn normalize(&self) -> Self {
        self.normalize_with(EscapePolicy::Drop)
    }

    /// Resolve `.` and `..` segments.
    ///
    /// Idempotent for a fixed policy.
    pub fn normalize_with(&self, policy: EscapePolicy) -> Self {
        let mut out: Vec<String> = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match segment.as_str() {
                "." => {}
                ".." => match out.last() {
                    Some(last) if last != ".." => {
                        out.pop();
                    }
                    _ if policy == EscapePolicy::Preserve => out.push("..".to_owned()),
                    _ => {}
                },
                _ => out.push(segment.clone()),
            }
        }
        Self { segments: out }
    }

    /// Append `name`. Slashes inside `name` produce several segments.
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(split(name));
        Self { segments }
    }

    /// Append every segment of `other`.
    pub fn join(&self, other: &VfsPath) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self { segments }
    }

    /// The path without its last segment. The parent of root is root.
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    /// The last segment, or `""` for root.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// All segments in order.
    pub fn names(&self) -> &[String] {
        &self.segments
    }

    /// Returns `true` if the leading segments of `self` equal `prefix`.
    pub fn starts_with(&self, prefix: &VfsPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Remove `prefix` from the front. Returns an unchanged copy when
    /// `prefix` is not a prefix of `self`.
    pub fn trim_prefix(&self, prefix: &VfsPath) -> Self {
        if self.starts_with(prefix) {
            Self {
                segments: self.segments[prefix.segments.len()..].to_vec(),
            }
        } else {
            self.clone()
        }
    }

    /// Map onto a native directory.
    ///
    /// The path is normalized before it is joined, so the result can never
    /// name anything outside `base`.
    pub fn to_fs_path(&self, base: &Path) -> PathBuf {
        let mut out = base.to_path_buf();
        for segment in self.normalize().segments {
            out.push(segment);
        }
        out
    }
}

fn split(path: &str) -> impl Iterator<Item = String> + '_ {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_owned)
}

impl fmt::Display for VfsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl From<&str> for VfsPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for VfsPath {
    fn from(path: String) -> Self {
        Self::new(&path)
    }
}

impl From<VfsPath> for String {
    fn from(path: VfsPath) -> Self {
        path.to_string()
    }
}

impl FromStr for VfsPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}
