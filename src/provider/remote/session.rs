//! The opaque capability set a remote service exposes.

use std::io::Read;
use std::time::SystemTime;

/// Kind of a remote listing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Folder,
    /// Symbolic link.
    Link,
}

/// One line of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Entry name, possibly `.` or `..`.
    pub name: String,
    /// File, folder or link.
    pub kind: EntryKind,
    /// Size in bytes as reported by the service.
    pub size: u64,
    /// Last modification as reported by the service.
    pub modified: SystemTime,
}

/// A failure reply from the remote service.
///
/// `code` follows FTP reply-code conventions (`550` for a missing file,
/// `530` for a rejected login, and so on).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code} {message}")]
pub struct RemoteError {
    /// Numeric reply code.
    pub code: u16,
    /// Human-readable reply text.
    pub message: String,
}

impl RemoteError {
    /// A reply with the given code and text.
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// A single stateful connection to a remote service.
///
/// Paths are absolute `/`-separated strings. Every method is one round-trip;
/// nothing creates parents implicitly, `rename` does not overwrite, and
/// `remove_dir` only removes empty directories.
///
/// Sessions take `&mut self`: one command is in flight at a time.
pub trait RemoteSession: Send {
    /// List a directory. The reply may include `.` and `..`.
    fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError>;

    /// Download a file completely.
    fn retrieve(&mut self, path: &str) -> Result<Vec<u8>, RemoteError>;

    /// Upload a file, replacing any existing one.
    fn store(&mut self, path: &str, data: &mut dyn Read) -> Result<(), RemoteError>;

    /// Delete a file.
    fn delete(&mut self, path: &str) -> Result<(), RemoteError>;

    /// Remove an empty directory.
    fn remove_dir(&mut self, path: &str) -> Result<(), RemoteError>;

    /// Rename a file or directory.
    fn rename(&mut self, from: &str, to: &str) -> Result<(), RemoteError>;

    /// Create one directory whose parent exists.
    fn make_dir(&mut self, path: &str) -> Result<(), RemoteError>;

    /// End the session.
    fn quit(&mut self) -> Result<(), RemoteError>;
}
