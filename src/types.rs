//! Core value types exchanged across the provider boundary.

use std::time::{SystemTime, UNIX_EPOCH};

/// Kind of a resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResourceMode {
    /// Regular file.
    #[default]
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
}

/// Basic metadata of a resource.
///
/// Produced by backends on demand and never cached by the contract layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceInfo {
    /// Last path segment. Empty for the root.
    pub name: String,
    /// Size in bytes. Directories report whatever the backend reports, usually 0.
    pub size: u64,
    /// Last modification, milliseconds since the Unix epoch.
    pub mod_time: i64,
    /// File, directory or symlink.
    pub mode: ResourceMode,
}

impl ResourceInfo {
    /// Returns `true` if this is a regular file.
    #[inline]
    pub fn is_file(&self) -> bool {
        self.mode == ResourceMode::File
    }

    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.mode == ResourceMode::Directory
    }

    /// Returns `true` if this is a symbolic link.
    #[inline]
    pub fn is_symlink(&self) -> bool {
        self.mode == ResourceMode::Symlink
    }
}

/// Convert a timestamp to epoch milliseconds. Pre-epoch times become negative.
pub fn epoch_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
        Err(e) => -i64::try_from(e.duration().as_millis()).unwrap_or(i64::MAX),
    }
}

/// Options for [`ProviderDir::read_dir`](crate::ProviderDir::read_dir).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReadDirOptions {
    /// Visit entries ordered by name instead of backend listing order.
    pub sort_by_name: bool,
}

impl ReadDirOptions {
    /// Entries ordered by name.
    pub const SORTED: Self = Self { sort_by_name: true };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn resource_mode_predicates() {
        let info = ResourceInfo {
            mode: ResourceMode::Directory,
            ..Default::default()
        };
        assert!(info.is_dir());
        assert!(!info.is_file());
        assert!(!info.is_symlink());
        assert!(ResourceInfo::default().is_file());
    }

    #[test]
    fn epoch_millis_converts() {
        let t = UNIX_EPOCH + Duration::from_millis(1_500);
        assert_eq!(epoch_millis(t), 1_500);
        let before = UNIX_EPOCH - Duration::from_millis(20);
        assert_eq!(epoch_millis(before), -20);
    }

    #[test]
    fn types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ResourceInfo>();
        assert_send_sync::<ResourceMode>();
        assert_send_sync::<ReadDirOptions>();
    }
}
