//! Write operations for data providers.

use std::io::Write;

use crate::{VfsError, VfsPath};

/// A streaming write handle.
///
/// Bytes written through [`Write`] are not observable to any reader until
/// [`close`](WriteStream::close) succeeds. Dropping the stream without
/// closing it discards everything written.
pub trait WriteStream: Write + Send {
    /// Commit the written bytes and release the handle.
    ///
    /// Returns the number of bytes committed.
    ///
    /// # Errors
    ///
    /// Any taxonomy failure reported by the backend while publishing.
    fn close(self: Box<Self>) -> Result<u64, VfsError>;
}

/// Write operations for a data provider.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// shared access; see each backend for its concurrency guarantees.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn ProviderWrite`.
pub trait ProviderWrite: Send + Sync {
    /// Open a resource for writing, replacing any existing content on close.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// - [`VfsError::PermissionDenied`] if write access is denied
    fn write(&self, path: &VfsPath) -> Result<Box<dyn WriteStream>, VfsError>;

    /// Remove a file, or a directory together with everything below it.
    ///
    /// Deleting a path that does not exist succeeds.
    ///
    /// # Errors
    ///
    /// Any failure other than the target not existing.
    fn delete(&self, path: &VfsPath) -> Result<(), VfsError>;

    /// Move `from` to `to`, replacing `to` if it exists.
    ///
    /// After success `from` no longer resolves and `to` holds the former
    /// content of `from`. Not guaranteed to be atomic.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if `from` does not exist
    fn rename(&self, from: &VfsPath, to: &VfsPath) -> Result<(), VfsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_write_is_object_safe() {
        fn _check(_: &dyn ProviderWrite) {}
        fn _stream(_: Box<dyn WriteStream>) {}
    }
}
