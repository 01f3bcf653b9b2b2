//! Read operations for data providers.

use std::io::Read;

use crate::{VfsError, VfsPath};

/// Read operations for a data provider.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self`; backends
/// built on a single stateful session serialize callers internally.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn ProviderRead`.
pub trait ProviderRead: Send + Sync {
    /// Open a resource for reading.
    ///
    /// The returned reader is owned by the caller and released on drop.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if the path does not exist
    /// - [`VfsError::PermissionDenied`] if read access is denied
    fn read(&self, path: &VfsPath) -> Result<Box<dyn Read + Send>, VfsError>;
}
