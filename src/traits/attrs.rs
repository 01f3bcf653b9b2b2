//! Attribute operations for data providers.

use crate::{AttrsMut, AttrsRef, VfsError, VfsPath};

/// Type-erased attribute exchange.
///
/// Implementations negotiate the shape with
/// [`AttrsMut::negotiate`] / [`AttrsRef::negotiate`] before touching the
/// backend, so an unrecognized shape always fails with
/// [`VfsError::UnsupportedAttributes`], never a generic error.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn ProviderAttrs`.
pub trait ProviderAttrs: Send + Sync {
    /// Populate `dest` with the attributes of `path`.
    ///
    /// # Errors
    ///
    /// - [`VfsError::UnsupportedAttributes`] if the shape of `dest` is not recognized
    /// - [`VfsError::NotFound`] if the path does not exist
    fn read_attrs(&self, path: &VfsPath, dest: AttrsMut<'_>) -> Result<(), VfsError>;

    /// Apply the attributes in `src` to `path`.
    ///
    /// # Errors
    ///
    /// - [`VfsError::UnsupportedAttributes`] if the shape of `src` is not recognized
    /// - [`VfsError::UnsupportedOperation`] if the shape is recognized but cannot be applied
    /// - [`VfsError::NotFound`] if the path does not exist
    fn write_attrs(&self, path: &VfsPath, src: AttrsRef<'_>) -> Result<(), VfsError>;
}
