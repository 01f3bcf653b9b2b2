//! Directory operations for data providers.

use crate::{AttrsMut, DirEntList, ReadDirOptions, ResourceInfo, VfsError, VfsPath};

/// Directory operations for a data provider.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// shared access.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn ProviderDir`.
pub trait ProviderDir: Send + Sync {
    /// List a directory.
    ///
    /// The caller must [`close`](DirEntList::close) the returned list on
    /// every exit path.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if the directory does not exist
    fn read_dir(
        &self,
        path: &VfsPath,
        options: &ReadDirOptions,
    ) -> Result<Box<dyn DirEntList>, VfsError>;

    /// Create a directory and all missing ancestors.
    ///
    /// Succeeds if the directory already exists.
    fn mkdirs(&self, path: &VfsPath) -> Result<(), VfsError>;

    /// Check whether a path exists.
    ///
    /// The default implementation lists the parent and matches the leaf
    /// name, which costs one listing of the parent. Backends with a direct
    /// existence probe should override it.
    ///
    /// # Errors
    ///
    /// Only unexpected failures; a missing parent yields `Ok(false)`.
    fn exists(&self, path: &VfsPath) -> Result<bool, VfsError> {
        let path = path.normalize();
        if path.is_root() {
            return Ok(true);
        }
        let mut list = match self.read_dir(&path.parent(), &ReadDirOptions::default()) {
            Ok(list) => list,
            Err(e) if e.is_not_found() => return Ok(false),
            Err(e) => return Err(e),
        };

        let mut found = false;
        let visited = list.for_each(&mut |scanner| {
            let mut info = ResourceInfo::default();
            scanner.scan(AttrsMut::new(&mut info))?;
            found |= info.name == path.name();
            Ok(())
        });
        let closed = list.close();
        visited?;
        closed?;
        Ok(found)
    }
}
