//! # Extension Traits
//!
//! Convenience calls layered on the contract.
//!
//! ## Overview
//!
//! [`ProviderExt`] bundles the multi-step sequences callers repeat: read a
//! whole resource, write a whole buffer and commit it, decode a listing into
//! [`ResourceInfo`]s. Every method is a default method with a blanket
//! implementation, so any [`DataProvider`] (including `dyn DataProvider`)
//! gets them for free.
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`read_all`](ProviderExt::read_all) | Read a resource into memory |
//! | [`write_all`](ProviderExt::write_all) | Write and commit a buffer |
//! | [`stat`](ProviderExt::stat) | Read [`ResourceInfo`] for a path |
//! | [`read_dir_infos`](ProviderExt::read_dir_infos) | Decode one directory level |
//! | [`read_dir_recursive`](ProviderExt::read_dir_recursive) | Decode a whole subtree |

use std::io::{Read, Write};

use crate::{AttrsMut, DataProvider, ReadDirOptions, ResourceInfo, VfsError, VfsPath};

/// A resource found by [`ProviderExt::read_dir_recursive`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resource {
    /// Full path of the resource.
    pub path: VfsPath,
    /// Its attributes at listing time.
    pub info: ResourceInfo,
}

/// Extension methods for any data provider.
///
/// # Example
///
/// ```rust
/// use vfs_contract::{DataProvider, ProviderExt, VfsError, VfsPath};
///
/// fn copy<P: DataProvider + ?Sized>(dp: &P, from: &VfsPath, to: &VfsPath) -> Result<u64, VfsError> {
///     let data = dp.read_all(from)?;
///     dp.write_all(to, &data)
/// }
/// ```
pub trait ProviderExt: DataProvider {
    /// Read a resource completely.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if the path does not exist
    fn read_all(&self, path: &VfsPath) -> Result<Vec<u8>, VfsError> {
        let mut reader = self.read(path)?;
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| VfsError::io("read", path.clone(), e))?;
        Ok(data)
    }

    /// Write `data` to `path` and commit it.
    ///
    /// Returns the committed byte count as reported by the stream.
    fn write_all(&self, path: &VfsPath, data: &[u8]) -> Result<u64, VfsError> {
        let mut writer = self.write(path)?;
        writer
            .write_all(data)
            .map_err(|e| VfsError::io("write", path.clone(), e))?;
        writer.close()
    }

    /// Read the [`ResourceInfo`] of a path.
    ///
    /// # Errors
    ///
    /// - [`VfsError::NotFound`] if the path does not exist
    fn stat(&self, path: &VfsPath) -> Result<ResourceInfo, VfsError> {
        let mut info = ResourceInfo::default();
        self.read_attrs(path, AttrsMut::new(&mut info))?;
        Ok(info)
    }

    /// Returns `true` if the path exists and is a directory.
    fn is_dir(&self, path: &VfsPath) -> Result<bool, VfsError> {
        match self.stat(path) {
            Ok(info) => Ok(info.is_dir()),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// List one directory level as decoded records, closing the list on
    /// every exit path.
    fn read_dir_infos(&self, path: &VfsPath) -> Result<Vec<ResourceInfo>, VfsError> {
        let mut list = self.read_dir(path, &ReadDirOptions::default())?;
        let mut out = Vec::with_capacity(usize::try_from(list.size()).unwrap_or(0));
        let visited = list.for_each(&mut |scanner| {
            let mut info = ResourceInfo::default();
            scanner.scan(AttrsMut::new(&mut info))?;
            out.push(info);
            Ok(())
        });
        let closed = list.close();
        visited?;
        closed?;
        Ok(out)
    }

    /// List a whole subtree, depth first, parents before their children.
    fn read_dir_recursive(&self, path: &VfsPath) -> Result<Vec<Resource>, VfsError> {
        let mut out = Vec::new();
        let mut pending = vec![path.normalize()];
        while let Some(dir) = pending.pop() {
            for info in self.read_dir_infos(&dir)? {
                let child = dir.child(&info.name);
                if info.is_dir() {
                    pending.push(child.clone());
                }
                out.push(Resource { path: child, info });
            }
        }
        Ok(out)
    }
}

// Blanket implementation - any DataProvider gets ProviderExt for free
impl<P: DataProvider + ?Sized> ProviderExt for P {}
