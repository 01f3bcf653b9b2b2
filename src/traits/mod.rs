//! # Provider Traits
//!
//! The operation set every storage backend implements.
//!
//! ## Components
//!
//! | Trait | Operations |
//! |-------|------------|
//! | [`ProviderRead`] | `read` |
//! | [`ProviderWrite`] | `write`, `delete`, `rename` |
//! | [`ProviderDir`] | `read_dir`, `mkdirs`, `exists` |
//! | [`ProviderAttrs`] | `read_attrs`, `write_attrs` |
//! | [`ProviderSession`] | `close` |
//!
//! [`DataProvider`] combines all of them and has a blanket implementation.
//! None of the component traits has a panicking default, so a backend that
//! compiles implements the whole contract; whether it honors it is what the
//! [`cts`](crate::cts) certifies.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync` and take `&self`. The contract adds no
//! locking of its own: backends decide whether concurrent callers run in
//! parallel or are serialized, and document it.
//!
//! ## Object Safety
//!
//! All traits are object-safe:
//!
//! ```rust
//! use vfs_contract::{DataProvider, ProviderExt, VfsPath};
//!
//! fn size_of(provider: &dyn DataProvider) -> u64 {
//!     provider.stat(&VfsPath::new("/file.txt")).map(|i| i.size).unwrap_or(0)
//! }
//! ```

mod attrs;
mod dir;
mod read;
mod session;
mod write;

pub use attrs::ProviderAttrs;
pub use dir::ProviderDir;
pub use read::ProviderRead;
pub use session::ProviderSession;
pub use write::{ProviderWrite, WriteStream};

/// A complete storage backend.
///
/// Automatically implemented for any type implementing all component traits.
///
/// # Example
///
/// ```rust
/// use vfs_contract::{DataProvider, ProviderExt, VfsError, VfsPath};
///
/// fn backup<P: DataProvider + ?Sized>(dp: &P, src: &VfsPath, dst: &VfsPath) -> Result<(), VfsError> {
///     let data = dp.read_all(src)?;
///     dp.mkdirs(&dst.parent())?;
///     dp.write_all(dst, &data)?;
///     Ok(())
/// }
/// ```
pub trait DataProvider:
    ProviderRead + ProviderWrite + ProviderDir + ProviderAttrs + ProviderSession
{
}

// Blanket implementation - any type implementing every component gets DataProvider for free
impl<T> DataProvider for T where
    T: ProviderRead + ProviderWrite + ProviderDir + ProviderAttrs + ProviderSession
{
}
