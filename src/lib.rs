//! # vfs-contract
//!
//! A backend-agnostic **virtual filesystem contract** and the conformance
//! test suite (CTS) that certifies a backend honors it.
//!
//! A backend (local disk, a single-connection FTP session, an in-memory
//! tree) implements a handful of small traits; callers address resources
//! with [`VfsPath`] and get identical semantics whichever backend sits
//! underneath.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use vfs_contract::{DataProvider, MemoryProvider, ProviderExt, VfsError, VfsPath};
//!
//! fn archive(dp: &dyn DataProvider) -> Result<(), VfsError> {
//!     dp.write_all(&VfsPath::new("/inbox/report.txt"), b"quarterly numbers")?;
//!     dp.rename(&VfsPath::new("/inbox/report.txt"), &VfsPath::new("/archive/2024/report.txt"))?;
//!     for info in dp.read_dir_infos(&VfsPath::new("/archive/2024"))? {
//!         println!("{} ({} bytes)", info.name, info.size);
//!     }
//!     Ok(())
//! }
//!
//! archive(&MemoryProvider::new()).unwrap();
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`VfsPath`] | Normalized, `/`-separated resource name |
//! | [`ResourceInfo`] | Name, size, modification time and mode of a resource |
//! | [`AttrsMut`] / [`AttrsRef`] | Type-erased attribute destination / source |
//! | [`DirEntList`] / [`Scanner`] | Sized, single-pass, closable directory listing |
//! | [`DataProvider`] | The complete backend contract |
//! | [`VfsError`] | Shared error taxonomy |
//! | [`cts::Cts`] | The conformance test suite |
//!
//! ---
//!
//! ## Trait Layering
//!
//! ```text
//! ProviderRead + ProviderWrite + ProviderDir + ProviderAttrs + ProviderSession = DataProvider
//!                                                                                   ↓
//!                                                                              ProviderExt
//! ```
//!
//! [`DataProvider`] and [`ProviderExt`] have **blanket implementations**:
//! implement the five component traits and both come for free.
//!
//! ---
//!
//! ## Attribute Negotiation
//!
//! Attributes are exchanged through values of arbitrary type. A backend
//! recognizes a closed set of shapes (at least [`ResourceInfo`]); any other
//! shape fails with [`VfsError::UnsupportedAttributes`], which callers can
//! test for specifically:
//!
//! ```rust
//! use vfs_contract::{AttrsMut, MemoryProvider, ProviderAttrs, VfsPath};
//!
//! let dp = MemoryProvider::new();
//! let mut text = "not a metadata record";
//! let err = dp.read_attrs(&VfsPath::root(), AttrsMut::new(&mut text)).unwrap_err();
//! assert_eq!(err.unsupported_attributes(), Some("&str"));
//! ```
//!
//! ---
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync` and take `&self`. The contract itself
//! adds no locking; each backend documents its own policy.
//!
//! ---
//!
//! ## Logging
//!
//! Backends and the CTS emit [`tracing`](https://docs.rs/tracing) events:
//! `debug` for commits, listings and fallbacks, `warn` for recovery paths
//! and failed checks, `info` for passed checks. The crate never installs a
//! subscriber.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for [`VfsPath`], [`ResourceInfo`], configuration types, and [`cts::CtsReport::to_json`] |

// Private modules
mod attrs;
mod dirent;
mod error;
mod ext;
mod path;
mod traits;
mod types;

// Public modules
pub mod cts;
pub mod provider;
pub mod recovery;
pub mod staging;

// Public re-exports - values and errors
pub use error::{BoxError, VfsError};
pub use path::{EscapePolicy, VfsPath};
pub use types::{ReadDirOptions, ResourceInfo, ResourceMode, epoch_millis};

// Public re-exports - attribute protocol
pub use attrs::{AttrKind, AttrsMut, AttrsRef, AttrsSource, AttrsTarget};

// Public re-exports - directory listings
pub use dirent::{DirEntList, EntryList, InfoScanner, Scanner, Visitor, is_self_reference};

// Public re-exports - contract traits
pub use traits::{
    DataProvider, ProviderAttrs, ProviderDir, ProviderRead, ProviderSession, ProviderWrite,
    WriteStream,
};

// Public re-exports - infrastructure
pub use ext::{ProviderExt, Resource};

// Public re-exports - bundled backends
pub use provider::{
    LocalProvider, LoopbackSession, MemoryProvider, RemoteConfig, RemoteError, RemoteProvider,
    RemoteSession,
};
