//! # Bundled Backends
//!
//! | Backend | Storage | Concurrency |
//! |---------|---------|-------------|
//! | [`MemoryProvider`] | process memory | one lock per operation |
//! | [`LocalProvider`] | a directory on disk | as the operating system allows |
//! | [`RemoteProvider`] | one [`RemoteSession`] | serialized per command |
//!
//! All three pass the full [`cts`](crate::cts) battery.

mod local;
mod memory;
pub mod remote;

pub use local::LocalProvider;
pub use memory::MemoryProvider;
pub use remote::{
    EntryKind, LoopbackSession, RemoteConfig, RemoteEntry, RemoteError, RemoteProvider,
    RemoteSession,
};
