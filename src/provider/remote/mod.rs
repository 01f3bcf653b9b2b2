//! Single-session remote backend.
//!
//! [`RemoteProvider`] adapts any [`RemoteSession`] (one stateful connection
//! to an FTP-like service) to the provider contract. The service has no
//! existence probe, no streaming upload, no atomic overwrite on rename and
//! no recursive directory creation; the adapter emulates each of them:
//!
//! | Contract operation | Emulation |
//! |--------------------|-----------|
//! | `exists`, `read_attrs` | list the parent and match the leaf name |
//! | `write` | stage locally, `store` once on close, retry after `mkdirs` |
//! | `mkdirs` | single `make_dir`, then segment by segment |
//! | `delete` | file delete, then recursive directory removal |
//! | `rename` | delete an existing target first |
//!
//! # Thread Safety
//!
//! The session sits behind one mutex. Concurrent callers are serialized per
//! command, and the multi-step emulations above are not atomic with respect
//! to each other.

mod loopback;
mod session;

pub use loopback::LoopbackSession;
pub use session::{EntryKind, RemoteEntry, RemoteError, RemoteSession};

use std::io::{self, Cursor, Read};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use crate::recovery::{mkdirs_optimistic, tolerate_not_found};
use crate::staging::{Publish, StagedWriter, StagingStrategy};
use crate::{
    AttrKind, AttrsMut, AttrsRef, AttrsTarget, DirEntList, EntryList, ProviderAttrs, ProviderDir,
    ProviderRead, ProviderSession, ProviderWrite, ReadDirOptions, ResourceInfo, ResourceMode,
    VfsError, VfsPath, WriteStream, epoch_millis,
};

const SUPPORTED: &[AttrKind] = &[AttrKind::ResourceInfo];

/// Settings for a [`RemoteProvider`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RemoteConfig {
    /// Remote directory every caller path is placed under.
    pub root: VfsPath,
    /// How writes are staged before they are stored.
    pub staging: StagingStrategy,
}

/// Map a reply onto the taxonomy, keeping it as the nested cause.
fn translate(operation: &'static str, path: VfsPath, err: RemoteError) -> VfsError {
    match err.code {
        550 => VfsError::NotFound {
            path,
            source: Some(err.into()),
        },
        530 | 532 | 553 => VfsError::PermissionDenied {
            path,
            operation,
            source: Some(err.into()),
        },
        502 | 504 => VfsError::unsupported_operation(operation, path),
        _ => VfsError::backend(operation, path, err),
    }
}

fn info_from(entry: &RemoteEntry) -> ResourceInfo {
    ResourceInfo {
        name: entry.name.clone(),
        size: entry.size,
        mod_time: epoch_millis(entry.modified),
        mode: match entry.kind {
            EntryKind::File => ResourceMode::File,
            EntryKind::Folder => ResourceMode::Directory,
            EntryKind::Link => ResourceMode::Symlink,
        },
    }
}

struct SessionState<S> {
    session: S,
    closed: bool,
}

/// The locked session plus the remote root; every helper takes caller paths.
struct Conn<'a, S> {
    session: &'a mut S,
    root: &'a VfsPath,
}

impl<S: RemoteSession> Conn<'_, S> {
    fn remote(&self, path: &VfsPath) -> String {
        self.root.join(path).to_string()
    }

    fn list(&mut self, path: &VfsPath) -> Result<Vec<RemoteEntry>, VfsError> {
        let remote = self.remote(path);
        let mut entries = self
            .session
            .list(&remote)
            .map_err(|e| translate("read_dir", path.clone(), e))?;
        entries.retain(|e| !crate::dirent::is_self_reference(&e.name));
        Ok(entries)
    }

    fn lookup(&mut self, path: &VfsPath) -> Result<Option<ResourceInfo>, VfsError> {
        if path.is_root() {
            return Ok(Some(ResourceInfo {
                mode: ResourceMode::Directory,
                ..ResourceInfo::default()
            }));
        }
        let entries = match self.list(&path.parent()) {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(entries
            .iter()
            .find(|e| e.name == path.name())
            .map(info_from))
    }

    fn exists(&mut self, path: &VfsPath) -> Result<bool, VfsError> {
        Ok(self.lookup(path)?.is_some())
    }

    /// A directory probe for the mkdirs fallback: a file in the way fails.
    fn is_dir(&mut self, path: &VfsPath) -> Result<bool, VfsError> {
        match self.lookup(path)? {
            None => Ok(false),
            Some(info) if info.is_dir() => Ok(true),
            Some(_) => Err(VfsError::io(
                "mkdirs",
                path.clone(),
                io::Error::from(io::ErrorKind::NotADirectory),
            )),
        }
    }

    fn make_dir(&mut self, path: &VfsPath) -> Result<(), VfsError> {
        let remote = self.remote(path);
        self.session
            .make_dir(&remote)
            .map_err(|e| translate("mkdirs", path.clone(), e))
    }

    fn mkdirs(&mut self, path: &VfsPath) -> Result<(), VfsError> {
        // Prefix segments of the remote root may be missing too.
        let full = self.root.join(path);
        let mut at_root = Conn {
            session: &mut *self.session,
            root: &VfsPath::root(),
        };
        mkdirs_optimistic(&mut at_root, &full, Conn::is_dir, Conn::make_dir)
    }

    fn remove(&mut self, path: &VfsPath) -> Result<(), VfsError> {
        let remote = self.remote(path);
        match self.session.delete(&remote) {
            Ok(()) => return Ok(()),
            Err(e) if e.code == 550 => {}
            Err(e) => return Err(translate("delete", path.clone(), e)),
        }
        self.remove_tree(path)
    }

    fn remove_tree(&mut self, path: &VfsPath) -> Result<(), VfsError> {
        for entry in self.list(path)? {
            let child = path.child(&entry.name);
            if entry.kind == EntryKind::Folder {
                self.remove_tree(&child)?;
            } else {
                let remote = self.remote(&child);
                self.session
                    .delete(&remote)
                    .map_err(|e| translate("delete", child.clone(), e))?;
            }
        }
        if path.is_root() {
            return Ok(());
        }
        let remote = self.remote(path);
        self.session
            .remove_dir(&remote)
            .map_err(|e| translate("delete", path.clone(), e))
    }

    fn rename(&mut self, from: &VfsPath, to: &VfsPath) -> Result<(), VfsError> {
        let (remote_from, remote_to) = (self.remote(from), self.remote(to));
        self.session
            .rename(&remote_from, &remote_to)
            .map_err(|e| translate("rename", to.clone(), e))
    }
}

struct Link<S> {
    state: Arc<Mutex<SessionState<S>>>,
    root: VfsPath,
}

impl<S> Clone for Link<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            root: self.root.clone(),
        }
    }
}

impl<S: RemoteSession> Link<S> {
    fn with_conn<T>(
        &self,
        operation: &'static str,
        path: &VfsPath,
        f: impl FnOnce(&mut Conn<'_, S>) -> Result<T, VfsError>,
    ) -> Result<T, VfsError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(translate(
                operation,
                path.clone(),
                RemoteError::new(421, "session closed"),
            ));
        }
        let mut conn = Conn {
            session: &mut state.session,
            root: &self.root,
        };
        f(&mut conn)
    }
}

impl<S: RemoteSession> Publish for Link<S> {
    fn publish(&self, path: &VfsPath, data: &mut dyn Read) -> Result<(), VfsError> {
        self.with_conn("write", path, |conn| {
            let remote = conn.remote(path);
            conn.session
                .store(&remote, data)
                .map_err(|e| translate("write", path.clone(), e))
        })
    }

    fn prepare_parent(&self, path: &VfsPath) -> Result<(), VfsError> {
        self.with_conn("mkdirs", path, |conn| conn.mkdirs(&path.parent()))
    }
}

/// A data provider over one [`RemoteSession`].
///
/// # Example
///
/// ```rust
/// use vfs_contract::{
///     LoopbackSession, ProviderDir, ProviderExt, RemoteConfig, RemoteProvider, VfsPath,
/// };
///
/// let dp = RemoteProvider::connect(RemoteConfig::default(), || Ok(LoopbackSession::new())).unwrap();
/// dp.write_all(&VfsPath::new("/a/b.txt"), b"hi").unwrap();
/// assert!(dp.exists(&VfsPath::new("/a")).unwrap());
/// ```
pub struct RemoteProvider<S> {
    link: Link<S>,
    staging: StagingStrategy,
}

impl<S: RemoteSession> RemoteProvider<S> {
    /// Open a session with `connect` and wrap it.
    ///
    /// # Errors
    ///
    /// The translated connection failure.
    pub fn connect<F>(config: RemoteConfig, connect: F) -> Result<Self, VfsError>
    where
        F: FnOnce() -> Result<S, RemoteError>,
    {
        let root = config.root.normalize();
        let session = connect().map_err(|e| translate("connect", root.clone(), e))?;
        debug!(root = %root, "remote session connected");
        Ok(Self::new(session, config))
    }

    /// Wrap an already open session.
    pub fn new(session: S, config: RemoteConfig) -> Self {
        Self {
            link: Link {
                state: Arc::new(Mutex::new(SessionState {
                    session,
                    closed: false,
                })),
                root: config.root.normalize(),
            },
            staging: config.staging,
        }
    }

    /// The remote directory caller paths are placed under.
    pub fn root(&self) -> &VfsPath {
        &self.link.root
    }
}

impl<S> std::fmt::Debug for RemoteProvider<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteProvider")
            .field("root", &self.link.root)
            .field("staging", &self.staging)
            .finish_non_exhaustive()
    }
}

impl<S: RemoteSession> ProviderRead for RemoteProvider<S> {
    /// Downloads the whole file before returning: the session cannot
    /// interleave another command with an open transfer.
    fn read(&self, path: &VfsPath) -> Result<Box<dyn Read + Send>, VfsError> {
        let path = path.normalize();
        let data = self.link.with_conn("read", &path, |conn| {
            let remote = conn.remote(&path);
            conn.session
                .retrieve(&remote)
                .map_err(|e| translate("read", path.clone(), e))
        })?;
        Ok(Box::new(Cursor::new(data)))
    }
}

impl<S: RemoteSession + 'static> ProviderWrite for RemoteProvider<S> {
    fn write(&self, path: &VfsPath) -> Result<Box<dyn WriteStream>, VfsError> {
        let path = path.normalize();
        if path.is_root() {
            return Err(VfsError::io(
                "write",
                path,
                io::Error::from(io::ErrorKind::IsADirectory),
            ));
        }
        Ok(Box::new(StagedWriter::new(path, self.staging, self.link.clone())?))
    }

    fn delete(&self, path: &VfsPath) -> Result<(), VfsError> {
        let path = path.normalize();
        debug!(path = %path, "remote delete");
        self.link
            .with_conn("delete", &path, |conn| tolerate_not_found(conn.remove(&path)))
    }

    fn rename(&self, from: &VfsPath, to: &VfsPath) -> Result<(), VfsError> {
        let (from, to) = (from.normalize(), to.normalize());
        self.link.with_conn("rename", &from, |conn| {
            if !conn.exists(&from)? {
                return Err(VfsError::not_found(from.clone()));
            }
            if from == to {
                return Ok(());
            }
            if from.is_root() || to.starts_with(&from) || from.starts_with(&to) {
                return Err(VfsError::io(
                    "rename",
                    from.clone(),
                    io::Error::from(io::ErrorKind::InvalidInput),
                ));
            }
            if conn.exists(&to)? {
                warn!(from = %from, to = %to, "rename target exists, deleting it first");
                conn.remove(&to)?;
            }
            match conn.rename(&from, &to) {
                Err(e) if e.is_not_found() => {
                    conn.mkdirs(&to.parent())?;
                    conn.rename(&from, &to)
                }
                other => other,
            }
        })
    }
}

impl<S: RemoteSession> ProviderDir for RemoteProvider<S> {
    fn read_dir(
        &self,
        path: &VfsPath,
        options: &ReadDirOptions,
    ) -> Result<Box<dyn DirEntList>, VfsError> {
        let path = path.normalize();
        let entries = self.link.with_conn("read_dir", &path, |conn| conn.list(&path))?;
        debug!(path = %path, entries = entries.len(), "listed remote directory");
        Ok(Box::new(EntryList::new(
            entries.iter().map(info_from),
            options,
        )))
    }

    fn mkdirs(&self, path: &VfsPath) -> Result<(), VfsError> {
        let path = path.normalize();
        self.link.with_conn("mkdirs", &path, |conn| conn.mkdirs(&path))
    }

    fn exists(&self, path: &VfsPath) -> Result<bool, VfsError> {
        let path = path.normalize();
        self.link.with_conn("exists", &path, |conn| conn.exists(&path))
    }
}

impl<S: RemoteSession> ProviderAttrs for RemoteProvider<S> {
    fn read_attrs(&self, path: &VfsPath, dest: AttrsMut<'_>) -> Result<(), VfsError> {
        let AttrsTarget::ResourceInfo(out) = dest.negotiate(SUPPORTED)?;
        let path = path.normalize();
        let found = self
            .link
            .with_conn("read_attrs", &path, |conn| conn.lookup(&path))?;
        *out = found.ok_or_else(|| VfsError::not_found(path.clone()))?;
        Ok(())
    }

    /// The service has no command to change attributes: a recognized shape
    /// is answered with [`VfsError::UnsupportedOperation`].
    fn write_attrs(&self, path: &VfsPath, src: AttrsRef<'_>) -> Result<(), VfsError> {
        src.negotiate(SUPPORTED)?;
        Err(VfsError::unsupported_operation("write_attrs", path.normalize()))
    }
}

impl<S: RemoteSession> ProviderSession for RemoteProvider<S> {
    /// Sends `quit` the first time; later calls succeed without contacting
    /// the service.
    fn close(&self) -> Result<(), VfsError> {
        let mut state = self.link.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        debug!(root = %self.link.root, "closing remote session");
        state
            .session
            .quit()
            .map_err(|e| translate("close", self.link.root.clone(), e))
    }
}
