//! In-memory reference backend.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use tracing::debug;

use crate::staging::{Publish, StagedWriter, StagingStrategy};
use crate::{
    AttrKind, AttrsMut, AttrsRef, AttrsSource, AttrsTarget, DirEntList, EntryList, ProviderAttrs,
    ProviderDir, ProviderRead, ProviderSession, ProviderWrite, ReadDirOptions, ResourceInfo,
    ResourceMode, VfsError, VfsPath, WriteStream, epoch_millis,
};

const SUPPORTED: &[AttrKind] = &[AttrKind::ResourceInfo];

#[derive(Debug, Clone)]
enum Node {
    File { data: Vec<u8>, mod_time: i64 },
    Dir { mod_time: i64 },
}

impl Node {
    fn info(&self, name: &str) -> ResourceInfo {
        match self {
            Node::File { data, mod_time } => ResourceInfo {
                name: name.to_owned(),
                size: data.len() as u64,
                mod_time: *mod_time,
                mode: ResourceMode::File,
            },
            Node::Dir { mod_time } => ResourceInfo {
                name: name.to_owned(),
                size: 0,
                mod_time: *mod_time,
                mode: ResourceMode::Directory,
            },
        }
    }
}

#[derive(Debug)]
struct Tree {
    nodes: BTreeMap<VfsPath, Node>,
}

impl Tree {
    fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(VfsPath::root(), Node::Dir { mod_time: now() });
        Self { nodes }
    }

    fn ensure_dirs(&mut self, path: &VfsPath, operation: &'static str) -> Result<(), VfsError> {
        let mut current = VfsPath::root();
        for name in path.names() {
            current = current.child(name);
            match self.nodes.get(&current) {
                Some(Node::Dir { .. }) => {}
                Some(Node::File { .. }) => return Err(not_a_directory(operation, current)),
                None => {
                    self.nodes.insert(current.clone(), Node::Dir { mod_time: now() });
                }
            }
        }
        Ok(())
    }

    fn subtree(&self, path: &VfsPath) -> Vec<VfsPath> {
        self.nodes
            .keys()
            .filter(|k| k.starts_with(path) && !k.is_root())
            .cloned()
            .collect()
    }
}

fn now() -> i64 {
    epoch_millis(SystemTime::now())
}

fn not_a_directory(operation: &'static str, path: VfsPath) -> VfsError {
    VfsError::io(operation, path, io::Error::from(io::ErrorKind::NotADirectory))
}

fn is_a_directory(operation: &'static str, path: VfsPath) -> VfsError {
    VfsError::io(operation, path, io::Error::from(io::ErrorKind::IsADirectory))
}

/// A data provider that keeps everything in process memory.
///
/// Cloning yields another handle to the same tree. Safe for concurrent use:
/// every operation takes a single lock, so each one is atomic.
///
/// # Example
///
/// ```rust
/// use vfs_contract::{MemoryProvider, ProviderExt, VfsPath};
///
/// let dp = MemoryProvider::new();
/// dp.write_all(&VfsPath::new("/docs/a.txt"), b"hello").unwrap();
/// assert_eq!(dp.read_all(&VfsPath::new("docs/./a.txt")).unwrap(), b"hello");
/// ```
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    tree: Arc<RwLock<Tree>>,
}

impl MemoryProvider {
    /// An empty tree containing only the root directory.
    pub fn new() -> Self {
        Self {
            tree: Arc::new(RwLock::new(Tree::new())),
        }
    }

    fn tree(&self) -> RwLockReadGuard<'_, Tree> {
        self.tree.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn tree_mut(&self) -> RwLockWriteGuard<'_, Tree> {
        self.tree.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

struct MemoryPublisher {
    tree: Arc<RwLock<Tree>>,
}

impl Publish for MemoryPublisher {
    fn publish(&self, path: &VfsPath, data: &mut dyn Read) -> Result<(), VfsError> {
        let mut bytes = Vec::new();
        data.read_to_end(&mut bytes)
            .map_err(|e| VfsError::io("write", path.clone(), e))?;

        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(Node::Dir { .. }) = tree.nodes.get(path) {
            return Err(is_a_directory("write", path.clone()));
        }
        tree.ensure_dirs(&path.parent(), "write")?;
        tree.nodes.insert(
            path.clone(),
            Node::File {
                data: bytes,
                mod_time: now(),
            },
        );
        Ok(())
    }

    fn prepare_parent(&self, path: &VfsPath) -> Result<(), VfsError> {
        let mut tree = self.tree.write().unwrap_or_else(PoisonError::into_inner);
        tree.ensure_dirs(&path.parent(), "mkdirs")
    }
}

impl ProviderRead for MemoryProvider {
    fn read(&self, path: &VfsPath) -> Result<Box<dyn Read + Send>, VfsError> {
        let path = path.normalize();
        match self.tree().nodes.get(&path) {
            Some(Node::File { data, .. }) => Ok(Box::new(Cursor::new(data.clone()))),
            Some(Node::Dir { .. }) => Err(is_a_directory("read", path)),
            None => Err(VfsError::not_found(path)),
        }
    }
}

impl ProviderWrite for MemoryProvider {
    fn write(&self, path: &VfsPath) -> Result<Box<dyn WriteStream>, VfsError> {
        let path = path.normalize();
        if path.is_root() {
            return Err(is_a_directory("write", path));
        }
        let publisher = MemoryPublisher {
            tree: Arc::clone(&self.tree),
        };
        Ok(Box::new(StagedWriter::new(path, StagingStrategy::Memory, publisher)?))
    }

    fn delete(&self, path: &VfsPath) -> Result<(), VfsError> {
        let path = path.normalize();
        let mut tree = self.tree_mut();
        let doomed = tree.subtree(&path);
        debug!(path = %path, entries = doomed.len(), "delete");
        for key in doomed {
            tree.nodes.remove(&key);
        }
        Ok(())
    }

    fn rename(&self, from: &VfsPath, to: &VfsPath) -> Result<(), VfsError> {
        let (from, to) = (from.normalize(), to.normalize());
        let mut tree = self.tree_mut();
        if !tree.nodes.contains_key(&from) {
            return Err(VfsError::not_found(from));
        }
        if from == to {
            return Ok(());
        }
        if from.is_root() || to.starts_with(&from) || from.starts_with(&to) {
            return Err(VfsError::io(
                "rename",
                from,
                io::Error::from(io::ErrorKind::InvalidInput),
            ));
        }

        for key in tree.subtree(&to) {
            tree.nodes.remove(&key);
        }
        tree.ensure_dirs(&to.parent(), "rename")?;
        for key in tree.subtree(&from) {
            if let Some(node) = tree.nodes.remove(&key) {
                tree.nodes.insert(to.join(&key.trim_prefix(&from)), node);
            }
        }
        Ok(())
    }
}

impl ProviderDir for MemoryProvider {
    fn read_dir(
        &self,
        path: &VfsPath,
        options: &ReadDirOptions,
    ) -> Result<Box<dyn DirEntList>, VfsError> {
        let path = path.normalize();
        let tree = self.tree();
        match tree.nodes.get(&path) {
            Some(Node::Dir { .. }) => {}
            Some(Node::File { .. }) => return Err(not_a_directory("read_dir", path)),
            None => return Err(VfsError::not_found(path)),
        }
        let depth = path.names().len() + 1;
        let entries: Vec<ResourceInfo> = tree
            .nodes
            .iter()
            .filter(|(k, _)| k.names().len() == depth && k.starts_with(&path))
            .map(|(k, node)| node.info(k.name()))
            .collect();
        Ok(Box::new(EntryList::new(entries, options)))
    }

    fn mkdirs(&self, path: &VfsPath) -> Result<(), VfsError> {
        self.tree_mut().ensure_dirs(&path.normalize(), "mkdirs")
    }

    fn exists(&self, path: &VfsPath) -> Result<bool, VfsError> {
        Ok(self.tree().nodes.contains_key(&path.normalize()))
    }
}

impl ProviderAttrs for MemoryProvider {
    fn read_attrs(&self, path: &VfsPath, dest: AttrsMut<'_>) -> Result<(), VfsError> {
        let AttrsTarget::ResourceInfo(out) = dest.negotiate(SUPPORTED)?;
        let path = path.normalize();
        let tree = self.tree();
        let node = tree
            .nodes
            .get(&path)
            .ok_or_else(|| VfsError::not_found(path.clone()))?;
        *out = node.info(path.name());
        Ok(())
    }

    fn write_attrs(&self, path: &VfsPath, src: AttrsRef<'_>) -> Result<(), VfsError> {
        let AttrsSource::ResourceInfo(info) = src.negotiate(SUPPORTED)?;
        let path = path.normalize();
        let mut tree = self.tree_mut();
        match tree.nodes.get_mut(&path) {
            Some(Node::File { mod_time, .. } | Node::Dir { mod_time }) => {
                *mod_time = info.mod_time;
                Ok(())
            }
            None => Err(VfsError::not_found(path)),
        }
    }
}

impl ProviderSession for MemoryProvider {
    fn close(&self) -> Result<(), VfsError> {
        Ok(())
    }
}
