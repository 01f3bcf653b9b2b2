//! Local filesystem backend.
//!
//! Every path is normalized and then joined onto a root directory, so a
//! caller can never reach anything outside of it.
//!
//! Writes are staged in a hidden `.vfs-staging` directory under the root
//! and moved into place on close. That directory never shows up in
//! listings of the root, and deleting the root leaves it alone.

use std::fs::{self, DirEntry, File, Metadata};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::recovery::tolerate_not_found;
use crate::{
    AttrKind, AttrsMut, AttrsRef, AttrsSource, AttrsTarget, DirEntList, ProviderAttrs, ProviderDir,
    ProviderRead, ProviderSession, ProviderWrite, ReadDirOptions, ResourceInfo, ResourceMode,
    Scanner, VfsError, VfsPath, Visitor, WriteStream, epoch_millis,
};

const SUPPORTED: &[AttrKind] = &[AttrKind::ResourceInfo];

/// Directory under the root holding in-flight writes.
const STAGING_DIR: &str = ".vfs-staging";

/// A data provider over a directory on the local disk.
///
/// Safe for concurrent use to the extent the operating system is: each
/// operation maps to one or a few filesystem calls, and writes become
/// visible through an atomic rename on close.
#[derive(Debug, Clone)]
pub struct LocalProvider {
    root: PathBuf,
}

impl LocalProvider {
    /// A provider rooted at `root`.
    ///
    /// The root is canonicalized when possible so that symlinked temp
    /// directories resolve consistently.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root: PathBuf = root.into();
        let root = root.canonicalize().unwrap_or(root);
        Self { root }
    }

    /// The directory every path is resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &VfsPath) -> PathBuf {
        path.to_fs_path(&self.root)
    }

    fn is_staging(path: &VfsPath, name: &str) -> bool {
        path.is_root() && name == STAGING_DIR
    }
}

fn info_from(name: &str, meta: &Metadata) -> ResourceInfo {
    let file_type = meta.file_type();
    let mode = if file_type.is_symlink() {
        ResourceMode::Symlink
    } else if file_type.is_dir() {
        ResourceMode::Directory
    } else {
        ResourceMode::File
    };
    ResourceInfo {
        name: name.to_owned(),
        size: if mode == ResourceMode::Directory { 0 } else { meta.len() },
        mod_time: meta.modified().map(epoch_millis).unwrap_or(0),
        mode,
    }
}

fn system_time(millis: i64) -> Option<SystemTime> {
    let offset = Duration::from_millis(millis.unsigned_abs());
    if millis >= 0 {
        UNIX_EPOCH.checked_add(offset)
    } else {
        UNIX_EPOCH.checked_sub(offset)
    }
}

fn invalid(operation: &'static str, path: VfsPath) -> VfsError {
    VfsError::io(operation, path, io::Error::from(io::ErrorKind::InvalidInput))
}

struct LocalWriter {
    path: VfsPath,
    target: PathBuf,
    file: NamedTempFile,
    written: u64,
}

impl Write for LocalWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl WriteStream for LocalWriter {
    fn close(self: Box<Self>) -> Result<u64, VfsError> {
        let LocalWriter {
            path,
            target,
            mut file,
            written,
        } = *self;
        file.flush()
            .map_err(|e| VfsError::io("write", path.clone(), e))?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| VfsError::io("write", path.parent(), e))?;
        }
        file.persist(&target)
            .map_err(|e| VfsError::io("write", path.clone(), e.error))?;
        debug!(path = %path, bytes = written, "committed local write");
        Ok(written)
    }
}

/// Listing over native directory entries; metadata is fetched per scan.
struct LocalList {
    entries: Vec<DirEntry>,
    size: u64,
}

impl DirEntList for LocalList {
    fn size(&self) -> u64 {
        self.size
    }

    fn for_each(&mut self, each: &mut Visitor<'_>) -> Result<(), VfsError> {
        for entry in std::mem::take(&mut self.entries) {
            each(&EntryScanner(&entry))?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), VfsError> {
        self.entries.clear();
        Ok(())
    }
}

struct EntryScanner<'a>(&'a DirEntry);

impl Scanner for EntryScanner<'_> {
    fn scan(&self, dest: AttrsMut<'_>) -> Result<(), VfsError> {
        let AttrsTarget::ResourceInfo(out) = dest.negotiate(SUPPORTED)?;
        let name = self.0.file_name().to_string_lossy().into_owned();
        let meta = fs::symlink_metadata(self.0.path())
            .map_err(|e| VfsError::io("scan", VfsPath::new(&name), e))?;
        *out = info_from(&name, &meta);
        Ok(())
    }
}

impl ProviderRead for LocalProvider {
    fn read(&self, path: &VfsPath) -> Result<Box<dyn Read + Send>, VfsError> {
        let file = File::open(self.resolve(path)).map_err(|e| VfsError::io("read", path.normalize(), e))?;
        Ok(Box::new(file))
    }
}

impl ProviderWrite for LocalProvider {
    fn write(&self, path: &VfsPath) -> Result<Box<dyn WriteStream>, VfsError> {
        let path = path.normalize();
        if path.is_root() {
            return Err(invalid("write", path));
        }
        let target = self.resolve(&path);
        let staging = self.root.join(STAGING_DIR);
        fs::create_dir_all(&staging).map_err(|e| VfsError::io("write", path.clone(), e))?;
        let file = NamedTempFile::new_in(&staging).map_err(|e| VfsError::io("write", path.clone(), e))?;
        Ok(Box::new(LocalWriter {
            path,
            target,
            file,
            written: 0,
        }))
    }

    fn delete(&self, path: &VfsPath) -> Result<(), VfsError> {
        let path = path.normalize();
        let full = self.resolve(&path);
        let meta = match fs::symlink_metadata(&full) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(VfsError::io("delete", path, e)),
        };

        if path.is_root() {
            let entries = fs::read_dir(&full).map_err(|e| VfsError::io("delete", path.clone(), e))?;
            for entry in entries {
                let entry = entry.map_err(|e| VfsError::io("delete", path.clone(), e))?;
                let name = entry.file_name().to_string_lossy().into_owned();
                if Self::is_staging(&path, &name) {
                    continue;
                }
                self.delete(&path.child(&name))?;
            }
            return Ok(());
        }

        debug!(path = %path, dir = meta.is_dir(), "delete");
        let removed = if meta.is_dir() {
            fs::remove_dir_all(&full)
        } else {
            fs::remove_file(&full)
        };
        tolerate_not_found(removed.map_err(|e| VfsError::io("delete", path, e)))
    }

    fn rename(&self, from: &VfsPath, to: &VfsPath) -> Result<(), VfsError> {
        let (from, to) = (from.normalize(), to.normalize());
        let (from_full, to_full) = (self.resolve(&from), self.resolve(&to));
        fs::symlink_metadata(&from_full).map_err(|e| VfsError::io("rename", from.clone(), e))?;
        if from == to {
            return Ok(());
        }
        if from.is_root() || to.starts_with(&from) || from.starts_with(&to) {
            return Err(invalid("rename", from));
        }

        if fs::symlink_metadata(&to_full).is_ok_and(|meta| meta.is_dir()) {
            debug!(to = %to, "removing directory rename target");
            fs::remove_dir_all(&to_full).map_err(|e| VfsError::io("rename", to.clone(), e))?;
        }
        if let Some(parent) = to_full.parent() {
            fs::create_dir_all(parent).map_err(|e| VfsError::io("rename", to.parent(), e))?;
        }
        fs::rename(&from_full, &to_full).map_err(|e| VfsError::io("rename", from, e))
    }
}

impl ProviderDir for LocalProvider {
    fn read_dir(
        &self,
        path: &VfsPath,
        options: &ReadDirOptions,
    ) -> Result<Box<dyn DirEntList>, VfsError> {
        let path = path.normalize();
        let iter = fs::read_dir(self.resolve(&path)).map_err(|e| VfsError::io("read_dir", path.clone(), e))?;
        let mut entries = iter
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| VfsError::io("read_dir", path.clone(), e))?;
        entries.retain(|entry| !Self::is_staging(&path, &entry.file_name().to_string_lossy()));
        if options.sort_by_name {
            entries.sort_by_key(DirEntry::file_name);
        }
        debug!(path = %path, entries = entries.len(), "listed local directory");
        Ok(Box::new(LocalList {
            size: entries.len() as u64,
            entries,
        }))
    }

    fn mkdirs(&self, path: &VfsPath) -> Result<(), VfsError> {
        fs::create_dir_all(self.resolve(path)).map_err(|e| VfsError::io("mkdirs", path.normalize(), e))
    }

    fn exists(&self, path: &VfsPath) -> Result<bool, VfsError> {
        match fs::symlink_metadata(self.resolve(path)) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(VfsError::io("exists", path.normalize(), e)),
        }
    }
}

impl ProviderAttrs for LocalProvider {
    fn read_attrs(&self, path: &VfsPath, dest: AttrsMut<'_>) -> Result<(), VfsError> {
        let AttrsTarget::ResourceInfo(out) = dest.negotiate(SUPPORTED)?;
        let path = path.normalize();
        let meta = fs::symlink_metadata(self.resolve(&path))
            .map_err(|e| VfsError::io("read_attrs", path.clone(), e))?;
        *out = info_from(path.name(), &meta);
        Ok(())
    }

    fn write_attrs(&self, path: &VfsPath, src: AttrsRef<'_>) -> Result<(), VfsError> {
        let AttrsSource::ResourceInfo(info) = src.negotiate(SUPPORTED)?;
        let path = path.normalize();
        let modified = system_time(info.mod_time).ok_or_else(|| invalid("write_attrs", path.clone()))?;
        File::open(self.resolve(&path))
            .and_then(|file| file.set_modified(modified))
            .map_err(|e| VfsError::io("write_attrs", path, e))
    }
}

impl ProviderSession for LocalProvider {
    fn close(&self) -> Result<(), VfsError> {
        Ok(())
    }
}
