//! Integration tests verifying the contract works from outside the crate.
//!
//! These tests verify that:
//! 1. A backend written against the public API alone gets `DataProvider`,
//!    `ProviderExt` and the default `exists` for free
//! 2. Generic functions over `&dyn DataProvider` behave the same on every
//!    bundled backend
//! 3. Paths are normalized at the boundary and cannot escape a root
//! 4. Errors carry useful context

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use vfs_contract::cts::Cts;
use vfs_contract::staging::{Publish, StagedWriter, StagingStrategy};
use vfs_contract::*;

// =============================================================================
// Minimal External Backend
// =============================================================================

#[derive(Default)]
struct Tree {
    files: BTreeMap<VfsPath, Vec<u8>>,
    dirs: BTreeSet<VfsPath>,
}

impl Tree {
    fn is_dir(&self, path: &VfsPath) -> bool {
        path.is_root() || self.dirs.contains(path)
    }

    fn add_dir(&mut self, path: &VfsPath) {
        let mut current = path.clone();
        while !current.is_root() {
            self.dirs.insert(current.clone());
            current = current.parent();
        }
    }
}

/// Files in a map, directories implied by their children or created
/// explicitly. Rename moves files only. No `exists` override.
#[derive(Default)]
struct FlatFs {
    tree: Arc<RwLock<Tree>>,
    listings: AtomicUsize,
}

struct FlatPublisher(Arc<RwLock<Tree>>);

impl Publish for FlatPublisher {
    fn publish(&self, path: &VfsPath, data: &mut dyn Read) -> Result<(), VfsError> {
        let mut buf = Vec::new();
        data.read_to_end(&mut buf)
            .map_err(|e| VfsError::io("write", path.clone(), e))?;
        let mut tree = self.0.write().unwrap();
        tree.add_dir(&path.parent());
        tree.files.insert(path.clone(), buf);
        Ok(())
    }

    fn prepare_parent(&self, _path: &VfsPath) -> Result<(), VfsError> {
        Ok(())
    }
}

impl ProviderRead for FlatFs {
    fn read(&self, path: &VfsPath) -> Result<Box<dyn Read + Send>, VfsError> {
        let path = path.normalize();
        let tree = self.tree.read().unwrap();
        let data = tree
            .files
            .get(&path)
            .cloned()
            .ok_or_else(|| VfsError::not_found(path.clone()))?;
        Ok(Box::new(Cursor::new(data)))
    }
}

impl ProviderWrite for FlatFs {
    fn write(&self, path: &VfsPath) -> Result<Box<dyn WriteStream>, VfsError> {
        let publisher = FlatPublisher(Arc::clone(&self.tree));
        let writer = StagedWriter::new(path.normalize(), StagingStrategy::Memory, publisher)?;
        Ok(Box::new(writer))
    }

    fn delete(&self, path: &VfsPath) -> Result<(), VfsError> {
        let path = path.normalize();
        let mut tree = self.tree.write().unwrap();
        tree.files.retain(|k, _| !k.starts_with(&path));
        tree.dirs.retain(|k| !k.starts_with(&path));
        Ok(())
    }

    fn rename(&self, from: &VfsPath, to: &VfsPath) -> Result<(), VfsError> {
        let (from, to) = (from.normalize(), to.normalize());
        let mut tree = self.tree.write().unwrap();
        let data = tree
            .files
            .remove(&from)
            .ok_or_else(|| VfsError::not_found(from.clone()))?;
        tree.add_dir(&to.parent());
        tree.files.insert(to, data);
        Ok(())
    }
}

impl ProviderDir for FlatFs {
    fn read_dir(
        &self,
        path: &VfsPath,
        options: &ReadDirOptions,
    ) -> Result<Box<dyn DirEntList>, VfsError> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        let path = path.normalize();
        let tree = self.tree.read().unwrap();
        if !tree.is_dir(&path) {
            return Err(VfsError::not_found(path));
        }
        let depth = path.names().len() + 1;
        let below = |k: &VfsPath| k.names().len() == depth && k.starts_with(&path);
        let mut entries: Vec<ResourceInfo> = tree
            .dirs
            .iter()
            .filter(|d| below(d))
            .map(|d| ResourceInfo {
                name: d.name().to_string(),
                mode: ResourceMode::Directory,
                ..Default::default()
            })
            .collect();
        entries.extend(tree.files.iter().filter(|(k, _)| below(k)).map(|(k, v)| {
            ResourceInfo {
                name: k.name().to_string(),
                size: v.len() as u64,
                ..Default::default()
            }
        }));
        Ok(Box::new(EntryList::new(entries, options)))
    }

    fn mkdirs(&self, path: &VfsPath) -> Result<(), VfsError> {
        self.tree.write().unwrap().add_dir(&path.normalize());
        Ok(())
    }
}

impl ProviderAttrs for FlatFs {
    fn read_attrs(&self, path: &VfsPath, dest: AttrsMut<'_>) -> Result<(), VfsError> {
        let out = match dest.negotiate(&[AttrKind::ResourceInfo])? {
            AttrsTarget::ResourceInfo(out) => out,
            _ => unreachable!("only ResourceInfo was offered"),
        };
        let path = path.normalize();
        let tree = self.tree.read().unwrap();
        let name = path.name().to_string();
        *out = match tree.files.get(&path) {
            Some(data) => ResourceInfo {
                name,
                size: data.len() as u64,
                ..Default::default()
            },
            None if tree.is_dir(&path) => ResourceInfo {
                name,
                mode: ResourceMode::Directory,
                ..Default::default()
            },
            None => return Err(VfsError::not_found(path)),
        };
        Ok(())
    }

    fn write_attrs(&self, path: &VfsPath, src: AttrsRef<'_>) -> Result<(), VfsError> {
        src.negotiate(&[AttrKind::ResourceInfo])?;
        Err(VfsError::unsupported_operation("write_attrs", path.normalize()))
    }
}

impl ProviderSession for FlatFs {
    fn close(&self) -> Result<(), VfsError> {
        Ok(())
    }
}

fn p(s: &str) -> VfsPath {
    VfsPath::new(s)
}

fn bundled() -> (tempfile::TempDir, Vec<(&'static str, Box<dyn DataProvider>)>) {
    let dir = tempfile::tempdir().unwrap();
    let remote = RemoteProvider::new(LoopbackSession::new(), RemoteConfig::default());
    let providers: Vec<(&'static str, Box<dyn DataProvider>)> = vec![
        ("memory", Box::new(MemoryProvider::new())),
        ("local", Box::new(LocalProvider::new(dir.path()))),
        ("remote", Box::new(remote)),
        ("flat", Box::new(FlatFs::default())),
    ];
    (dir, providers)
}

// =============================================================================
// Tests: External Backend
// =============================================================================

/// A backend built from the public API alone passes the full battery.
#[test]
fn external_backend_is_certified() {
    let report = Cts::all().run(&FlatFs::default());
    assert!(report.is_certified(), "{report}");
}

#[test]
fn default_exists_lists_the_parent() {
    let fs = FlatFs::default();
    fs.write_all(&p("/a/b.txt"), b"x").unwrap();

    let before = fs.listings.load(Ordering::SeqCst);
    assert!(fs.exists(&p("/a/b.txt")).unwrap());
    assert!(!fs.exists(&p("/a/c.txt")).unwrap());
    assert!(!fs.exists(&p("/missing/c.txt")).unwrap());
    assert!(fs.exists(&VfsPath::root()).unwrap());
    assert_eq!(fs.listings.load(Ordering::SeqCst) - before, 3);
}

#[test]
fn composite_trait_is_object_safe() {
    let fs: Arc<dyn DataProvider> = Arc::new(FlatFs::default());
    fs.write_all(&p("/shared.txt"), b"one").unwrap();
    let clone = Arc::clone(&fs);
    let handle = std::thread::spawn(move || clone.read_all(&p("/shared.txt")).unwrap());
    assert_eq!(handle.join().unwrap(), b"one");
}

// =============================================================================
// Tests: Identical Behavior Across Backends
// =============================================================================

fn copy(dp: &dyn DataProvider, from: &VfsPath, to: &VfsPath) -> Result<u64, VfsError> {
    let data = dp.read_all(from)?;
    dp.write_all(to, &data)
}

#[test]
fn workflow_copy_rename_and_list() {
    let (_dir, providers) = bundled();
    for (name, dp) in &providers {
        let dp = dp.as_ref();
        dp.write_all(&p("/docs/readme.md"), b"# hello").unwrap();
        assert_eq!(copy(dp, &p("/docs/readme.md"), &p("/backup/readme.md")).unwrap(), 7);
        dp.rename(&p("/backup/readme.md"), &p("/backup/old/readme.md"))
            .unwrap();

        let mut paths: Vec<String> = dp
            .read_dir_recursive(&VfsPath::root())
            .unwrap()
            .into_iter()
            .map(|r| r.path.to_string())
            .collect();
        paths.sort();
        assert_eq!(
            paths,
            ["/backup", "/backup/old", "/backup/old/readme.md", "/docs", "/docs/readme.md"],
            "{name}"
        );
    }
}

#[test]
fn non_normalized_paths_address_the_same_resource() {
    let (_dir, providers) = bundled();
    for (name, dp) in &providers {
        dp.write_all(&p("a/./b/../c.bin"), b"abc").unwrap();
        assert_eq!(dp.read_all(&p("/a/c.bin")).unwrap(), b"abc", "{name}");
        assert_eq!(dp.stat(&p("//a//c.bin")).unwrap().size, 3, "{name}");
    }
}

#[test]
fn abandoned_writes_are_never_visible() {
    let (_dir, providers) = bundled();
    for (name, dp) in &providers {
        let dp = dp.as_ref();
        {
            let mut w = dp.write(&p("/draft.txt")).unwrap();
            w.write_all(b"unfinished").unwrap();
        }
        assert!(!dp.exists(&p("/draft.txt")).unwrap(), "{name}");
    }
}

#[test]
fn sorted_listing_orders_by_name() {
    let (_dir, providers) = bundled();
    for (name, dp) in &providers {
        for file in ["c", "a", "b"] {
            dp.write_all(&p("/sorted").child(file), b"").unwrap();
        }
        let mut list = dp.read_dir(&p("/sorted"), &ReadDirOptions::SORTED).unwrap();
        let mut seen = Vec::new();
        let visited = list.for_each(&mut |scanner| {
            let mut info = ResourceInfo::default();
            scanner.scan(AttrsMut::new(&mut info))?;
            seen.push(info.name);
            Ok(())
        });
        list.close().unwrap();
        visited.unwrap();
        assert_eq!(seen, ["a", "b", "c"], "{name}");
    }
}

#[test]
fn visitor_errors_abort_enumeration() {
    let (_dir, providers) = bundled();
    for (name, dp) in &providers {
        dp.write_all(&p("/many/1"), b"").unwrap();
        dp.write_all(&p("/many/2"), b"").unwrap();
        let mut list = dp.read_dir(&p("/many"), &ReadDirOptions::default()).unwrap();
        let mut calls = 0;
        let result = list.for_each(&mut |_| {
            calls += 1;
            Err(VfsError::unsupported_operation("visit", p("/many")))
        });
        list.close().unwrap();
        assert!(result.unwrap_err().is_unsupported_operation(), "{name}");
        assert_eq!(calls, 1, "{name}");
    }
}

#[test]
fn open_writes_are_not_listed() {
    let (_dir, providers) = bundled();
    for (name, dp) in &providers {
        let dp = dp.as_ref();
        dp.write_all(&p("/new/deep/other.txt"), b"x").unwrap();
        let mut w = dp.write(&p("/new/deep/f.txt")).unwrap();
        w.write_all(b"staged!").unwrap();
        let listed: Vec<_> = dp
            .read_dir_infos(&p("/new/deep"))
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(listed, ["other.txt"], "{name}");
        let root: Vec<_> = dp
            .read_dir_infos(&VfsPath::root())
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(root, ["new"], "{name}");
        assert_eq!(w.close().unwrap(), 7, "{name}");
    }
}

/// Rename into an ancestor would delete the source along with the target.
#[test]
fn rename_onto_an_ancestor_is_rejected_intact() {
    let (_dir, providers) = bundled();
    for (name, dp) in providers.iter().filter(|(name, _)| *name != "flat") {
        let dp = dp.as_ref();
        dp.write_all(&p("/d/x"), b"moved?").unwrap();
        dp.write_all(&p("/d/keep"), b"kept").unwrap();

        assert!(dp.rename(&p("/d/x"), &p("/d")).is_err(), "{name}");
        assert!(dp.rename(&p("/d/x"), &VfsPath::root()).is_err(), "{name}");
        assert_eq!(dp.read_all(&p("/d/x")).unwrap(), b"moved?", "{name}");
        assert_eq!(dp.read_all(&p("/d/keep")).unwrap(), b"kept", "{name}");
    }
}

#[test]
fn mkdirs_over_a_file_fails() {
    let (_dir, providers) = bundled();
    for (name, dp) in providers.iter().filter(|(name, _)| *name != "flat") {
        let dp = dp.as_ref();
        dp.write_all(&p("/f"), b"x").unwrap();
        assert!(dp.mkdirs(&p("/f")).is_err(), "{name}");
        assert!(dp.mkdirs(&p("/f/below")).is_err(), "{name}");
        assert!(!dp.is_dir(&p("/f")).unwrap(), "{name}");
        assert_eq!(dp.read_all(&p("/f")).unwrap(), b"x", "{name}");
    }
}

#[test]
fn delete_tolerates_missing_targets() {
    let (_dir, providers) = bundled();
    for (name, dp) in &providers {
        dp.delete(&p("/never/existed")).unwrap_or_else(|e| panic!("{name}: {e}"));
    }
}

// =============================================================================
// Tests: Paths and Errors
// =============================================================================

#[test]
fn local_root_cannot_be_escaped() {
    let outer = tempfile::tempdir().unwrap();
    let jail = outer.path().join("jail");
    std::fs::create_dir(&jail).unwrap();
    let dp = LocalProvider::new(&jail);

    dp.write_all(&p("/../../../secret.txt"), b"s").unwrap();
    assert!(jail.join("secret.txt").exists());
    assert!(!outer.path().join("secret.txt").exists());
}

#[test]
fn preserve_policy_keeps_leading_parent_segments() {
    let path = p("../a/./b");
    assert_eq!(path.normalize().to_string(), "/a/b");
    assert_eq!(path.normalize_with(EscapePolicy::Preserve).to_string(), "/../a/b");
}

#[test]
fn error_messages_carry_path_and_operation() {
    let dp = MemoryProvider::new();
    let err = dp.read_all(&p("/missing.txt")).unwrap_err();
    assert_eq!(err.to_string(), "not found: /missing.txt");

    let err = VfsError::permission_denied(p("/secret"), "read");
    assert_eq!(err.to_string(), "read: permission denied: /secret");

    let remote = RemoteProvider::new(LoopbackSession::new(), RemoteConfig::default());
    let err = remote
        .write_attrs(&p("/x"), AttrsRef::new(&ResourceInfo::default()))
        .unwrap_err();
    assert_eq!(err.to_string(), "write_attrs: unsupported operation: /x");
}

#[test]
fn remote_errors_keep_the_reply_as_source() {
    use std::error::Error;

    let session = LoopbackSession::new();
    session.inject("LIST", RemoteError::new(530, "not logged in"));
    let dp = RemoteProvider::new(session, RemoteConfig::default());
    let err = dp.read_dir_infos(&VfsPath::root()).unwrap_err();
    assert!(err.is_permission_denied());
    assert_eq!(err.source().unwrap().to_string(), "530 not logged in");
}
