//! Directory listings.
//!
//! A listing is a [`DirEntList`]: sized up front, consumed once through a
//! push-style visitor that receives a [`Scanner`] per entry, and closed by
//! the caller afterwards on every exit path.
//!
//! # Example
//!
//! ```rust
//! use vfs_contract::{AttrsMut, DirEntList, EntryList, ReadDirOptions, ResourceInfo};
//!
//! let entries = vec![
//!     ResourceInfo { name: ".".into(), ..Default::default() },
//!     ResourceInfo { name: "a.txt".into(), size: 3, ..Default::default() },
//! ];
//! let mut list = EntryList::new(entries, &ReadDirOptions::default());
//! assert_eq!(list.size(), 1);
//!
//! let mut names = Vec::new();
//! let result = list.for_each(&mut |scanner| {
//!     let mut info = ResourceInfo::default();
//!     scanner.scan(AttrsMut::new(&mut info))?;
//!     names.push(info.name);
//!     Ok(())
//! });
//! list.close().unwrap();
//! result.unwrap();
//! assert_eq!(names, ["a.txt"]);
//! ```

use std::fmt;

use crate::{AttrKind, AttrsMut, AttrsTarget, ReadDirOptions, ResourceInfo, VfsError};

/// A cursor bound to exactly one directory entry.
pub trait Scanner {
    /// Decode the entry into `dest`.
    ///
    /// # Errors
    ///
    /// - [`VfsError::UnsupportedAttributes`] if `dest` has an unrecognized shape
    fn scan(&self, dest: AttrsMut<'_>) -> Result<(), VfsError>;
}

/// Visitor invoked once per entry. Returning an error aborts the enumeration.
pub type Visitor<'v> = dyn FnMut(&dyn Scanner) -> Result<(), VfsError> + 'v;

/// A finite, sized, single-pass listing of directory entries.
///
/// Lists never contain the self-referential `.` and `..` entries.
pub trait DirEntList: Send {
    /// Number of entries the list will visit.
    fn size(&self) -> u64;

    /// Visit every entry in listing order.
    ///
    /// Stops at the first visitor error and returns it. A second call
    /// visits nothing.
    fn for_each(&mut self, each: &mut Visitor<'_>) -> Result<(), VfsError>;

    /// Release backend resources held by the listing.
    fn close(&mut self) -> Result<(), VfsError>;
}

type Release = Box<dyn FnOnce() -> Result<(), VfsError> + Send>;

/// A listing over already-decoded [`ResourceInfo`] records.
///
/// Backends whose native listing returns every entry at once build one of
/// these; an optional release hook runs exactly once on [`close`](DirEntList::close).
pub struct EntryList {
    entries: Vec<ResourceInfo>,
    size: u64,
    release: Option<Release>,
}

impl EntryList {
    /// Build a list, dropping `.` and `..` and applying `options`.
    pub fn new(entries: impl IntoIterator<Item = ResourceInfo>, options: &ReadDirOptions) -> Self {
        let mut entries: Vec<ResourceInfo> = entries
            .into_iter()
            .filter(|e| !is_self_reference(&e.name))
            .collect();
        if options.sort_by_name {
            entries.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Self {
            size: entries.len() as u64,
            entries,
            release: None,
        }
    }

    /// Run `release` when the list is closed.
    pub fn with_release<F>(mut self, release: F) -> Self
    where
        F: FnOnce() -> Result<(), VfsError> + Send + 'static,
    {
        self.release = Some(Box::new(release));
        self
    }
}

impl DirEntList for EntryList {
    fn size(&self) -> u64 {
        self.size
    }

    fn for_each(&mut self, each: &mut Visitor<'_>) -> Result<(), VfsError> {
        for info in std::mem::take(&mut self.entries) {
            each(&InfoScanner(&info))?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), VfsError> {
        self.entries.clear();
        match self.release.take() {
            Some(release) => release(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for EntryList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryList")
            .field("size", &self.size)
            .field("pending", &self.entries.len())
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// A scanner over a decoded [`ResourceInfo`].
#[derive(Debug, Clone, Copy)]
pub struct InfoScanner<'a>(pub &'a ResourceInfo);

impl Scanner for InfoScanner<'_> {
    fn scan(&self, dest: AttrsMut<'_>) -> Result<(), VfsError> {
        match dest.negotiate(&[AttrKind::ResourceInfo])? {
            AttrsTarget::ResourceInfo(out) => out.clone_from(self.0),
        }
        Ok(())
    }
}

/// Returns `true` for `.` and `..`.
pub fn is_self_reference(name: &str) -> bool {
    name == "." || name == ".."
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VfsPath;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn info(name: &str) -> ResourceInfo {
        ResourceInfo {
            name: name.into(),
            ..Default::default()
        }
    }

    fn names(list: &mut EntryList) -> Vec<String> {
        let mut out = Vec::new();
        list.for_each(&mut |scanner| {
            let mut i = ResourceInfo::default();
            scanner.scan(AttrsMut::new(&mut i))?;
            out.push(i.name);
            Ok(())
        })
        .unwrap();
        out
    }

    #[test]
    fn self_references_are_filtered() {
        let mut list = EntryList::new(
            [info("."), info("b"), info(".."), info("a")],
            &ReadDirOptions::default(),
        );
        assert_eq!(list.size(), 2);
        assert_eq!(names(&mut list), ["b", "a"]);
    }

    #[test]
    fn sorted_option_orders_by_name() {
        let mut list = EntryList::new([info("c"), info("a"), info("b")], &ReadDirOptions::SORTED);
        assert_eq!(names(&mut list), ["a", "b", "c"]);
    }

    #[test]
    fn visitor_error_aborts_and_propagates() {
        let mut list = EntryList::new([info("a"), info("b"), info("c")], &ReadDirOptions::default());
        let mut visited = 0;
        let result = list.for_each(&mut |_| {
            visited += 1;
            if visited == 2 {
                return Err(VfsError::not_found(VfsPath::new("/stop")));
            }
            Ok(())
        });
        assert!(result.unwrap_err().is_not_found());
        assert_eq!(visited, 2);
    }

    #[test]
    fn lists_are_single_pass() {
        let mut list = EntryList::new([info("a")], &ReadDirOptions::default());
        assert_eq!(names(&mut list).len(), 1);
        assert!(names(&mut list).is_empty());
        assert_eq!(list.size(), 1);
    }

    #[test]
    fn release_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut list = EntryList::new([info("a")], &ReadDirOptions::default()).with_release(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        list.close().unwrap();
        list.close().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn scanner_rejects_unknown_shapes() {
        let entry = info("a");
        let scanner = InfoScanner(&entry);
        let mut s = "hello world";
        let err = scanner.scan(AttrsMut::new(&mut s)).unwrap_err();
        assert!(err.unsupported_attributes().is_some());
    }

    #[test]
    fn entry_list_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<EntryList>();
    }
}
