//! The canonical checks.

use std::io::Write;

use super::{Check, CheckContext, CheckError};
use crate::{AttrsMut, AttrsRef, DataProvider, ReadDirOptions, ResourceInfo, VfsError, VfsPath};

/// Payload sizes spanning common buffer boundaries.
const LENGTHS: [usize; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 512, 1024, 4096, 4097, 8192, 8193];

/// A shape no backend recognizes: a struct with nothing but private state.
struct Opaque {
    _hidden: String,
}

fn opaque() -> Opaque {
    Opaque {
        _hidden: String::new(),
    }
}

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| i as u8).collect()
}

fn targets(dirs: [&str; 5]) -> impl Iterator<Item = (VfsPath, Vec<u8>)> {
    dirs.into_iter().flat_map(|dir| {
        LENGTHS
            .into_iter()
            .map(move |len| (VfsPath::new(dir).child(&format!("{len}.bin")), payload(len)))
    })
}

fn expect_unsupported_attributes(what: &str, result: Result<(), VfsError>) -> Result<(), CheckError> {
    match result {
        Ok(()) => Err(CheckError::violation(format!(
            "{what}: an unrecognized shape must be rejected"
        ))),
        Err(e) if e.unsupported_attributes().is_some() => Ok(()),
        Err(e) => Err(CheckError::violation(format!(
            "{what}: expected unsupported attributes but got: {e}"
        ))),
    }
}

/// The root is empty, or can be emptied by deleting every top-level entry.
pub const EMPTY: Check = Check {
    name: "Empty",
    description: "Checks the corner case of an empty provider",
    test: check_empty,
};

fn check_empty(dp: &dyn DataProvider, ctx: &CheckContext<'_>) -> Result<(), CheckError> {
    let root = VfsPath::root();
    let entries = ctx.read_dir_infos(&root)?;
    if entries.is_empty() {
        return Ok(());
    }
    for entry in entries {
        dp.delete(&root.child(&entry.name))?;
    }
    let left = ctx.read_dir_infos(&root)?;
    if !left.is_empty() {
        return Err(CheckError::violation(format!(
            "provider is not empty and cannot be cleared: {} entries left",
            left.len()
        )));
    }
    Ok(())
}

/// Writes in root, nested and non-normalized paths commit every byte.
pub const WRITE_ANY: Check = Check {
    name: "Write any",
    description: "Writes files of various lengths in various paths",
    test: check_write_any,
};

fn check_write_any(dp: &dyn DataProvider, _ctx: &CheckContext<'_>) -> Result<(), CheckError> {
    let dirs = ["", "/", "/canWrite0", "/canWrite0/subfolder", "canWrite0_1/subfolder1/subfolder2"];
    for (path, data) in targets(dirs) {
        let mut writer = dp.write(&path)?;
        writer
            .write_all(&data)
            .map_err(|e| VfsError::io("write", path.clone(), e))?;
        let committed = writer.close()?;
        if committed != data.len() as u64 {
            return Err(CheckError::violation(format!(
                "{path}: expected to write {} bytes but wrote {committed}",
                data.len()
            )));
        }
    }
    Ok(())
}

/// Every non-directory entry of a recursive listing reads back at its size.
pub const READ_ANY: Check = Check {
    name: "Read any",
    description: "Asserts that something exists and everything can be read",
    test: check_read_any,
};

fn check_read_any(_dp: &dyn DataProvider, ctx: &CheckContext<'_>) -> Result<(), CheckError> {
    let resources = ctx.read_dir_recursive(&VfsPath::root())?;
    if resources.is_empty() {
        return Err(CheckError::violation("expected at least 1 file"));
    }
    for resource in resources.iter().filter(|r| !r.info.is_dir()) {
        let data = ctx.read_all(&resource.path)?;
        if data.len() as u64 != resource.info.size {
            return Err(CheckError::violation(format!(
                "{}: listed with {} bytes but read {}",
                resource.path,
                resource.info.size,
                data.len()
            )));
        }
    }
    Ok(())
}

/// Bytes written are the bytes read back.
pub const WRITE_AND_READ: Check = Check {
    name: "Write and Read",
    description: "Writes files and reads them again",
    test: check_write_and_read,
};

fn check_write_and_read(_dp: &dyn DataProvider, ctx: &CheckContext<'_>) -> Result<(), CheckError> {
    let dirs = ["", "/", "/canWrite1", "/canWrite1/subfolder", "canWrite1_1/subfolder1/subfolder2"];
    for (path, data) in targets(dirs) {
        let committed = ctx.write_all(&path, &data)?;
        if committed != data.len() as u64 {
            return Err(CheckError::violation(format!(
                "{path}: expected to write {} bytes but wrote {committed}",
                data.len()
            )));
        }
        let read = ctx.read_all(&path)?;
        if read != data {
            return Err(CheckError::violation(format!(
                "{path}: wrote {} bytes but read back {} different ones",
                data.len(),
                read.len()
            )));
        }
    }
    Ok(())
}

/// Rename fails for a missing source and overwrites an existing target.
pub const RENAME: Check = Check {
    name: "Rename",
    description: "Renames and their corner cases",
    test: check_rename,
};

fn expect_gone(ctx: &CheckContext<'_>, path: &VfsPath) -> Result<(), CheckError> {
    match ctx.stat(path) {
        Ok(_) => Err(CheckError::violation(format!("{path} must no longer resolve"))),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn expect_size(ctx: &CheckContext<'_>, path: &VfsPath, size: u64) -> Result<(), CheckError> {
    let info = ctx.stat(path)?;
    if info.size != size {
        return Err(CheckError::violation(format!(
            "{path} must be {size} bytes long but is {}",
            info.size
        )));
    }
    Ok(())
}

fn check_rename(dp: &dyn DataProvider, ctx: &CheckContext<'_>) -> Result<(), CheckError> {
    let (a, b, c) = (VfsPath::new("/a.bin"), VfsPath::new("/b.bin"), VfsPath::new("/c.bin"));

    dp.delete(&a)?;
    ctx.delete(&b)?;
    if ctx.rename(&a, &b).is_ok() {
        return Err(CheckError::violation("renaming a missing source must fail"));
    }

    ctx.write_all(&a, &payload(7))?;
    dp.rename(&a, &b)?;
    expect_gone(ctx, &a)?;
    expect_size(ctx, &b, 7)?;

    ctx.write_all(&c, &payload(13))?;
    dp.rename(&b, &c)?;
    expect_gone(ctx, &b)?;
    expect_size(ctx, &c, 7)
}

/// Unrecognized attribute shapes fail distinguishably, through the provider
/// and through listing scanners.
pub const ATTRIBUTES: Check = Check {
    name: "Attributes",
    description: "Reads and writes supported and unsupported attribute shapes",
    test: check_attributes,
};

fn check_attributes(dp: &dyn DataProvider, ctx: &CheckContext<'_>) -> Result<(), CheckError> {
    let c = VfsPath::new("/c.bin");
    ctx.write_all(&c, &payload(13))?;

    let mut info = ResourceInfo::default();
    dp.read_attrs(&c, AttrsMut::new(&mut info))?;
    expect_unsupported_attributes("read_attrs", dp.read_attrs(&c, AttrsMut::new(&mut opaque())))?;
    expect_unsupported_attributes(
        "read_attrs",
        ctx.read_attrs(&c, AttrsMut::new(&mut "hello world")),
    )?;

    let mut explicit = dp.read_dir(&VfsPath::root(), &ReadDirOptions::default())?;
    explicit.close()?;

    let mut list = ctx.read_dir(&VfsPath::root())?;
    let mut count = 0u64;
    let mut violation = None;
    let visited = list.for_each(&mut |scanner| {
        let mut info = ResourceInfo::default();
        scanner.scan(AttrsMut::new(&mut info))?;
        let outcome =
            expect_unsupported_attributes("scan", scanner.scan(AttrsMut::new(&mut opaque())))
                .and_then(|()| {
                    let text = scanner.scan(AttrsMut::new(&mut "hello world"));
                    expect_unsupported_attributes("scan", text)
                });
        if let Err(e) = outcome {
            violation.get_or_insert(e);
        }
        count += 1;
        Ok(())
    });
    let size = list.size();
    let closed = list.close();
    visited?;
    closed?;
    if let Some(e) = violation {
        return Err(e);
    }
    if count == 0 {
        return Err(CheckError::violation("expected at least 1 entry to scan"));
    }
    if count != size {
        return Err(CheckError::violation(format!(
            "listing reported {size} entries but visited {count}"
        )));
    }

    match dp.write_attrs(&c, AttrsRef::new(&opaque())) {
        Ok(()) => {
            return Err(CheckError::violation(
                "write_attrs: an unrecognized shape must be rejected",
            ));
        }
        Err(e) if e.unsupported_attributes().is_some() || e.is_unsupported_operation() => {}
        Err(e) => {
            return Err(CheckError::violation(format!(
                "write_attrs: expected unsupported attributes or operation but got: {e}"
            )));
        }
    }

    match dp.write_attrs(&c, AttrsRef::new(&info)) {
        Ok(()) => Ok(()),
        Err(e) if e.is_unsupported_operation() => Ok(()),
        Err(e) if e.unsupported_attributes().is_some() => Err(CheckError::violation(
            "write_attrs: ResourceInfo must be a recognized shape",
        )),
        Err(e) => Err(e.into()),
    }
}

/// Closing the provider succeeds.
pub const CLOSE: Check = Check {
    name: "Close",
    description: "Checks that close succeeds; some providers stay usable afterwards",
    test: check_close,
};

fn check_close(dp: &dyn DataProvider, _ctx: &CheckContext<'_>) -> Result<(), CheckError> {
    dp.close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_cover_every_dir_and_length() {
        let all: Vec<_> = targets(["", "/", "/x", "/x/y", "z"]).collect();
        assert_eq!(all.len(), 5 * LENGTHS.len());
        assert_eq!(all[0].0, VfsPath::new("/0.bin"));
        assert_eq!(all.last().unwrap().0, VfsPath::new("/z/8193.bin"));
        assert_eq!(all.last().unwrap().1.len(), 8193);
        assert_eq!(all[1].1, [0u8]);
    }

    #[test]
    fn payload_counts_up_and_wraps() {
        let p = payload(258);
        assert_eq!(&p[..3], [0, 1, 2]);
        assert_eq!(p[256], 0);
        assert_eq!(p[257], 1);
    }
}
