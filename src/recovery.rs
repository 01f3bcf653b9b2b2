//! Bounded, backend-local recovery strategies.
//!
//! These are the only places the contract layer absorbs a failure: a
//! not-found during delete, and a not-found during single-shot directory
//! creation. Neither is a general retry policy.

use tracing::debug;

use crate::{VfsError, VfsPath};

/// Treat [`VfsError::NotFound`] as success.
pub fn tolerate_not_found(result: Result<(), VfsError>) -> Result<(), VfsError> {
    match result {
        Err(e) if e.is_not_found() => Ok(()),
        other => other,
    }
}

/// Create `path` and its missing ancestors with single-directory primitives.
///
/// `make_dir` is first tried on the full path. If it reports
/// [`VfsError::NotFound`] (an intermediate directory is missing), each
/// ancestor is then created in order from the top, skipping those that
/// `is_dir` reports present and stopping at the first hard failure.
/// `is_dir` must fail for a segment that exists but is not a directory.
///
/// `target` is handed to both callbacks, so they can share one session.
///
/// The probe and the creation are separate steps: a concurrent writer may
/// create or remove a segment in between.
pub fn mkdirs_optimistic<T: ?Sized>(
    target: &mut T,
    path: &VfsPath,
    mut is_dir: impl FnMut(&mut T, &VfsPath) -> Result<bool, VfsError>,
    mut make_dir: impl FnMut(&mut T, &VfsPath) -> Result<(), VfsError>,
) -> Result<(), VfsError> {
    let path = path.normalize();
    if path.is_root() {
        return Ok(());
    }
    match make_dir(target, &path) {
        Err(e) if e.is_not_found() => {
            debug!(path = %path, "single-shot mkdir failed, creating segment by segment");
        }
        other => return other,
    }

    let mut current = VfsPath::root();
    for name in path.names() {
        current = current.child(name);
        if !is_dir(target, &current)? {
            make_dir(target, &current)?;
        }
    }
    Ok(())
}
