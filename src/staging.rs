//! Two-phase buffered commit for backends without streaming upload.
//!
//! A [`StagedWriter`] accumulates everything written into a scoped staging
//! buffer and publishes it in one call on [`close`](WriteStream::close).
//! If the publish reports [`VfsError::NotFound`], the writer asks the
//! backend to create the destination's parent and publishes exactly once more.

use std::fmt;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use tempfile::SpooledTempFile;
use tracing::{debug, warn};

use crate::{VfsError, VfsPath, WriteStream};

/// Spooled staging keeps payloads up to this size in memory.
pub const DEFAULT_SPOOL_THRESHOLD: usize = 4 * 1024 * 1024;

/// Where a [`StagedWriter`] keeps bytes until they are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StagingStrategy {
    /// A growable in-memory buffer.
    Memory,
    /// An anonymous temporary file, removed when the writer is dropped.
    TempFile,
    /// Memory until `threshold` bytes, then an anonymous temporary file.
    Spooled {
        /// Largest payload kept in memory.
        threshold: usize,
    },
}

impl Default for StagingStrategy {
    fn default() -> Self {
        Self::Spooled {
            threshold: DEFAULT_SPOOL_THRESHOLD,
        }
    }
}

/// The backend side of a staged commit.
pub trait Publish: Send {
    /// Store the complete payload at `path` in one operation.
    fn publish(&self, path: &VfsPath, data: &mut dyn Read) -> Result<(), VfsError>;

    /// Make sure the parent of `path` exists.
    fn prepare_parent(&self, path: &VfsPath) -> Result<(), VfsError>;
}

enum Staging {
    Memory(Cursor<Vec<u8>>),
    File(File),
    Spooled(SpooledTempFile),
}

impl Staging {
    fn open(strategy: StagingStrategy) -> io::Result<Self> {
        Ok(match strategy {
            StagingStrategy::Memory => Self::Memory(Cursor::new(Vec::new())),
            StagingStrategy::TempFile => Self::File(tempfile::tempfile()?),
            StagingStrategy::Spooled { threshold } => {
                Self::Spooled(tempfile::spooled_tempfile(threshold))
            }
        })
    }

    fn as_stream(&mut self) -> &mut dyn Stream {
        match self {
            Self::Memory(c) => c,
            Self::File(f) => f,
            Self::Spooled(s) => s,
        }
    }
}

trait Stream: Read + Write + Seek {}

impl<T: Read + Write + Seek> Stream for T {}

/// A [`WriteStream`] that stages bytes locally and publishes on close.
pub struct StagedWriter<P: Publish> {
    path: VfsPath,
    staging: Staging,
    written: u64,
    publisher: P,
}

impl<P: Publish> StagedWriter<P> {
    /// Open a staging buffer for `path`.
    ///
    /// # Errors
    ///
    /// A [`VfsError::Backend`] if a temporary file cannot be created.
    pub fn new(path: VfsPath, strategy: StagingStrategy, publisher: P) -> Result<Self, VfsError> {
        let staging = Staging::open(strategy).map_err(|e| VfsError::io("stage", path.clone(), e))?;
        Ok(Self {
            path,
            staging,
            written: 0,
            publisher,
        })
    }

    /// Bytes staged so far.
    pub fn staged(&self) -> u64 {
        self.written
    }

    fn rewind(&mut self) -> Result<(), VfsError> {
        self.staging
            .as_stream()
            .seek(SeekFrom::Start(0))
            .map(|_| ())
            .map_err(|e| VfsError::io("stage", self.path.clone(), e))
    }

    fn publish_once(&mut self) -> Result<(), VfsError> {
        self.rewind()?;
        let mut staged = self.staging.as_stream().take(self.written);
        self.publisher.publish(&self.path, &mut staged)
    }
}

impl<P: Publish> Write for StagedWriter<P> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.staging.as_stream().write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.staging.as_stream().flush()
    }
}

impl<P: Publish> WriteStream for StagedWriter<P> {
    fn close(mut self: Box<Self>) -> Result<u64, VfsError> {
        debug!(path = %self.path, bytes = self.written, "publishing staged write");
        match self.publish_once() {
            Err(e) if e.is_not_found() => {
                warn!(path = %self.path, "publish found no parent, creating it and retrying once");
                self.publisher.prepare_parent(&self.path)?;
                self.publish_once()?;
            }
            other => other?,
        }
        Ok(self.written)
    }
}

impl<P: Publish> fmt::Debug for StagedWriter<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagedWriter")
            .field("path", &self.path)
            .field("written", &self.written)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        published: Vec<(String, Vec<u8>)>,
        parent_ready: bool,
        prepared: usize,
        require_parent: bool,
    }

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Recorder>>);

    impl Publish for Shared {
        fn publish(&self, path: &VfsPath, data: &mut dyn Read) -> Result<(), VfsError> {
            let mut rec = self.0.lock().unwrap();
            if rec.require_parent && !rec.parent_ready {
                return Err(VfsError::not_found(path.parent()));
            }
            let mut buf = Vec::new();
            data.read_to_end(&mut buf).unwrap();
            rec.published.push((path.to_string(), buf));
            Ok(())
        }

        fn prepare_parent(&self, _path: &VfsPath) -> Result<(), VfsError> {
            let mut rec = self.0.lock().unwrap();
            rec.prepared += 1;
            rec.parent_ready = true;
            Ok(())
        }
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| i as u8).collect()
    }

    fn stage(strategy: StagingStrategy, shared: &Shared, data: &[u8]) -> u64 {
        let mut writer =
            Box::new(StagedWriter::new(VfsPath::new("/d/f.bin"), strategy, shared.clone()).unwrap());
        writer.write_all(data).unwrap();
        assert!(shared.0.lock().unwrap().published.is_empty());
        writer.close().unwrap()
    }

    #[test]
    fn nothing_is_published_before_close() {
        let shared = Shared::default();
        let n = stage(StagingStrategy::Memory, &shared, b"abc");
        assert_eq!(n, 3);
        let rec = shared.0.lock().unwrap();
        assert_eq!(rec.published, [("/d/f.bin".to_string(), b"abc".to_vec())]);
    }

    #[test]
    fn every_strategy_publishes_the_same_bytes() {
        let data = payload(8193);
        for strategy in [
            StagingStrategy::Memory,
            StagingStrategy::TempFile,
            StagingStrategy::Spooled { threshold: 1024 },
            StagingStrategy::default(),
        ] {
            let shared = Shared::default();
            assert_eq!(stage(strategy, &shared, &data), 8193);
            assert_eq!(shared.0.lock().unwrap().published[0].1, data, "{strategy:?}");
        }
    }

    #[test]
    fn empty_payload_is_published() {
        let shared = Shared::default();
        assert_eq!(stage(StagingStrategy::TempFile, &shared, &[]), 0);
        assert_eq!(shared.0.lock().unwrap().published[0].1, Vec::<u8>::new());
    }

    #[test]
    fn retries_once_after_preparing_parent() {
        let shared = Shared::default();
        shared.0.lock().unwrap().require_parent = true;
        stage(StagingStrategy::Memory, &shared, b"xyz");
        let rec = shared.0.lock().unwrap();
        assert_eq!(rec.prepared, 1);
        assert_eq!(rec.published[0].1, b"xyz");
    }

    #[test]
    fn drop_without_close_publishes_nothing() {
        let shared = Shared::default();
        {
            let mut writer =
                StagedWriter::new(VfsPath::new("/a"), StagingStrategy::Memory, shared.clone()).unwrap();
            writer.write_all(b"lost").unwrap();
            assert_eq!(writer.staged(), 4);
        }
        assert!(shared.0.lock().unwrap().published.is_empty());
    }
}
