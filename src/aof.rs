use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{error, warn};

use crate::frame::{self, Frame};

/// How aggressively appended records are forced to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendFsync {
    /// Fsync after every append (safest, slowest).
    Always,
    /// Fsync at most once per second, from a repeating timer.
    EverySec,
    /// Never fsync; leave it to the operating system.
    No,
}

struct AofInner {
    file: File,
    pending_flush: bool,
}

/// Append-only log of mutating commands.
///
/// The file is a plain concatenation of serialized array frames, each one
/// a complete request as it was received, replayed byte-exact on startup.
/// The mutex serializes `append` against the flush timer; the server is
/// effectively single-threaded around the engine lock, so it is
/// uncontended in practice.
pub struct Aof {
    path: PathBuf,
    policy: AppendFsync,
    inner: Mutex<AofInner>,
}

impl Aof {
    pub fn new(path: impl Into<PathBuf>, policy: AppendFsync) -> io::Result<Aof> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Aof {
            path,
            policy,
            inner: Mutex::new(AofInner {
                file,
                pending_flush: false,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one serialized record. Write failures are logged and
    /// swallowed; losing a record must not take down the serving loop.
    pub fn append(&self, frame: &Frame) {
        let bytes = frame.serialize();
        let mut inner = self.inner.lock().unwrap();

        if let Err(err) = inner.file.write_all(&bytes) {
            error!(path = %self.path.display(), "append-only file write failed: {err}");
            return;
        }

        match self.policy {
            AppendFsync::Always => {
                if let Err(err) = inner.file.sync_data() {
                    error!(path = %self.path.display(), "append-only file sync failed: {err}");
                }
            }
            AppendFsync::EverySec | AppendFsync::No => inner.pending_flush = true,
        }
    }

    /// Syncs outstanding writes if any record was appended since the last
    /// sync. Wired to a 1 s repeating timer under the `EverySec` policy.
    pub fn flush_if_pending(&self) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.pending_flush {
            return;
        }
        match inner.file.sync_data() {
            Ok(()) => inner.pending_flush = false,
            Err(err) => {
                error!(path = %self.path.display(), "append-only file sync failed: {err}")
            }
        }
    }

    /// Unconditional sync, used on shutdown regardless of policy.
    pub fn flush(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Err(err) = inner.file.sync_data() {
            error!(path = %self.path.display(), "append-only file sync failed: {err}");
        }
        inner.pending_flush = false;
    }

    /// Reads the whole log back as the sequence of commands it records.
    ///
    /// A final record that parses as `Incomplete` is treated as the tail
    /// of a crashed write and discarded with a warning; any other parse
    /// failure means the file is corrupt and startup must abort.
    pub fn replay(path: impl AsRef<Path>) -> crate::Result<Vec<Frame>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let data = std::fs::read(path)?;
        let mut cursor = Cursor::new(&data[..]);
        let mut frames = Vec::new();

        while (cursor.position() as usize) < data.len() {
            match Frame::parse(&mut cursor) {
                Ok(frame) => frames.push(frame),
                Err(frame::Error::Incomplete) => {
                    warn!(
                        path = %path.display(),
                        offset = cursor.position(),
                        "append-only file ends with a truncated record, discarding the tail"
                    );
                    break;
                }
                Err(err) => {
                    return Err(format!(
                        "corrupt append-only file {} at offset {}: {}",
                        path.display(),
                        cursor.position(),
                        err
                    )
                    .into())
                }
            }
        }

        Ok(frames)
    }
}

impl Drop for Aof {
    fn drop(&mut self) {
        self.flush();
    }
}
