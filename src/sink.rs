//! Lock-guarded output shared by workers.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use parking_lot::Mutex;

/// A single output resource appended to by many workers under one lock.
///
/// Appends are mutually exclusive but not ordered across workers.
pub struct SharedSink<W = File> {
    writer: Mutex<W>,
    lines: AtomicUsize,
}

impl SharedSink<File> {
    /// Open the sink for a run: `path` if given, else an anonymous scratch
    /// file that disappears with the process.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)
                .with_context(|| format!("failed to open sink {}", path.display()))?,
            None => tempfile::tempfile().context("failed to create scratch sink")?,
        };
        Ok(Self::new(file))
    }
}

impl SharedSink<Cursor<Vec<u8>>> {
    pub fn in_memory() -> Self {
        Self::new(Cursor::new(Vec::new()))
    }

    /// Everything appended so far.
    pub fn contents(&self) -> Vec<u8> {
        self.writer.lock().get_ref().clone()
    }
}

impl<W> SharedSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            lines: AtomicUsize::new(0),
        }
    }

    /// Lines appended so far.
    pub fn lines(&self) -> usize {
        self.lines.load(Ordering::Relaxed)
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write> SharedSink<W> {
    /// Append one line. The line is formatted before the lock is taken, so
    /// the lock covers exactly one write.
    pub fn append(&self, record: impl fmt::Display) -> io::Result<()> {
        let line = format!("{record}\n");
        self.writer.lock().write_all(line.as_bytes())?;
        self.lines.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn flush(&self) -> io::Result<()> {
        self.writer.lock().flush()
    }
}

impl<W: Read + Write + Seek> SharedSink<W> {
    /// Flush and copy the whole sink to `out`, leaving the write position
    /// where it was. Only meant to run after every worker has joined.
    pub fn dump<O: Write>(&self, out: &mut O) -> io::Result<u64> {
        let mut writer = self.writer.lock();
        writer.flush()?;
        let position = writer.stream_position()?;
        writer.seek(SeekFrom::Start(0))?;
        let copied = io::copy(&mut *writer, out)?;
        writer.seek(SeekFrom::Start(position))?;
        Ok(copied)
    }
}

/// One bounded CPU kernel result as recorded in the sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkRecord {
    pub slot: usize,
    pub iterations: u64,
    pub value: f64,
}

impl fmt::Display for SinkRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slot={} iterations={} value={:.15}",
            self.slot, self.iterations, self.value
        )
    }
}
