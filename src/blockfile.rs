//! Buffered, optionally gzip-compressed block file shared across threads.
//!
//! Generalizes the buffered-writer idiom of `streaming::output::BedWriter`
//! (a `BufWriter` plus reusable formatting buffers) to a writer whose
//! underlying OS stream may be shared by several thread-local clones. The
//! first constructed instance (the "primer") is responsible for closing
//! the stream; clones hold only their own write buffer and a shared handle
//! to the same sink, guarded by a mutex so concurrent flushes serialize
//! instead of interleaving mid-record.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{OutputError, Result};

const DEFAULT_BASE_BLOCK: usize = 2 * 1024 * 1024;
const DEFAULT_BLOCK_MULTIPLIER: usize = 32;

enum Sink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<File>),
}

impl Sink {
    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        match self {
            Sink::Plain(w) => w.write_all(bytes),
            Sink::Gzip(w) => w.write_all(bytes),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Sink::Plain(w) => w.flush(),
            Sink::Gzip(w) => w.flush(),
        }
    }
}

/// A buffered writer over a possibly-shared, possibly-gzipped stream.
pub struct BlockFile {
    sink: Arc<Mutex<Sink>>,
    buffer: Vec<u8>,
    cursor: usize,
    path: PathBuf,
    is_primer: bool,
    records: u64,
}

impl BlockFile {
    /// Opens `path` for writing, creating or truncating it. `zipped`
    /// selects a gzip-wrapped sink; the resulting instance is the primer.
    pub fn create(path: impl AsRef<Path>, zipped: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| OutputError::OpenFailure {
            path: path.clone(),
            source,
        })?;
        let sink = if zipped {
            Sink::Gzip(GzEncoder::new(file, Compression::default()))
        } else {
            Sink::Plain(BufWriter::with_capacity(DEFAULT_BASE_BLOCK, file))
        };
        let buffer_size = if zipped {
            DEFAULT_BASE_BLOCK * DEFAULT_BLOCK_MULTIPLIER / 2
        } else {
            DEFAULT_BASE_BLOCK * DEFAULT_BLOCK_MULTIPLIER
        };
        Ok(Self {
            sink: Arc::new(Mutex::new(sink)),
            buffer: Vec::with_capacity(buffer_size),
            cursor: 0,
            path,
            is_primer: true,
            records: 0,
        })
    }

    /// Returns a clone sharing this instance's underlying stream but with
    /// its own buffer, staggered in size so concurrent flushes from
    /// different threads rarely land at the same moment.
    pub fn clone_for_thread(&self, thread_index: usize) -> Self {
        let base = self.buffer.capacity();
        let staggered = base + thread_index * 4096;
        Self {
            sink: Arc::clone(&self.sink),
            buffer: Vec::with_capacity(staggered),
            cursor: 0,
            path: self.path.clone(),
            is_primer: false,
            records: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record_count(&self) -> u64 {
        self.records
    }

    /// Appends `bytes` to the buffer, flushing first if it would not fit.
    /// Optionally appends a trailing newline.
    pub fn write_record(&mut self, bytes: &[u8], close_line: bool) -> Result<()> {
        let needed = bytes.len() + close_line as usize;
        if self.cursor + needed > self.buffer.capacity() && self.cursor > 0 {
            self.flush()?;
        }
        if self.buffer.len() < self.cursor + needed {
            self.buffer.resize(self.cursor + needed, 0);
        }
        self.buffer[self.cursor..self.cursor + bytes.len()].copy_from_slice(bytes);
        self.cursor += bytes.len();
        if close_line {
            self.buffer[self.cursor] = b'\n';
            self.cursor += 1;
        }
        self.records += 1;
        Ok(())
    }

    /// Flushes the current buffer to the shared stream under the stream's
    /// mutex, then resets the local cursor. A no-op when the buffer is
    /// empty.
    pub fn flush(&mut self) -> Result<()> {
        if self.cursor == 0 {
            return Ok(());
        }
        let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
        sink.write_all(&self.buffer[..self.cursor])
            .map_err(|source| OutputError::WriteFailure {
                path: self.path.clone(),
                source,
            })?;
        self.cursor = 0;
        Ok(())
    }

    /// Flushes the local buffer and, if this is the primer, flushes and
    /// closes the underlying stream.
    pub fn close(&mut self) -> Result<()> {
        self.flush()?;
        if self.is_primer {
            let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
            sink.flush().map_err(|source| OutputError::CloseFailure {
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

impl Drop for BlockFile {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            eprintln!("warning: failed to close {}: {e}", self.path.display());
        }
    }
}
