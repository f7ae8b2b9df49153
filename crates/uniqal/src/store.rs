//! Durable append-only storage for accepted values.
//!
//! A store is a sequence of lines, one value per line. The [`Writer`] is the
//! only caller of [`Store::append`]; stores themselves do not deduplicate.
//!
//! [`Writer`]: crate::Writer

use crate::{Result, Value};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An append-only sink for accepted values.
pub trait Store {
    /// Appends `values` in order, one per line.
    ///
    /// Implementations may buffer; [`Store::flush`] pushes buffered lines to
    /// the underlying medium.
    fn append(&mut self, values: &[Value]) -> Result<()>;

    /// Flushes buffered lines. No durability barrier is implied.
    fn flush(&mut self) -> Result<()>;
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn append(&mut self, values: &[Value]) -> Result<()> {
        (**self).append(values)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// A text file opened in append mode.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    out: BufWriter<File>,
}

impl FileStore {
    /// Opens (or creates) `path` for appending.
    ///
    /// If the file is non-empty and its last byte is not a newline, a newline
    /// is written first so the next value starts on its own line.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Store`] if the file cannot be opened or
    /// inspected.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;

        let needs_newline = ends_without_newline(&mut file)?;
        let mut out = BufWriter::new(file);
        if needs_newline {
            out.write_all(b"\n")?;
            out.flush()?;
        }

        Ok(Self { path, out })
    }

    /// Reads every non-empty line of `path` into a set.
    ///
    /// A missing file yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Store`] on any I/O failure other than the file
    /// not existing.
    pub fn load(path: impl AsRef<Path>) -> Result<HashSet<Value>> {
        let file = match File::open(path.as_ref()) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(e.into()),
        };

        let mut values = HashSet::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if !line.is_empty() {
                values.insert(line.to_owned());
            }
        }
        Ok(values)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn ends_without_newline(file: &mut File) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0_u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

impl Store for FileStore {
    fn append(&mut self, values: &[Value]) -> Result<()> {
        for value in values {
            self.out.write_all(value.as_bytes())?;
            self.out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// In-memory store for tests and dry runs.
///
/// Clones share the same lines, so a handle kept outside the writer can
/// observe what was appended.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    lines: Arc<Mutex<Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `lines`, as if loaded from disk.
    pub fn with_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Self {
            lines: Arc::new(Mutex::new(lines.into_iter().collect())),
        }
    }

    /// Returns a copy of every line in append order.
    pub fn lines(&self) -> Vec<Value> {
        self.lines.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl Store for MemoryStore {
    fn append(&mut self, values: &[Value]) -> Result<()> {
        self.lines.lock().extend_from_slice(values);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
