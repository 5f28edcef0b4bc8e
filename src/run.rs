//! Sorted runs stored on the file system.
//!
//! A run is written once by the chunking phase and then read sequentially from its start by the merge phase.
//! Run files are named `run_0`, `run_1`, ... inside the run directory so they can be located by index alone.

use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use log;
use tempfile;

use crate::config::RunLocation;
use crate::value::{parse_record, Key, ParseError};

/// Run file prefix.
pub const RUN_FILE_PREFIX: &str = "run_";

/// Run level error.
#[derive(Debug)]
pub enum RunError {
    /// Common I/O error.
    IO(io::Error),
    /// Value serialization error.
    SerializationError(rmp_serde::encode::Error),
    /// Value deserialization error.
    DeserializationError(rmp_serde::decode::Error),
    /// Text value parsing error.
    ParseError(ParseError),
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(match &self {
            RunError::IO(err) => err,
            RunError::SerializationError(err) => err,
            RunError::DeserializationError(err) => err,
            RunError::ParseError(err) => err,
        })
    }
}

impl Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            RunError::IO(err) => write!(f, "I/O operation failed: {}", err),
            RunError::SerializationError(err) => write!(f, "value serialization error: {}", err),
            RunError::DeserializationError(err) => write!(f, "value deserialization error: {}", err),
            RunError::ParseError(err) => write!(f, "value parsing error: {}", err),
        }
    }
}

impl From<io::Error> for RunError {
    fn from(err: io::Error) -> Self {
        RunError::IO(err)
    }
}

/// Run serialization format.
pub trait RunFormat: Clone + Send + Sync {
    /// Writes a single value.
    fn write_value<W: Write>(&self, writer: &mut W, value: f64) -> Result<(), RunError>;

    /// Reads the value at `position` (0-based). Returns `Ok(None)` at the end of the run.
    fn read_value<R: BufRead>(&self, reader: &mut R, position: u64) -> Result<Option<f64>, RunError>;
}

/// Plain text format: one value per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRunFormat;

impl RunFormat for TextRunFormat {
    fn write_value<W: Write>(&self, writer: &mut W, value: f64) -> Result<(), RunError> {
        writeln!(writer, "{}", Key(value))?;
        return Ok(());
    }

    fn read_value<R: BufRead>(&self, reader: &mut R, position: u64) -> Result<Option<f64>, RunError> {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }

        let value = parse_record(&line, position + 1).map_err(RunError::ParseError)?;
        return Ok(Some(value));
    }
}

/// RMP (Rust MessagePack) format. Each value is stored as a MessagePack float.
/// For more information see https://msgpack.org/.
#[derive(Debug, Clone, Copy, Default)]
pub struct RmpRunFormat;

impl RunFormat for RmpRunFormat {
    fn write_value<W: Write>(&self, writer: &mut W, value: f64) -> Result<(), RunError> {
        rmp_serde::encode::write(writer, &Key(value)).map_err(RunError::SerializationError)
    }

    fn read_value<R: BufRead>(&self, reader: &mut R, _position: u64) -> Result<Option<f64>, RunError> {
        if reader.fill_buf()?.is_empty() {
            return Ok(None);
        }

        let key: Key = rmp_serde::decode::from_read(&mut *reader).map_err(RunError::DeserializationError)?;
        return Ok(Some(key.value()));
    }
}

/// Persisted run handle.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    /// Run index, `0..k-1`.
    pub index: usize,
    /// Run file path.
    pub path: PathBuf,
    /// Number of values in the run.
    pub len: u64,
}

/// Run file storage.
pub struct RunStore {
    root: PathBuf,
    rw_buf_size: Option<usize>,
    // keeps a temporary directory alive while the store is in use
    _tmp_dir: Option<tempfile::TempDir>,
}

impl RunStore {
    /// Opens the storage area, creating it if needed. Opening an existing directory is not an error.
    pub fn open(location: &RunLocation, rw_buf_size: Option<usize>) -> io::Result<Self> {
        let store = match location {
            RunLocation::Dir(path) => {
                fs::create_dir_all(path)?;
                RunStore {
                    root: path.clone(),
                    rw_buf_size,
                    _tmp_dir: None,
                }
            }
            RunLocation::Temp(parent) => {
                let tmp_dir = if let Some(parent) = parent {
                    tempfile::tempdir_in(parent)
                } else {
                    tempfile::tempdir()
                }?;
                RunStore {
                    root: tmp_dir.path().to_path_buf(),
                    rw_buf_size,
                    _tmp_dir: Some(tmp_dir),
                }
            }
        };

        log::info!("using {} as a run directory", store.root.display());

        return Ok(store);
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Returns the file path of the run with the given index.
    pub fn run_path(&self, index: usize) -> PathBuf {
        self.root.join(format!("{}{}", RUN_FILE_PREFIX, index))
    }

    /// Writes sorted values as the run with the given index. An existing run file with the same index is replaced.
    pub fn write_run<F: RunFormat>(&self, index: usize, values: &[f64], format: &F) -> Result<Run, RunError> {
        let path = self.run_path(index);
        let file = fs::File::create(&path)?;

        let mut writer = match self.rw_buf_size {
            Some(buf_size) => io::BufWriter::with_capacity(buf_size, file),
            None => io::BufWriter::new(file),
        };

        for value in values {
            format.write_value(&mut writer, *value)?;
        }
        writer.flush()?;

        return Ok(Run {
            index,
            path,
            len: values.len() as u64,
        });
    }

    /// Opens a run for sequential reading from its start.
    pub fn open_run<F: RunFormat>(&self, run: &Run, format: F) -> io::Result<RunCursor<F>> {
        let file = fs::File::open(&run.path)?;
        let reader = match self.rw_buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, file),
            None => io::BufReader::new(file),
        };

        return Ok(RunCursor {
            reader,
            format,
            position: 0,
        });
    }

    /// Deletes a run file.
    pub fn remove_run(&self, run: &Run) -> io::Result<()> {
        fs::remove_file(&run.path)
    }
}

/// Sequential read position in a run.
pub struct RunCursor<F> {
    reader: io::BufReader<fs::File>,
    format: F,
    position: u64,
}

impl<F: RunFormat> RunCursor<F> {
    /// Reads the next value. Returns `Ok(None)` once the run is exhausted.
    pub fn next_value(&mut self) -> Result<Option<f64>, RunError> {
        let value = self.format.read_value(&mut self.reader, self.position)?;
        if value.is_some() {
            self.position += 1;
        }
        return Ok(value);
    }

    /// Number of values consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl<F: RunFormat> Iterator for RunCursor<F> {
    type Item = Result<f64, RunError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_value().transpose()
    }
}
