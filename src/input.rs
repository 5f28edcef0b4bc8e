//! Input value stream.

use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::io;
use std::io::prelude::*;

use crate::value::{parse_record, ParseError};

/// Input data stream error.
#[derive(Debug)]
pub enum InputError {
    /// Reading from the underlying stream failed.
    IO(io::Error),
    /// A record is not a number.
    Parse(ParseError),
}

impl Error for InputError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(match &self {
            InputError::IO(err) => err,
            InputError::Parse(err) => err,
        })
    }
}

impl Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            InputError::IO(err) => write!(f, "input read failed: {}", err),
            InputError::Parse(err) => write!(f, "input parse failed: {}", err),
        }
    }
}

/// Reads one value per line from a buffered reader.
///
/// Iteration ends when the reader reaches end-of-stream. A malformed record yields an error.
pub struct ValueReader<R> {
    reader: R,
    line: String,
    line_no: u64,
}

impl<R: BufRead> ValueReader<R> {
    pub fn new(reader: R) -> Self {
        ValueReader {
            reader,
            line: String::new(),
            line_no: 0,
        }
    }

    /// Reads the next value. Returns `Ok(None)` at end-of-stream.
    pub fn next_value(&mut self) -> Result<Option<f64>, InputError> {
        self.line.clear();
        let read = self.reader.read_line(&mut self.line).map_err(InputError::IO)?;
        if read == 0 {
            return Ok(None);
        }
        self.line_no += 1;

        let value = parse_record(&self.line, self.line_no).map_err(InputError::Parse)?;
        return Ok(Some(value));
    }

    /// Number of records consumed so far.
    pub fn lines_read(&self) -> u64 {
        self.line_no
    }
}

impl<R: BufRead> Iterator for ValueReader<R> {
    type Item = Result<f64, InputError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_value().transpose()
    }
}
