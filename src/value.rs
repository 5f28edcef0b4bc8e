//! Totally ordered sort keys.

use std::cmp::Ordering;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::num::ParseFloatError;

/// Floating-point sort key.
///
/// Ordering follows IEEE-754 `totalOrder` (see [`f64::total_cmp`]), so every value including NaN and signed zeros
/// has a well defined position: `-NaN < -inf < ... < -0.0 < 0.0 < ... < inf < NaN`.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Key(pub f64);

impl Key {
    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for Key {
    fn from(value: f64) -> Self {
        Key(value)
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Display for Key {
    /// Writes the shortest text that parses back to the same position in the total order.
    /// `f64` display drops the sign of NaN, so a negative NaN is written as `-NaN`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_nan() && self.0.is_sign_negative() {
            write!(f, "-NaN")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Record parsing error.
#[derive(Debug)]
pub struct ParseError {
    /// 1-based number of the offending line.
    pub line: u64,
    /// Record text as read, without the line terminator.
    pub record: String,
    source: ParseFloatError,
}

impl Error for ParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {:?} is not a number: {}", self.line, self.record, self.source)
    }
}

/// Parses a single text record into a value. Surrounding whitespace is ignored, an empty record is an error.
pub fn parse_record(record: &str, line: u64) -> Result<f64, ParseError> {
    record.trim().parse::<f64>().map_err(|err| ParseError {
        line,
        record: record.trim_end_matches(&['\r', '\n'][..]).to_string(),
        source: err,
    })
}
