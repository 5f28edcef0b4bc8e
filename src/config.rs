//! Sorting configuration.

use std::path::PathBuf;

/// Where run files are stored.
#[derive(Debug, Clone, PartialEq)]
pub enum RunLocation {
    /// Named directory, created if missing and kept after sorting.
    Dir(PathBuf),
    /// Fresh temporary directory, optionally inside the given parent. Removed with the sorter.
    Temp(Option<PathBuf>),
}

/// Sorting parameters shared by both phases.
#[derive(Debug, Clone, PartialEq)]
pub struct SortConfig {
    /// Maximum number of input values to consume. `None` reads the input to the end.
    pub total: Option<u64>,
    /// Number of values sorted in memory at once.
    pub chunk_capacity: usize,
    /// Run storage location.
    pub run_location: RunLocation,
    /// Run file read/write buffer size.
    pub rw_buf_size: Option<usize>,
    /// Number of threads used to sort a chunk.
    pub threads_number: Option<usize>,
    /// Keep run files after a successful merge.
    pub keep_runs: bool,
}

impl SortConfig {
    pub fn new(chunk_capacity: usize) -> Self {
        SortConfig {
            chunk_capacity,
            ..SortConfig::default()
        }
    }

    /// Checks parameter consistency.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_capacity == 0 {
            return Err("chunk capacity must be positive".to_string());
        }
        if self.rw_buf_size == Some(0) {
            return Err("read/write buffer size must be positive".to_string());
        }
        if self.threads_number == Some(0) {
            return Err("threads number must be positive".to_string());
        }
        if self.keep_runs {
            if let RunLocation::Temp(_) = self.run_location {
                return Err("keeping runs requires a run directory".to_string());
            }
        }
        return Ok(());
    }

    /// Number of runs the chunking phase produces for a complete input of `total` values.
    /// Returns `None` if the total is not configured.
    pub fn expected_runs(&self) -> Option<u64> {
        let capacity = self.chunk_capacity.max(1) as u64;
        self.total.map(|total| total / capacity + u64::from(total % capacity != 0))
    }
}

impl Default for SortConfig {
    fn default() -> Self {
        SortConfig {
            total: None,
            chunk_capacity: 100,
            run_location: RunLocation::Temp(None),
            rw_buf_size: None,
            threads_number: None,
            keep_runs: false,
        }
    }
}
