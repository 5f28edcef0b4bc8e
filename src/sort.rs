//! External sorter.

use log;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::io;
use std::io::prelude::*;
use std::path::Path;

use crate::chunker::ChunkSorter;
use crate::config::{RunLocation, SortConfig};
use crate::input::InputError;
use crate::merger::StreamMerger;
use crate::run::{Run, RunError, RunFormat, RunStore, TextRunFormat};

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Inconsistent sorting parameters.
    Config(String),
    /// Run directory could not be created.
    StorageUnavailable(io::Error),
    /// Workers thread pool initialization error.
    ThreadPoolBuildError(rayon::ThreadPoolBuildError),
    /// Input data stream error.
    Input(InputError),
    /// A run could not be written.
    RunWrite { run: usize, source: RunError },
    /// A previously written run could not be opened for merging.
    RunOpen { run: usize, source: io::Error },
    /// A run could not be read while merging.
    RunRead { run: usize, source: RunError },
    /// Output sink error.
    Output(io::Error),
    /// Merged value count differs from the number of values written to runs.
    CountMismatch { expected: u64, actual: u64 },
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            SortError::Config(_) => None,
            SortError::StorageUnavailable(err) => Some(err),
            SortError::ThreadPoolBuildError(err) => Some(err),
            SortError::Input(err) => Some(err),
            SortError::RunWrite { source, .. } => Some(source),
            SortError::RunOpen { source, .. } => Some(source),
            SortError::RunRead { source, .. } => Some(source),
            SortError::Output(err) => Some(err),
            SortError::CountMismatch { .. } => None,
        }
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::Config(msg) => write!(f, "invalid configuration: {}", msg),
            SortError::StorageUnavailable(err) => write!(f, "run directory not created: {}", err),
            SortError::ThreadPoolBuildError(err) => write!(f, "thread pool initialization failed: {}", err),
            SortError::Input(err) => write!(f, "input data stream error: {}", err),
            SortError::RunWrite { run, source } => write!(f, "run {} not saved: {}", run, source),
            SortError::RunOpen { run, source } => write!(f, "run {} could not be opened: {}", run, source),
            SortError::RunRead { run, source } => write!(f, "run {} read failed: {}", run, source),
            SortError::Output(err) => write!(f, "output write failed: {}", err),
            SortError::CountMismatch { expected, actual } => {
                write!(f, "merged {} values but runs hold {}", actual, expected)
            }
        }
    }
}

/// Sorting result.
#[derive(Debug, Clone, PartialEq)]
pub struct SortSummary {
    /// Number of values written to the output.
    pub values: u64,
    /// Number of runs produced by the chunking phase.
    pub runs: usize,
    /// Runs left on disk, empty unless runs are kept.
    pub kept_runs: Vec<Run>,
}

/// External sorter builder. Provides methods for [`ExternalSorter`] initialization.
#[derive(Clone)]
pub struct ExternalSorterBuilder<F = TextRunFormat>
where
    F: RunFormat,
{
    config: SortConfig,
    format: F,
}

impl<F: RunFormat + Default> ExternalSorterBuilder<F> {
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        ExternalSorterBuilder::default()
    }
}

impl<F: RunFormat> ExternalSorterBuilder<F> {
    /// Builds an [`ExternalSorter`] instance using provided configuration.
    pub fn build(self) -> Result<ExternalSorter<F>, SortError> {
        ExternalSorter::new(self.config, self.format)
    }

    /// Sets the maximum number of values to read from the input.
    pub fn with_total(mut self, total: u64) -> ExternalSorterBuilder<F> {
        self.config.total = Some(total);
        return self;
    }

    /// Sets the number of values sorted in memory at once.
    pub fn with_chunk_capacity(mut self, chunk_capacity: usize) -> ExternalSorterBuilder<F> {
        self.config.chunk_capacity = chunk_capacity;
        return self;
    }

    /// Sets a named directory to store runs in. The directory is created if it does not exist.
    pub fn with_run_dir(mut self, path: &Path) -> ExternalSorterBuilder<F> {
        self.config.run_location = RunLocation::Dir(path.into());
        return self;
    }

    /// Sets a parent directory for the temporary run directory.
    pub fn with_tmp_dir(mut self, path: &Path) -> ExternalSorterBuilder<F> {
        self.config.run_location = RunLocation::Temp(Some(path.into()));
        return self;
    }

    /// Sets run read/write buffer size.
    pub fn with_rw_buf_size(mut self, buf_size: usize) -> ExternalSorterBuilder<F> {
        self.config.rw_buf_size = Some(buf_size);
        return self;
    }

    /// Sets number of threads to be used to sort chunks.
    pub fn with_threads_number(mut self, threads_number: usize) -> ExternalSorterBuilder<F> {
        self.config.threads_number = Some(threads_number);
        return self;
    }

    /// Keeps run files after a successful merge. Requires a run directory set with [`Self::with_run_dir`].
    pub fn with_keep_runs(mut self, keep_runs: bool) -> ExternalSorterBuilder<F> {
        self.config.keep_runs = keep_runs;
        return self;
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, config: SortConfig) -> ExternalSorterBuilder<F> {
        self.config = config;
        return self;
    }

    /// Sets run serialization format.
    pub fn with_format<G: RunFormat>(self, format: G) -> ExternalSorterBuilder<G> {
        ExternalSorterBuilder {
            config: self.config,
            format,
        }
    }
}

impl<F: RunFormat + Default> Default for ExternalSorterBuilder<F> {
    fn default() -> Self {
        ExternalSorterBuilder {
            config: SortConfig::default(),
            format: F::default(),
        }
    }
}

/// External sorter.
///
/// Sorting runs in two strictly ordered phases: the input is split into sorted runs which are all persisted before
/// they are merged into the output.
pub struct ExternalSorter<F = TextRunFormat>
where
    F: RunFormat,
{
    config: SortConfig,
    /// Chunk sorting thread pool.
    thread_pool: rayon::ThreadPool,
    store: RunStore,
    format: F,
}

impl<F: RunFormat> ExternalSorter<F> {
    /// Creates a new external sorter instance. Creates the run directory if it does not exist.
    pub fn new(config: SortConfig, format: F) -> Result<Self, SortError> {
        config.validate().map_err(SortError::Config)?;

        let thread_pool = Self::init_thread_pool(config.threads_number)?;
        let store = RunStore::open(&config.run_location, config.rw_buf_size).map_err(|err| {
            log::error!("run directory initialization failed: {}", err);
            SortError::StorageUnavailable(err)
        })?;

        return Ok(ExternalSorter {
            config,
            thread_pool,
            store,
            format,
        });
    }

    fn init_thread_pool(threads_number: Option<usize>) -> Result<rayon::ThreadPool, SortError> {
        let mut thread_pool_builder = rayon::ThreadPoolBuilder::new();

        if let Some(threads_number) = threads_number {
            log::info!("initializing thread-pool (threads: {})", threads_number);
            thread_pool_builder = thread_pool_builder.num_threads(threads_number);
        } else {
            log::info!("initializing thread-pool (threads: default)");
        }
        let thread_pool = thread_pool_builder
            .build()
            .map_err(|err| SortError::ThreadPoolBuildError(err))?;

        return Ok(thread_pool);
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Directory the runs are stored in.
    pub fn run_dir(&self) -> &Path {
        self.store.path()
    }

    /// Sorts values from the input writing them to the output one value per line.
    ///
    /// # Arguments
    /// * `input` - Input stream values to be fetched from
    /// * `output` - Output sink sorted values to be written to
    pub fn sort<I, W>(&self, input: I, output: &mut W) -> Result<SortSummary, SortError>
    where
        I: IntoIterator<Item = Result<f64, InputError>>,
        W: Write,
    {
        let runs = self.create_runs(input)?;
        let values = self.merge_runs(&runs, output)?;

        let kept_runs = if self.config.keep_runs {
            runs.clone()
        } else {
            self.remove_runs(&runs);
            Vec::new()
        };

        log::info!("sorted {} values using {} runs", values, runs.len());

        return Ok(SortSummary {
            values,
            runs: runs.len(),
            kept_runs,
        });
    }

    /// Splits the input into sorted runs.
    pub fn create_runs<I>(&self, input: I) -> Result<Vec<Run>, SortError>
    where
        I: IntoIterator<Item = Result<f64, InputError>>,
    {
        let chunk_sorter = ChunkSorter::new(&self.config, &self.store, &self.thread_pool, self.format.clone());
        chunk_sorter.sort_into_runs(input)
    }

    /// Merges sorted runs into the output, one value per line.
    /// Every run must be readable, a run that cannot be opened fails the whole merge.
    /// Returns the number of values written.
    pub fn merge_runs<W: Write>(&self, runs: &[Run], output: &mut W) -> Result<u64, SortError> {
        log::info!("merging {} runs", runs.len());

        let mut cursors = Vec::with_capacity(runs.len());
        for run in runs {
            log::debug!("opening run {} ({})", run.index, run.path.display());
            let cursor = self.store.open_run(run, self.format.clone()).map_err(|err| {
                log::error!("run {} could not be opened: {}", run.index, err);
                SortError::RunOpen {
                    run: run.index,
                    source: err,
                }
            })?;
            cursors.push(cursor);
        }

        let mut merger = StreamMerger::new(cursors).map_err(|(run, err)| SortError::RunRead {
            run: runs[run].index,
            source: err,
        })?;

        let mut written: u64 = 0;
        while let Some(entry) = merger.next_entry() {
            let entry = entry.map_err(|(run, err)| SortError::RunRead {
                run: runs[run].index,
                source: err,
            })?;
            writeln!(output, "{}", entry.value).map_err(SortError::Output)?;
            written += 1;
        }
        output.flush().map_err(SortError::Output)?;

        let expected: u64 = runs.iter().map(|run| run.len).sum();
        if written != expected {
            return Err(SortError::CountMismatch {
                expected,
                actual: written,
            });
        }

        log::debug!("merge done ({} values)", written);

        return Ok(written);
    }

    fn remove_runs(&self, runs: &[Run]) {
        for run in runs {
            if let Err(err) = self.store.remove_run(run) {
                log::warn!("run {} not removed: {}", run.index, err);
            }
        }
    }
}
