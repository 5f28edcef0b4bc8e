//! Chunking phase: splits the input into chunks, sorts each chunk in memory and spills it as a run.

use log;

use crate::buffer::ChunkBuffer;
use crate::config::SortConfig;
use crate::input::InputError;
use crate::run::{Run, RunFormat, RunStore};
use crate::sort::SortError;

/// Chunk sorter.
///
/// Chunk boundaries are positional: chunk `i` holds input values `i*C .. (i+1)*C`. Chunks are processed strictly one
/// after another so at most one chunk is held in memory.
pub struct ChunkSorter<'a, F: RunFormat> {
    config: &'a SortConfig,
    store: &'a RunStore,
    thread_pool: &'a rayon::ThreadPool,
    format: F,
}

impl<'a, F: RunFormat> ChunkSorter<'a, F> {
    pub fn new(config: &'a SortConfig, store: &'a RunStore, thread_pool: &'a rayon::ThreadPool, format: F) -> Self {
        ChunkSorter {
            config,
            store,
            thread_pool,
            format,
        }
    }

    /// Reads the input, consuming at most the configured total, and persists it as sorted runs.
    /// Returns the runs in index order. Only the last run may hold fewer than `chunk_capacity` values,
    /// an empty input produces no runs.
    pub fn sort_into_runs<I>(&self, input: I) -> Result<Vec<Run>, SortError>
    where
        I: IntoIterator<Item = Result<f64, InputError>>,
    {
        let limit = self.config.total.unwrap_or(u64::MAX);
        if let Some(expected_runs) = self.config.expected_runs() {
            log::info!(
                "chunking {} values into {} runs of up to {} values",
                limit,
                expected_runs,
                self.config.chunk_capacity
            );
        }

        let mut chunk_buf = ChunkBuffer::with_capacity(self.config.chunk_capacity);
        let mut runs = Vec::new();
        let mut consumed: u64 = 0;

        let mut input = input.into_iter();
        while consumed < limit {
            let item = match input.next() {
                Some(item) => item,
                None => break,
            };
            chunk_buf.push(item.map_err(SortError::Input)?);
            consumed += 1;

            if chunk_buf.is_full() {
                runs.push(self.spill(runs.len(), &mut chunk_buf)?);
            }
        }

        if !chunk_buf.is_empty() {
            runs.push(self.spill(runs.len(), &mut chunk_buf)?);
        }

        if let Some(total) = self.config.total {
            if consumed < total {
                log::warn!("input ended after {} of {} expected values", consumed, total);
            }
        }

        log::debug!("chunking done ({} values, {} runs)", consumed, runs.len());

        return Ok(runs);
    }

    fn spill(&self, index: usize, buffer: &mut ChunkBuffer) -> Result<Run, SortError> {
        log::debug!("sorting chunk {} ({} values) ...", index, buffer.len());
        self.thread_pool.install(|| {
            buffer.par_sort();
        });

        log::debug!("saving chunk {}", index);
        let run = self
            .store
            .write_run(index, buffer.as_slice(), &self.format)
            .map_err(|err| SortError::RunWrite { run: index, source: err })?;
        buffer.clear();

        return Ok(run);
    }
}

#[cfg(test)]
mod test {
    use rand::seq::SliceRandom;
    use rstest::*;

    use super::ChunkSorter;
    use crate::config::{RunLocation, SortConfig};
    use crate::input::InputError;
    use crate::run::{RunError, RunStore, TextRunFormat};
    use crate::sort::SortError;
    use crate::value::parse_record;

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[fixture]
    fn thread_pool() -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap()
    }

    fn read_runs(store: &RunStore, runs: &[crate::run::Run]) -> Vec<Vec<f64>> {
        runs.iter()
            .map(|run| {
                let values: Result<Vec<f64>, RunError> = store.open_run(run, TextRunFormat).unwrap().collect();
                values.unwrap()
            })
            .collect()
    }

    #[rstest]
    #[case(6, 3, vec![3, 3])]
    #[case(7, 3, vec![3, 3, 1])]
    #[case(5, 10, vec![5])]
    #[case(1, 1, vec![1])]
    #[case(0, 4, vec![])]
    fn test_chunk_size_boundary(
        tmp_dir: tempfile::TempDir,
        thread_pool: rayon::ThreadPool,
        #[case] total: usize,
        #[case] capacity: usize,
        #[case] expected_lens: Vec<u64>,
    ) {
        let config = SortConfig {
            total: Some(total as u64),
            ..SortConfig::new(capacity)
        };
        let store = RunStore::open(&RunLocation::Dir(tmp_dir.path().to_path_buf()), None).unwrap();

        let mut input = Vec::from_iter((0..total).map(|i| i as f64));
        input.shuffle(&mut rand::thread_rng());

        let sorter = ChunkSorter::new(&config, &store, &thread_pool, TextRunFormat);
        let runs = sorter.sort_into_runs(input.iter().map(|v| Ok(*v))).unwrap();

        assert_eq!(runs.len() as u64, config.expected_runs().unwrap());
        assert_eq!(runs.iter().map(|r| r.len).collect::<Vec<_>>(), expected_lens);
        assert_eq!(runs.iter().map(|r| r.index).collect::<Vec<_>>(), Vec::from_iter(0..runs.len()));

        let mut all = Vec::new();
        for values in read_runs(&store, &runs) {
            assert!(values.windows(2).all(|w| w[0] <= w[1]), "run not sorted: {:?}", values);
            all.extend(values);
        }

        // runs are a permutation of the input
        all.sort_by(|a, b| a.total_cmp(b));
        input.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(all, input);
    }

    #[rstest]
    fn test_positional_chunks(tmp_dir: tempfile::TempDir, thread_pool: rayon::ThreadPool) {
        let config = SortConfig::new(3);
        let store = RunStore::open(&RunLocation::Dir(tmp_dir.path().to_path_buf()), None).unwrap();
        let input = vec![5.0, 3.0, 8.0, 1.0, 9.0, 2.0];

        let sorter = ChunkSorter::new(&config, &store, &thread_pool, TextRunFormat);
        let runs = sorter.sort_into_runs(input.into_iter().map(Ok)).unwrap();

        assert_eq!(read_runs(&store, &runs), vec![vec![3.0, 5.0, 8.0], vec![1.0, 2.0, 9.0]]);
    }

    #[rstest]
    fn test_short_input(tmp_dir: tempfile::TempDir, thread_pool: rayon::ThreadPool) {
        let config = SortConfig {
            total: Some(10),
            ..SortConfig::new(4)
        };
        let store = RunStore::open(&RunLocation::Dir(tmp_dir.path().to_path_buf()), None).unwrap();

        let sorter = ChunkSorter::new(&config, &store, &thread_pool, TextRunFormat);
        let runs = sorter.sort_into_runs(vec![Ok(2.0), Ok(1.0), Ok(0.5), Ok(4.0), Ok(3.0)]).unwrap();

        assert_eq!(read_runs(&store, &runs), vec![vec![0.5, 1.0, 2.0, 4.0], vec![3.0]]);
    }

    #[rstest]
    fn test_total_limits_input(tmp_dir: tempfile::TempDir, thread_pool: rayon::ThreadPool) {
        let config = SortConfig {
            total: Some(3),
            ..SortConfig::new(2)
        };
        let store = RunStore::open(&RunLocation::Dir(tmp_dir.path().to_path_buf()), None).unwrap();

        let sorter = ChunkSorter::new(&config, &store, &thread_pool, TextRunFormat);
        let runs = sorter
            .sort_into_runs(vec![Ok(4.0), Ok(3.0), Ok(2.0), Ok(1.0)])
            .unwrap();

        assert_eq!(read_runs(&store, &runs), vec![vec![3.0, 4.0], vec![2.0]]);
    }

    #[rstest]
    fn test_parse_error(tmp_dir: tempfile::TempDir, thread_pool: rayon::ThreadPool) {
        let config = SortConfig::new(2);
        let store = RunStore::open(&RunLocation::Dir(tmp_dir.path().to_path_buf()), None).unwrap();
        let input = ["1.0", "2.0", "x", "3.0"]
            .iter()
            .enumerate()
            .map(|(i, r)| parse_record(r, i as u64 + 1).map_err(InputError::Parse));

        let sorter = ChunkSorter::new(&config, &store, &thread_pool, TextRunFormat);
        match sorter.sort_into_runs(input) {
            Err(SortError::Input(InputError::Parse(err))) => assert_eq!(err.line, 3),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
