//! Binary heap merger.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::error::Error;

use log;

use crate::value::Key;

/// Next unconsumed value of a run.
///
/// Entries are ordered by value first and run index second, so equal values are emitted in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FrontierEntry {
    pub value: Key,
    pub run: usize,
}

/// Binary heap k-way merger.
/// Merges multiple sorted runs into a single sorted output holding only one value per run in memory.
/// Time complexity is *m* \* log(*k*) where *m* is the number of values, *k* is the number of runs.
///
/// The merger stops at the first error: once an error has been returned no further values are produced.
pub struct StreamMerger<C> {
    // binary heap is max-heap by default so we reverse it to convert it to min-heap
    frontier: BinaryHeap<Reverse<FrontierEntry>>,
    cursors: Vec<C>,
    failed: bool,
}

impl<C, E> StreamMerger<C>
where
    C: Iterator<Item = Result<f64, E>>,
    E: Error,
{
    /// Creates a merger over the given cursors reading the head value of each one.
    /// A cursor's position in `cursors` is its run index. Cursor values should be sorted in ascending order
    /// otherwise the result is undefined. Cursors with no values take no part in the merge.
    ///
    /// # Arguments
    /// * `cursors` - Run cursors to be merged in a single sorted sequence
    pub fn new<I>(cursors: I) -> Result<Self, (usize, E)>
    where
        I: IntoIterator<Item = C>,
    {
        let mut cursors = Vec::from_iter(cursors);
        let mut frontier = BinaryHeap::with_capacity(cursors.len());

        for (run, cursor) in cursors.iter_mut().enumerate() {
            match cursor.next() {
                Some(Ok(value)) => frontier.push(Reverse(FrontierEntry {
                    value: Key(value),
                    run,
                })),
                Some(Err(err)) => return Err((run, err)),
                None => log::debug!("run {} is empty", run),
            }
        }

        return Ok(StreamMerger {
            frontier,
            cursors,
            failed: false,
        });
    }

    /// Number of runs that still have values to merge.
    pub fn open_runs(&self) -> usize {
        self.frontier.len()
    }

    /// Returns the next value in ascending order together with the index of the run it came from.
    /// Returns `None` once every run is exhausted.
    pub fn next_entry(&mut self) -> Option<Result<FrontierEntry, (usize, E)>> {
        if self.failed {
            return None;
        }

        let Reverse(entry) = self.frontier.pop()?;
        match self.cursors[entry.run].next() {
            Some(Ok(value)) => self.frontier.push(Reverse(FrontierEntry {
                value: Key(value),
                run: entry.run,
            })),
            Some(Err(err)) => {
                self.failed = true;
                return Some(Err((entry.run, err)));
            }
            None => log::debug!("run {} exhausted", entry.run),
        }

        return Some(Ok(entry));
    }
}

impl<C, E> Iterator for StreamMerger<C>
where
    C: Iterator<Item = Result<f64, E>>,
    E: Error,
{
    type Item = Result<f64, E>;

    /// Returns the next value from the runs in ascending order.
    fn next(&mut self) -> Option<Self::Item> {
        Some(match self.next_entry()? {
            Ok(entry) => Ok(entry.value.value()),
            Err((_, err)) => Err(err),
        })
    }
}

#[cfg(test)]
mod test {
    use rand::seq::SliceRandom;
    use rand::Rng;
    use rstest::*;
    use std::io::{self, ErrorKind};

    use super::StreamMerger;

    fn merge(runs: Vec<Vec<Result<f64, io::Error>>>) -> Vec<Result<f64, io::Error>> {
        match StreamMerger::new(runs.into_iter().map(|r| r.into_iter())) {
            Ok(merger) => merger.collect(),
            Err((_, err)) => vec![Err(err)],
        }
    }

    fn ok(values: &[f64]) -> Vec<Result<f64, io::Error>> {
        values.iter().map(|v| Ok(*v)).collect()
    }

    fn test_error() -> io::Error {
        io::Error::new(ErrorKind::Other, "test error")
    }

    #[rstest]
    #[case(
        vec![],
        vec![],
    )]
    #[case(
        vec![
            vec![],
            vec![]
        ],
        vec![],
    )]
    #[case(
        vec![
            ok(&[4.0, 5.0, 7.0]),
            ok(&[1.0, 6.0]),
            ok(&[3.0]),
            vec![],
        ],
        ok(&[1.0, 3.0, 4.0, 5.0, 6.0, 7.0]),
    )]
    #[case(
        vec![
            ok(&[1.0, 2.0, 9.5]),
        ],
        ok(&[1.0, 2.0, 9.5]),
    )]
    #[case(
        vec![
            ok(&[3.0, 5.0, 8.0]),
            ok(&[1.0, 2.0, 9.0]),
        ],
        ok(&[1.0, 2.0, 3.0, 5.0, 8.0, 9.0]),
    )]
    #[case(
        vec![
            vec![Err(test_error())]
        ],
        vec![Err(test_error())],
    )]
    #[case(
        vec![
            vec![Ok(3.0), Err(test_error()), Ok(4.0)],
            ok(&[1.0, 2.0, 5.0]),
        ],
        vec![
            Ok(1.0),
            Ok(2.0),
            Err(test_error()),
        ],
    )]
    fn test_merger(
        #[case] runs: Vec<Vec<Result<f64, io::Error>>>,
        #[case] expected_result: Vec<Result<f64, io::Error>>,
    ) {
        let actual_result = merge(runs);
        assert_eq!(render(&actual_result), render(&expected_result));
    }

    #[test]
    fn test_merger_ties_by_run_index() {
        let runs = vec![vec![1.0, 3.0], vec![1.0, 2.0]];
        let mut merger = StreamMerger::new(runs.into_iter().map(|r| r.into_iter().map(Ok::<_, io::Error>))).unwrap();

        let mut actual = Vec::new();
        while let Some(entry) = merger.next_entry() {
            let entry = entry.unwrap();
            actual.push((entry.value.value(), entry.run));
        }

        assert_eq!(actual, vec![(1.0, 0), (1.0, 1), (2.0, 1), (3.0, 0)]);
    }

    #[test]
    fn test_merger_skips_empty_runs() {
        let runs = vec![vec![], vec![2.0], vec![], vec![1.0]];
        let merger = StreamMerger::new(runs.into_iter().map(|r| r.into_iter().map(Ok::<_, io::Error>))).unwrap();

        assert_eq!(merger.open_runs(), 2);
        let actual: Result<Vec<f64>, io::Error> = merger.collect();
        assert_eq!(actual.unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_merger_random_runs() {
        let mut rng = rand::thread_rng();
        let mut input = Vec::from_iter((0..500).map(|_| rng.gen_range(-50..50) as f64 / 2.0));
        input.shuffle(&mut rng);

        let runs: Vec<Vec<f64>> = input
            .chunks(37)
            .map(|chunk| {
                let mut chunk = chunk.to_vec();
                chunk.sort_by(|a, b| a.total_cmp(b));
                chunk
            })
            .collect();

        let merger = StreamMerger::new(runs.into_iter().map(|r| r.into_iter().map(Ok::<_, io::Error>))).unwrap();
        let actual: Vec<f64> = merger.map(Result::unwrap).collect();

        input.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(actual, input);
    }

    fn render(results: &[Result<f64, io::Error>]) -> Vec<String> {
        results
            .iter()
            .map(|result| match result {
                Ok(value) => value.to_string(),
                Err(err) => format!("error: {}", err),
            })
            .collect()
    }
}
