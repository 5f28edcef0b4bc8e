//! In-memory chunk buffer.

use rayon::slice::ParallelSliceMut;

/// Buffer holding at most `limit` values of a single chunk.
pub struct ChunkBuffer {
    limit: usize,
    inner: Vec<f64>,
}

impl ChunkBuffer {
    pub fn with_capacity(limit: usize) -> Self {
        ChunkBuffer {
            limit,
            inner: Vec::with_capacity(limit),
        }
    }

    /// Adds a new value to the buffer.
    pub fn push(&mut self, value: f64) {
        self.inner.push(value);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Checks if the buffer reached the limit.
    pub fn is_full(&self) -> bool {
        self.inner.len() >= self.limit
    }

    /// Sorts the buffer in ascending total order using the current rayon pool.
    pub fn par_sort(&mut self) {
        self.inner.par_sort_by(|a, b| a.total_cmp(b));
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.inner
    }

    /// Empties the buffer keeping its allocation.
    pub fn clear(&mut self) {
        self.inner.clear();
    }
}
