//! `float-ext-sort` is an external merge sort for floating-point datasets.
//!
//! External sorting handles data that does not fit into the main memory of a computer and instead must reside in
//! slower external memory, usually a hard disk drive. Sorting is achieved in two passes. During the first pass
//! the input is split into chunks of a fixed number of values, each chunk is sorted in memory and saved as a run.
//! During the second pass all runs are merged together with a k-way merge that keeps a single value per run in
//! memory. For more information see [External Sorting](https://en.wikipedia.org/wiki/External_sorting).
//!
//! # Overview
//!
//! * **Bounded memory:**
//!   the chunking pass holds at most one chunk in memory, the merging pass holds one value per run.
//! * **Total order:**
//!   values are compared with IEEE-754 `totalOrder`, so NaN, infinities and signed zeros have a fixed position.
//! * **Deterministic ties:**
//!   equal values coming from different runs are emitted in run order.
//! * **Multithreading support:**
//!   each chunk is sorted in parallel on a dedicated thread pool.
//! * **Run formats:**
//!   runs are stored as plain text (one value per line) or as `MessagePack` floats.
//!
//! # Example
//!
//! ```no_run
//! use std::fs;
//! use std::io;
//! use std::path;
//!
//! use env_logger;
//! use log;
//!
//! use float_ext_sort::{ExternalSorter, ExternalSorterBuilder, ValueReader};
//!
//! fn main() {
//!     env_logger::Builder::new().filter_level(log::LevelFilter::Debug).init();
//!
//!     let input = ValueReader::new(io::BufReader::new(fs::File::open("data.txt").unwrap()));
//!     let mut output = io::BufWriter::new(fs::File::create("result.txt").unwrap());
//!
//!     let sorter: ExternalSorter = ExternalSorterBuilder::new()
//!         .with_total(1000)
//!         .with_chunk_capacity(100)
//!         .with_run_dir(path::Path::new("./data"))
//!         .build()
//!         .unwrap();
//!
//!     let summary = sorter.sort(input, &mut output).unwrap();
//!     log::info!("{} values sorted", summary.values);
//! }
//! ```

pub mod buffer;
pub mod chunker;
pub mod config;
pub mod input;
pub mod merger;
pub mod run;
pub mod sort;
pub mod value;

pub use buffer::ChunkBuffer;
pub use chunker::ChunkSorter;
pub use config::{RunLocation, SortConfig};
pub use input::{InputError, ValueReader};
pub use merger::{FrontierEntry, StreamMerger};
pub use run::{RmpRunFormat, Run, RunCursor, RunError, RunFormat, RunStore, TextRunFormat};
pub use sort::{ExternalSorter, ExternalSorterBuilder, SortError, SortSummary};
pub use value::{Key, ParseError};
