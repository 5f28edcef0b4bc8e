use std::io;
use std::path;

use env_logger;
use log;
use rand::Rng;

use float_ext_sort::{ExternalSorter, ExternalSorterBuilder};

fn main() {
    env_logger::Builder::new().filter_level(log::LevelFilter::Debug).init();

    let mut rng = rand::thread_rng();
    let input: Vec<f64> = (0..1000).map(|_| rng.gen_range(0.0..100.0)).collect();

    let sorter: ExternalSorter = ExternalSorterBuilder::new()
        .with_total(1000)
        .with_chunk_capacity(100)
        .with_tmp_dir(path::Path::new("./"))
        .build()
        .unwrap();

    let mut output = io::BufWriter::new(io::stdout());
    let summary = sorter.sort(input.into_iter().map(Ok), &mut output).unwrap();

    log::info!("{} values sorted using {} runs", summary.values, summary.runs);
}
