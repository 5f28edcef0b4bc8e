use std::fs;
use std::io::{self, prelude::*};
use std::path;
use std::process;

use bytesize::ByteSize;
use clap::ArgEnum;
use env_logger;
use log;

use float_ext_sort::{ExternalSorterBuilder, RmpRunFormat, RunFormat, TextRunFormat, ValueReader};

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let format: Format = arg_parser.value_of_t_or_exit("format");
    let chunk_size: usize = arg_parser.value_of_t_or_exit("chunk_size");
    let total: Option<u64> = arg_parser
        .is_present("total")
        .then(|| arg_parser.value_of_t_or_exit("total"));
    let threads: Option<usize> = arg_parser
        .is_present("threads")
        .then(|| arg_parser.value_of_t_or_exit("threads"));
    let rw_buf_size: Option<ByteSize> = arg_parser
        .is_present("rw_buf_size")
        .then(|| arg_parser.value_of_t_or_exit("rw_buf_size"));
    let run_dir: Option<&str> = arg_parser.value_of("run_dir");
    let keep_runs = arg_parser.is_present("keep_runs");

    let input = arg_parser.value_of("input").expect("value is required");
    let input_stream = match fs::File::open(input) {
        Ok(file) => ValueReader::new(io::BufReader::new(file)),
        Err(err) => {
            log::error!("input file opening error: {}", err);
            process::exit(1);
        }
    };

    let output = arg_parser.value_of("output").expect("value is required");
    let mut output_stream = match fs::File::create(output) {
        Ok(file) => io::BufWriter::new(file),
        Err(err) => {
            log::error!("output file creation error: {}", err);
            process::exit(1);
        }
    };

    let mut sorter_builder = ExternalSorterBuilder::<TextRunFormat>::new()
        .with_chunk_capacity(chunk_size)
        .with_keep_runs(keep_runs);
    if let Some(total) = total {
        sorter_builder = sorter_builder.with_total(total);
    }

    if let Some(threads) = threads {
        sorter_builder = sorter_builder.with_threads_number(threads);
    }

    if let Some(run_dir) = run_dir {
        sorter_builder = sorter_builder.with_run_dir(path::Path::new(run_dir));
    }

    if let Some(rw_buf_size) = rw_buf_size {
        let buf_size = match usize::try_from(rw_buf_size.as_u64()) {
            Ok(buf_size) => buf_size,
            Err(err) => {
                log::error!("read/write buffer size {} is too large: {}", rw_buf_size, err);
                process::exit(1);
            }
        };
        sorter_builder = sorter_builder.with_rw_buf_size(buf_size);
    }

    match format {
        Format::Text => run(sorter_builder, input_stream, &mut output_stream),
        Format::Rmp => run(sorter_builder.with_format(RmpRunFormat), input_stream, &mut output_stream),
    }
}

fn run<F, R, W>(sorter_builder: ExternalSorterBuilder<F>, input: ValueReader<R>, output: &mut W)
where
    F: RunFormat,
    R: BufRead,
    W: Write,
{
    let sorter = match sorter_builder.build() {
        Ok(sorter) => sorter,
        Err(err) => {
            log::error!("sorter initialization error: {}", err);
            process::exit(1);
        }
    };

    let summary = match sorter.sort(input, output) {
        Ok(summary) => summary,
        Err(err) => {
            log::error!("data sorting error: {}", err);
            process::exit(1);
        }
    };

    log::info!("{} values sorted ({} runs)", summary.values, summary.runs);
    for run in summary.kept_runs {
        log::info!("run {} kept at {} ({} values)", run.index, run.path.display(), run.len);
    }
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Self::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ArgEnum>::from_str(s, false)
    }
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum Format {
    Text,
    Rmp,
}

impl Format {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Format::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Format as clap::ArgEnum>::from_str(s, false)
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("float-ext-sort")
        .about("external merge sort for floating-point values, one value per line")
        .arg(
            clap::Arg::new("input")
                .short('i')
                .long("input")
                .help("file to be sorted")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .help("result file")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("chunk_size")
                .short('c')
                .long("chunk-size")
                .help("number of values sorted in memory at once")
                .required(true)
                .takes_value(true)
                .validator(|v| match v.parse::<usize>() {
                    Ok(0) => Err("chunk size must be positive".to_string()),
                    Ok(_) => Ok(()),
                    Err(err) => Err(format!("chunk size format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("total")
                .short('n')
                .long("total")
                .help("maximum number of values to read from the input")
                .takes_value(true)
                .validator(|v| v.parse::<u64>().map(|_| ()).map_err(|err| err.to_string())),
        )
        .arg(
            clap::Arg::new("run_dir")
                .short('d')
                .long("run-dir")
                .help("directory to store sorted runs in, a temporary directory is used if not set")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("keep_runs")
                .short('k')
                .long("keep-runs")
                .help("keep sorted runs after merging")
                .requires("run_dir"),
        )
        .arg(
            clap::Arg::new("format")
                .short('f')
                .long("format")
                .help("run file format")
                .takes_value(true)
                .default_value("text")
                .possible_values(Format::possible_values()),
        )
        .arg(
            clap::Arg::new("rw_buf_size")
                .short('b')
                .long("rw-buf-size")
                .help("run file read/write buffer size")
                .takes_value(true)
                .validator(|v| match v.parse::<ByteSize>() {
                    Ok(size) if size.as_u64() == 0 => Err("buffer size must be positive".to_string()),
                    Ok(_) => Ok(()),
                    Err(err) => Err(format!("buffer size format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("threads")
                .short('t')
                .long("threads")
                .help("number of threads to use for parallel chunk sorting")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(LogLevel::possible_values()),
        )
        .get_matches()
}

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(match log_level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        })
        .format_timestamp_millis()
        .init();
}
