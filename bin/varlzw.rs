#![forbid(unsafe_code)]
use std::path::PathBuf;
use std::{env, ffi, fs, io, process};

use varlzw::{Decoder, Encoder, Header};

fn main() -> CodingResult {
    CodingResult::catch_panic(|| {
        let flags = Flags::from_args(env::args_os()).unwrap_or_else(|ParamError| explain());
        if flags.verbose {
            StderrLogger::install();
        }
        run_coding(flags)
    })
}

fn run_coding(flags: Flags) -> Result<(), io::Error> {
    let operation = flags.operation.unwrap_or_else(explain);
    let header = Header::default()
        .with_reset(flags.reset)
        .with_fixed_width(flags.fixed_width);

    let out = io::stdout();
    let out = io::BufWriter::new(out.lock());

    let input: Box<dyn io::BufRead> = match flags.input {
        Input::File(file) => {
            let data = fs::File::open(file)?;
            Box::new(io::BufReader::with_capacity(1 << 20, data))
        }
        Input::Stdin => Box::new(io::BufReader::with_capacity(1 << 20, io::stdin())),
    };

    match operation {
        Operation::Compress => {
            let mut encoder = Encoder::new(header);
            let result = encoder.into_stream(out).encode_all(input);
            log::debug!(
                "{} bytes in, {} bytes out, {:?}",
                result.bytes_read,
                result.bytes_written,
                encoder.stats()
            );
            result.status
        }
        Operation::Expand => {
            if flags.reset || flags.fixed_width {
                log::debug!("header flags are read from the stream, ignoring the command line");
            }

            let mut decoder = Decoder::new();
            let result = decoder.into_stream(out).decode_all(input);
            log::debug!(
                "{} bytes in, {} bytes out, {:?}",
                result.bytes_read,
                result.bytes_written,
                decoder.stats()
            );
            result.status
        }
    }
}

struct Flags {
    input: Input,
    operation: Option<Operation>,
    reset: bool,
    fixed_width: bool,
    verbose: bool,
}

struct ParamError;

#[derive(Debug)]
enum Input {
    File(PathBuf),
    Stdin,
}

#[derive(Debug)]
enum Operation {
    Compress,
    Expand,
}

fn explain<T>() -> T {
    println!(
        "Usage: varlzw [-c|-x] [-r] [-s] [-v] <file>\n\
        Arguments:\n\
        -c\t operation compress\n\
        -x\t operation expand\n\
        -r\t allow dictionary resets when compressing\n\
        -s\t static 12 bit codes when compressing\n\
        -v\t log code size changes to stderr\n\
        <file>\tfilepath or '-' for stdin"
    );
    process::exit(1);
}

impl Default for Flags {
    fn default() -> Flags {
        Flags {
            input: Input::Stdin,
            operation: None,
            reset: false,
            fixed_width: false,
            verbose: false,
        }
    }
}

fn command() -> clap::Command<'static> {
    clap::Command::new("varlzw")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compress and expand variable-width lzw streams")
        .arg(
            clap::Arg::new("compress")
                .short('c')
                .long("compress")
                .takes_value(false),
        )
        .arg(
            clap::Arg::new("expand")
                .short('x')
                .long("expand")
                .takes_value(false),
        )
        .group(
            clap::ArgGroup::new("operation")
                .args(&["compress", "expand"])
                .multiple(false)
                .required(true),
        )
        .arg(
            clap::Arg::new("reset")
                .short('r')
                .long("reset")
                .takes_value(false),
        )
        .arg(
            clap::Arg::new("static")
                .short('s')
                .long("static")
                .takes_value(false),
        )
        .arg(
            clap::Arg::new("verbose")
                .short('v')
                .long("verbose")
                .takes_value(false),
        )
        .arg(
            clap::Arg::new("file")
                .default_value("-")
                .value_parser(clap::builder::ValueParser::path_buf()),
        )
}

impl Flags {
    fn from_args(mut args: impl Iterator<Item = ffi::OsString>) -> Result<Self, ParamError> {
        let mut flags = Flags::default();
        let matches = command()
            .try_get_matches_from(args.by_ref())
            .map_err(|_| ParamError)?;

        if matches.contains_id("compress") {
            flags.operation = Some(Operation::Compress);
        } else if matches.contains_id("expand") {
            flags.operation = Some(Operation::Expand);
        }

        flags.reset = matches.contains_id("reset");
        flags.fixed_width = matches.contains_id("static");
        flags.verbose = matches.contains_id("verbose");

        match matches.get_one::<PathBuf>("file") {
            None => flags.input = Input::Stdin,
            Some(p) if *p == PathBuf::from("-") => flags.input = Input::Stdin,
            Some(p) => flags.input = Input::File(p.clone()),
        }

        Ok(flags)
    }
}

/// Prints log records of debug level and above to stderr.
struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl StderrLogger {
    fn install() {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(log::LevelFilter::Debug);
        }
    }
}

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Debug
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

enum CodingResult {
    Ok,
    Err(io::Error),
    Panic,
}

impl CodingResult {
    fn catch_panic(op: fn() -> Result<(), io::Error>) -> Self {
        std::panic::catch_unwind(|| match op() {
            Ok(()) => CodingResult::Ok,
            Err(err) => CodingResult::Err(err),
        })
        .unwrap_or(CodingResult::Panic)
    }
}

impl std::process::Termination for CodingResult {
    fn report(self) -> std::process::ExitCode {
        match self {
            CodingResult::Ok => std::process::ExitCode::SUCCESS,
            CodingResult::Err(err) => {
                eprintln!("varlzw: {}", err);
                std::process::ExitCode::FAILURE
            }
            CodingResult::Panic => {
                eprintln!(
                    "The process failed irrecoverably! This should never happen and is a bug."
                );
                std::process::ExitCode::from(128)
            }
        }
    }
}
