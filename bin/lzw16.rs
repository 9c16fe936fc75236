#![forbid(unsafe_code)]
use std::path::{Path, PathBuf};
use std::{env, ffi, fs, io};

use lzw16::{decode::Decoder, encode::Encoder, AllResult, ByteOrder};

fn main() -> CodingResult {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lzw16=warn".into()),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    CodingResult::catch_panic(|| {
        let flags = Flags::from_args(env::args_os())?;
        run_coding(flags)
    })
}

fn run_coding(flags: Flags) -> Result<(), lzw16::Error> {
    if let (Input::File(input), Output::File(output)) = (&flags.input, &flags.output) {
        if input == output {
            return Err(invalid_input("input and output must be distinct files"));
        }
    }

    let input: Box<dyn io::BufRead> = match &flags.input {
        Input::File(path) => {
            let file = fs::File::open(path)?;
            Box::new(io::BufReader::with_capacity(1 << 20, file))
        }
        Input::Stdin => Box::new(io::BufReader::with_capacity(1 << 20, io::stdin().lock())),
    };

    let output: Box<dyn io::Write> = match &flags.output {
        Output::File(path) => Box::new(io::BufWriter::new(fs::File::create(path)?)),
        Output::Stdout => Box::new(io::BufWriter::new(io::stdout().lock())),
    };

    let result = match flags.operation {
        Operation::Compress => {
            let mut encoder = Encoder::with_byte_order(flags.byte_order);
            encoder.into_stream(output).encode_all(input)
        }
        Operation::Decompress => {
            let mut decoder = Decoder::with_byte_order(flags.byte_order);
            decoder.into_stream(output).decode_all(input)
        }
    };

    let AllResult {
        bytes_read,
        bytes_written,
        status,
    } = result;

    match status {
        Ok(()) => {
            tracing::info!(bytes_read, bytes_written, "coding finished");
            Ok(())
        }
        Err(err) => {
            // Never leave a partial result behind.
            if let Output::File(path) = &flags.output {
                discard_output(path);
            }
            Err(err)
        }
    }
}

fn discard_output(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        tracing::warn!(path = %path.display(), %err, "could not remove partial output");
    }
}

fn invalid_input(msg: &str) -> lzw16::Error {
    lzw16::Error::Stream(io::Error::new(io::ErrorKind::InvalidInput, msg))
}

struct Flags {
    input: Input,
    output: Output,
    operation: Operation,
    byte_order: ByteOrder,
}

#[derive(Debug)]
enum Input {
    File(PathBuf),
    Stdin,
}

#[derive(Debug)]
enum Output {
    File(PathBuf),
    Stdout,
}

#[derive(Debug)]
enum Operation {
    Compress,
    Decompress,
}

fn command() -> clap::Command {
    clap::Command::new("lzw16")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compress and decompress files with 16-bit LZW")
        .arg(
            clap::Arg::new("compress")
                .short('c')
                .long("compress")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("decompress")
                .short('d')
                .long("decompress")
                .action(clap::ArgAction::SetTrue),
        )
        .group(
            clap::ArgGroup::new("operation")
                .args(["compress", "decompress"])
                .multiple(false)
                .required(true),
        )
        .arg(
            clap::Arg::new("byte_order")
                .short('b')
                .long("byte-order")
                .default_value("native")
                .value_parser(["native", "little", "big"]),
        )
        .arg(
            clap::Arg::new("input")
                .required(true)
                .value_parser(clap::builder::ValueParser::path_buf()),
        )
        .arg(
            clap::Arg::new("output")
                .required(true)
                .value_parser(clap::builder::ValueParser::path_buf()),
        )
}

impl Flags {
    fn from_args(args: impl IntoIterator<Item = ffi::OsString>) -> Result<Self, lzw16::Error> {
        let matches = command()
            .try_get_matches_from(args)
            .unwrap_or_else(|err| err.exit());

        let operation = if matches.get_flag("decompress") {
            Operation::Decompress
        } else {
            Operation::Compress
        };

        let byte_order = match matches.get_one::<String>("byte_order").map(String::as_str) {
            Some("little") => ByteOrder::Little,
            Some("big") => ByteOrder::Big,
            Some("native") | None => ByteOrder::native(),
            Some(_) => unreachable!("unparsed byte order"),
        };

        let input = match matches.get_one::<PathBuf>("input") {
            Some(p) if *p == PathBuf::from("-") => Input::Stdin,
            Some(p) => Input::File(p.clone()),
            None => return Err(invalid_input("missing input")),
        };

        let output = match matches.get_one::<PathBuf>("output") {
            Some(p) if *p == PathBuf::from("-") => Output::Stdout,
            Some(p) => Output::File(p.clone()),
            None => return Err(invalid_input("missing output")),
        };

        Ok(Flags {
            input,
            output,
            operation,
            byte_order,
        })
    }
}

enum CodingResult {
    Ok,
    Err(lzw16::Error),
    Panic,
}

impl CodingResult {
    fn catch_panic(op: fn() -> Result<(), lzw16::Error>) -> Self {
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
                eprintln!("lzw16: {}", err);
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
