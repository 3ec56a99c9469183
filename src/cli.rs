// Command-line front end for oxilzo.
//
// Subcommands decode a stream to raw bytes or a hex dump, trace the
// instructions of a stream, run the built-in sample, and print build
// configuration.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::hexdump::{self, DEFAULT_WIDTH};
use crate::io::{DecodeStats, decode_buffer, digest_hex};
use crate::lzo::decoder::{DecodeOptions, Decoder};
use crate::lzo::opcode::Op;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const BUF_SIZE: usize = 64 * 1024;

/// Sample stream run by the `demo` command.
pub const DEMO_STREAM: &[u8] = &[
    0x1b, 0x04, 0x11, 0x12, 0x11, 0x13, 0x14, 0x11, 0x14, 0x88, 0x00, 0x02, 0x12, 0x11, 0x12, 0x11,
    0x13, 0x87, 0x01, 0x14, 0x14, 0x11, 0x2c, 0x30, 0x00, 0x11, 0x00, 0x00,
];

// ---------------------------------------------------------------------------
// Output limit parsing (K, M, G binary suffixes)
// ---------------------------------------------------------------------------

/// Parse an output limit such as `4096`, `64K` or `1M` into a byte count.
fn parse_output_limit(s: &str) -> Result<usize, String> {
    let s = s.trim();
    let (digits, shift) = match s.char_indices().last() {
        None => return Err("empty output limit".into()),
        Some((i, 'k' | 'K')) => (&s[..i], 10),
        Some((i, 'm' | 'M')) => (&s[..i], 20),
        Some((i, 'g' | 'G')) => (&s[..i], 30),
        Some(_) => (s, 0),
    };
    let count: usize = digits
        .trim()
        .parse()
        .map_err(|e| format!("invalid output limit '{s}': {e}"))?;
    count
        .checked_mul(1usize << shift)
        .ok_or_else(|| format!("output limit '{s}' does not fit in memory"))
}

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// LZO1X stream decoder.
#[derive(Parser, Debug)]
#[command(
    name = "oxilzo",
    version,
    about = "LZO1X stream decoder",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Decode a compressed stream.
    Decode(DecodeArgs),
    /// Print every instruction of a compressed stream.
    Trace(TraceArgs),
    /// Decode the built-in sample stream and print it.
    Demo,
    /// Print build/configuration details.
    Config,
}

#[derive(Args, Debug)]
struct DecodeLimitArgs {
    /// Refuse to produce more than this many bytes (supports K/M/G suffix).
    #[arg(long = "max-output", value_parser = parse_output_limit)]
    max_output: Option<usize>,

    /// Reject streams that do not end with an end-of-stream marker.
    #[arg(long = "require-end-marker")]
    require_end_marker: bool,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Input file (default: stdin).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "input_pos")]
    input: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "output_pos")]
    output: Option<PathBuf>,

    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Check only (do not write output).
    #[arg(long = "check-only")]
    no_output: bool,

    /// Input is hex text instead of raw bytes.
    #[arg(long = "hex-input")]
    hex_input: bool,

    /// Write a hex dump instead of raw bytes.
    #[arg(long = "hex")]
    hex_output: bool,

    #[command(flatten)]
    limits: DecodeLimitArgs,

    /// Input file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    input_pos: Option<PathBuf>,

    /// Output file (positional form).
    #[arg(value_hint = ValueHint::FilePath)]
    output_pos: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TraceArgs {
    /// Compressed input file (default: stdin).
    #[arg(value_hint = ValueHint::FilePath)]
    input: Option<PathBuf>,

    /// Input is hex text instead of raw bytes.
    #[arg(long = "hex-input")]
    hex_input: bool,

    #[command(flatten)]
    limits: DecodeLimitArgs,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Decode,
    Trace,
    Demo,
    Config,
}

struct Options {
    command: Command,
    use_stdout: bool,
    force: bool,
    quiet: bool,
    verbose: u8,
    no_output: bool,
    hex_input: bool,
    hex_output: bool,
    max_output: Option<usize>,
    require_end_marker: bool,
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    json_output: bool,
}

impl Options {
    fn base(command: Command, cli: &Cli) -> Self {
        Self {
            command,
            use_stdout: false,
            force: cli.force,
            quiet: cli.quiet,
            verbose: cli.verbose.min(2),
            no_output: false,
            hex_input: false,
            hex_output: false,
            max_output: None,
            require_end_marker: false,
            input_file: None,
            output_file: None,
            json_output: cli.json_output,
        }
    }
}

fn resolve_options(cli: Cli) -> Options {
    match cli.command {
        Cmd::Decode(ref args) => Options {
            use_stdout: args.stdout,
            no_output: args.no_output,
            hex_input: args.hex_input,
            hex_output: args.hex_output,
            max_output: args.limits.max_output,
            require_end_marker: args.limits.require_end_marker,
            input_file: args.input.clone().or_else(|| args.input_pos.clone()),
            output_file: args.output.clone().or_else(|| args.output_pos.clone()),
            ..Options::base(Command::Decode, &cli)
        },
        Cmd::Trace(ref args) => Options {
            hex_input: args.hex_input,
            max_output: args.limits.max_output,
            require_end_marker: args.limits.require_end_marker,
            input_file: args.input.clone(),
            ..Options::base(Command::Trace, &cli)
        },
        Cmd::Demo => Options::base(Command::Demo, &cli),
        Cmd::Config => Options::base(Command::Config, &cli),
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("oxilzo".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

fn decode_options(opts: &Options) -> DecodeOptions {
    DecodeOptions {
        max_output_len: opts.max_output,
        require_end_marker: opts.require_end_marker,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Input helpers
// ---------------------------------------------------------------------------

fn read_input(opts: &Options) -> Result<Vec<u8>, String> {
    let raw = match &opts.input_file {
        Some(path) => {
            std::fs::read(path).map_err(|e| format!("input file: {}: {e}", path.display()))?
        }
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut buf)
                .map_err(|e| format!("stdin: {e}"))?;
            buf
        }
    };
    if !opts.hex_input {
        return Ok(raw);
    }
    let text = String::from_utf8_lossy(&raw);
    hexdump::parse_hex(&text).map_err(|e| format!("hex input: {e}"))
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("oxilzo version {version} (Rust), Copyright (C) oxilzo contributors");
    eprintln!("Licensed under the MIT License");

    let file_io = cfg!(feature = "file-io") as u8;
    let parallel = cfg!(feature = "parallel") as u8;
    let ptr_size = std::mem::size_of::<*const ()>();

    eprintln!("FILE_IO={file_io}");
    eprintln!("PARALLEL={parallel}");
    eprintln!("END_MARKER_DISTANCE={}", crate::lzo::END_MARKER_DISTANCE);
    eprintln!("HEX_WIDTH={DEFAULT_WIDTH}");
    eprintln!("sizeof(usize)={ptr_size}");

    0
}

// ---------------------------------------------------------------------------
// Decode command
// ---------------------------------------------------------------------------

fn cmd_decode(opts: &Options) -> i32 {
    let input = match read_input(opts) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("oxilzo: {e}");
            return 1;
        }
    };

    let mut decoded = Vec::new();
    let stats = match decode_buffer(&input, &mut decoded, decode_options(opts)) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("oxilzo: {e}");
            return 1;
        }
    };

    let mut output_writer: Box<dyn Write> = if opts.no_output {
        Box::new(io::sink())
    } else {
        match &opts.output_file {
            Some(path) if !opts.use_stdout => {
                if path.exists() && !opts.force {
                    eprintln!(
                        "oxilzo: output file exists, use -f to overwrite: {}",
                        path.display()
                    );
                    return 1;
                }
                match File::create(path) {
                    Ok(f) => Box::new(BufWriter::with_capacity(BUF_SIZE, f)),
                    Err(e) => {
                        eprintln!("oxilzo: output file: {}: {e}", path.display());
                        return 1;
                    }
                }
            }
            _ => Box::new(BufWriter::with_capacity(BUF_SIZE, io::stdout().lock())),
        }
    };

    let written = if opts.hex_output {
        let mut dump = hexdump::format_hex("", &decoded, DEFAULT_WIDTH);
        if !dump.is_empty() {
            dump.push('\n');
        }
        output_writer.write_all(dump.as_bytes())
    } else {
        output_writer.write_all(&decoded)
    };
    if let Err(e) = written.and_then(|()| output_writer.flush()) {
        eprintln!("oxilzo: write error: {e}");
        return 1;
    }

    report_stats(opts, "decode", &stats);
    0
}

fn report_stats(opts: &Options, command: &str, stats: &DecodeStats) {
    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "oxilzo: {command}: input size: {}, output size: {}, instructions: {}, end marker: {}",
            stats.input_size, stats.output_size, stats.instructions, stats.end_marker
        );
    }
    if opts.json_output {
        let json = serde_json::json!({
            "command": command,
            "input_size": stats.input_size,
            "declared_len": stats.declared_len,
            "output_size": stats.output_size,
            "instructions": stats.instructions,
            "end_marker": stats.end_marker,
            "output_sha256": stats.output_sha256.as_ref().map(digest_hex),
        });
        match serde_json::to_string_pretty(&json) {
            Ok(s) => eprintln!("{s}"),
            Err(e) => eprintln!("oxilzo: json: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Trace command
// ---------------------------------------------------------------------------

fn cmd_trace(opts: &Options) -> i32 {
    let input = match read_input(opts) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("oxilzo: {e}");
            return 1;
        }
    };

    let mut decoder = match Decoder::with_options(&input, decode_options(opts)) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("oxilzo: {e}");
            return 1;
        }
    };

    let stdout = io::stdout();
    let mut out = BufWriter::with_capacity(BUF_SIZE, stdout.lock());
    let _ = writeln!(out, "declared length: {}", decoder.declared_len());
    let _ = writeln!(
        out,
        "{:>6}  {:<3}  {:>4}  {:>8}  {:>8}  {:>3}  {:>8}",
        "offset", "op", "byte", "length", "distance", "lit", "output"
    );

    let mut status = 0;
    for step in decoder.by_ref() {
        let step = match step {
            Ok(s) => s,
            Err(e) => {
                let _ = out.flush();
                eprintln!("oxilzo: {e}");
                status = 1;
                break;
            }
        };
        let ins = step.instruction;
        let (length, distance) = match ins.op {
            Op::Literal { len } => (len.to_string(), "-".to_string()),
            Op::Copy { distance, len } => (len.to_string(), distance.to_string()),
            Op::End { len } => (len.to_string(), "end".to_string()),
        };
        let _ = writeln!(
            out,
            "{:>6}  {:<3}  0x{:02x}  {:>8}  {:>8}  {:>3}  {:>8}",
            ins.offset,
            ins.shape,
            ins.opcode,
            length,
            distance,
            step.trailing_literals,
            step.output_len
        );
    }
    if let Err(e) = out.flush() {
        eprintln!("oxilzo: write error: {e}");
        return 1;
    }

    if status == 0 && !opts.quiet {
        eprintln!(
            "oxilzo: trace: {} instructions, {} output bytes, end marker: {}",
            decoder.instructions_decoded(),
            decoder.output().len(),
            decoder.saw_end_marker()
        );
    }
    status
}

// ---------------------------------------------------------------------------
// Demo command
// ---------------------------------------------------------------------------

fn cmd_demo(opts: &Options) -> i32 {
    let mut decoded = Vec::new();
    let stats = match decode_buffer(DEMO_STREAM, &mut decoded, DecodeOptions::default()) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("oxilzo: demo: {e}");
            return 1;
        }
    };

    println!("Uncompressed Message : ");
    println!("{}", hexdump::format_hex("\t", &decoded, DEFAULT_WIDTH));

    report_stats(opts, "demo", &stats);
    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn log_filter(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let mut opts = resolve_options(cli);

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_filter(opts.verbose, opts.quiet)),
    )
    .format_timestamp(None)
    .format_target(false)
    .init();

    // Warn if -c overrides output filename.
    if opts.use_stdout
        && !opts.quiet
        && let Some(path) = opts.output_file.take()
    {
        log::warn!("-c option overrides output filename: {}", path.display());
    }

    let exit_code = match opts.command {
        Command::Decode => cmd_decode(&opts),
        Command::Trace => cmd_trace(&opts),
        Command::Demo => cmd_demo(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
