//! hashpipe command-line front end.
//!
//! Provides the `hashpipe` binary:
//!
//! - `compile` turns a graph file into program text and, optionally, OpenCL
//!   host source;
//! - `run` interprets program text on one set of inputs;
//! - `search` brute-forces an input whose output equals a target.
//!
//! Byte strings on the command line and in output are hex. Logs go to stderr
//! so stdout stays machine-readable with `--json`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing::debug;

use hashpipe_check::search::{CandidateStrategy, SearchConfig, DEFAULT_WIDTH};
use hashpipe_check::{CompileError, InterpreterConfig, SearchError};
use hashpipe_codegen::{EmitError, EmitOptions};
use hashpipe_core::{parse_program, PipelineGraph, Program, SlotId};

const EXIT_OK: i32 = 0;
const EXIT_FAILED: i32 = 1;
const EXIT_NOT_FOUND: i32 = 2;
const EXIT_IO: i32 = 3;

/// Hash pipeline compiler, interpreter and brute-force search.
#[derive(Parser)]
#[command(name = "hashpipe", about = "Hash pipeline compiler, interpreter and search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a graph file to program text, optionally emitting host source.
    Compile(CompileArgs),
    /// Run program text on the given inputs and print every Result value.
    Run(RunArgs),
    /// Search for an input whose program output equals the target.
    Search(SearchArgs),
}

#[derive(Args)]
struct CompileArgs {
    /// Graph file (JSON).
    #[arg(short, long)]
    graph: PathBuf,

    /// Write program text here instead of stdout.
    #[arg(short, long)]
    program: Option<PathBuf>,

    /// Write OpenCL host source here.
    #[arg(short, long)]
    emit: Option<PathBuf>,

    /// Directory with prologue.cpp, mid.cpp and epilogue.cpp (default: built in).
    #[arg(long, requires = "emit")]
    fragments: Option<PathBuf>,
}

#[derive(Args)]
struct RunArgs {
    /// Program text file.
    #[arg(short, long)]
    program: PathBuf,

    /// Input value as hex, one per Input instruction in program order.
    #[arg(short, long = "input", value_name = "HEX")]
    inputs: Vec<String>,

    /// Record and print the per-instruction trace.
    #[arg(long)]
    trace: bool,

    /// Print machine-readable JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SearchArgs {
    /// Program text file.
    #[arg(short, long)]
    program: PathBuf,

    /// Target value as hex.
    #[arg(short, long, value_name = "HEX")]
    target: String,

    /// First integer candidate.
    #[arg(long)]
    start: Option<u64>,

    /// End of the integer range (exclusive; default: every value of the width).
    #[arg(long)]
    end: Option<u64>,

    /// Candidate width in bytes.
    #[arg(long)]
    width: Option<usize>,

    /// File with one candidate per line.
    #[arg(long, conflicts_with_all = ["start", "end", "width", "sample_seed", "sample_count"])]
    wordlist: Option<PathBuf>,

    /// Seed for sampled candidates.
    #[arg(long, requires = "sample_count", conflicts_with_all = ["start", "end"])]
    sample_seed: Option<u64>,

    /// Number of sampled candidates.
    #[arg(long, requires = "sample_seed")]
    sample_count: Option<u64>,

    /// Worker threads (0 = one per core).
    #[arg(long)]
    threads: Option<usize>,

    /// Candidates claimed per worker at a time.
    #[arg(long)]
    chunk_size: Option<u64>,

    /// Stop after examining this many candidates.
    #[arg(long)]
    max_candidates: Option<u64>,

    /// Stop after this many milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Search config file (JSON); flags override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON.
    #[arg(long)]
    json: bool,
}

fn main() {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Compile(args) => run_compile(&args),
        Commands::Run(args) => run_program(&args),
        Commands::Search(args) => run_search(&args),
    };
    process::exit(result.unwrap_or_else(|code| code));
}

// ---------------------------------------------------------------------------
// compile
// ---------------------------------------------------------------------------

/// Execute the compile subcommand.
///
/// Returns exit code: 0 = success, 1 = invalid graph, 3 = I/O error.
fn run_compile(args: &CompileArgs) -> Result<i32, i32> {
    let graph = load_graph(&args.graph)?;

    let program = match &args.emit {
        Some(out) => {
            let options = EmitOptions {
                fragments: args.fragments.clone(),
            };
            let emitted = match hashpipe_codegen::compile_and_emit(&graph, &options) {
                Ok(emitted) => emitted,
                Err(EmitError::Compile(err)) => return Err(report_compile_error(&err)),
                Err(err @ EmitError::Io { .. }) => {
                    eprintln!("Error: {err}");
                    return Err(EXIT_IO);
                }
            };
            if let Err(err) = emitted.write_to(out) {
                eprintln!("Error: {err}");
                return Err(EXIT_IO);
            }
            emitted.program
        }
        None => hashpipe_check::compile(&graph).map_err(|err| report_compile_error(&err))?,
    };

    let text = program.to_string();
    match &args.program {
        Some(path) => write_file(path, &text)?,
        None => print!("{text}"),
    }
    Ok(EXIT_OK)
}

fn load_graph(path: &Path) -> Result<PipelineGraph, i32> {
    let text = read_file(path)?;
    PipelineGraph::from_json(&text).map_err(|err| {
        eprintln!("Error: invalid graph file '{}': {err}", path.display());
        EXIT_FAILED
    })
}

fn report_compile_error(err: &CompileError) -> i32 {
    let diagnostics = err.diagnostics();
    if diagnostics.is_empty() {
        eprintln!("Error: {err}");
    } else {
        eprintln!("Compilation failed with {} error(s):", diagnostics.len());
        for diagnostic in diagnostics {
            eprintln!("  - {diagnostic}");
        }
    }
    EXIT_FAILED
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

/// Execute the run subcommand.
///
/// Returns exit code: 0 = success, 1 = parse or runtime error, 3 = I/O error.
fn run_program(args: &RunArgs) -> Result<i32, i32> {
    let program = load_program(&args.program)?;

    let slots = program.input_slots();
    if args.inputs.len() != slots.len() {
        eprintln!(
            "Error: program has {} Input instruction(s), {} --input value(s) given",
            slots.len(),
            args.inputs.len()
        );
        return Err(EXIT_FAILED);
    }
    let values = args
        .inputs
        .iter()
        .map(|text| decode_hex("input", text))
        .collect::<Result<Vec<_>, _>>()?;
    let inputs: Vec<(SlotId, &[u8])> = slots
        .iter()
        .copied()
        .zip(values.iter().map(Vec::as_slice))
        .collect();

    let config = InterpreterConfig {
        trace_enabled: args.trace,
    };
    let execution = hashpipe_check::execute(&program, &inputs, config).map_err(|err| {
        eprintln!("Error: {err}");
        EXIT_FAILED
    })?;

    if args.json {
        let results: Vec<_> = execution
            .results
            .iter()
            .map(|(slot, value)| json!({ "slot": slot.0, "value": hex::encode(value) }))
            .collect();
        let output = json!({ "results": results, "trace": execution.trace });
        println!("{}", to_pretty(&output));
    } else {
        for (slot, value) in &execution.results {
            println!("{slot} {}", hex::encode(value));
        }
        for entry in execution.trace.iter().flatten() {
            let inputs: Vec<String> = entry.inputs.iter().map(ToString::to_string).collect();
            let output = entry.output.map(|slot| slot.to_string()).unwrap_or_default();
            eprintln!(
                "#{} {} ({}) -> ({}) {} byte(s)",
                entry.index,
                entry.opcode,
                inputs.join(" "),
                output,
                entry.len
            );
        }
    }
    Ok(EXIT_OK)
}

fn load_program(path: &Path) -> Result<Program, i32> {
    let text = read_file(path)?;
    parse_program(&text).map_err(|err| {
        eprintln!("Error: {}: {err}", path.display());
        EXIT_FAILED
    })
}

// ---------------------------------------------------------------------------
// search
// ---------------------------------------------------------------------------

/// Execute the search subcommand.
///
/// Returns exit code: 0 = found, 1 = error, 2 = not found, 3 = I/O error.
fn run_search(args: &SearchArgs) -> Result<i32, i32> {
    let program = load_program(&args.program)?;
    let target = decode_hex("target", &args.target)?;

    let base = match &args.config {
        Some(path) => {
            let text = read_file(path)?;
            serde_json::from_str::<SearchConfig>(&text).map_err(|err| {
                eprintln!("Error: invalid search config '{}': {err}", path.display());
                EXIT_FAILED
            })?
        }
        None => SearchConfig::default(),
    };
    let config = search_config(args, base)?;
    debug!(?config, "search config resolved");

    match hashpipe_check::search(&program, target, config) {
        Ok(outcome) => {
            if args.json {
                let output = json!({
                    "found": true,
                    "position": outcome.position,
                    "candidate": hex::encode(&outcome.candidate),
                    "integer": outcome.as_integer(),
                    "matched": outcome.matched,
                    "examined": outcome.examined,
                });
                println!("{}", to_pretty(&output));
            } else {
                let matched: Vec<String> =
                    outcome.matched.iter().map(ToString::to_string).collect();
                println!("found: {}", hex::encode(&outcome.candidate));
                if let Some(value) = outcome.as_integer() {
                    println!("integer: {value}");
                }
                println!("position: {}", outcome.position);
                println!("matched: {}", matched.join(", "));
                println!("examined: {}", outcome.examined);
            }
            Ok(EXIT_OK)
        }
        Err(SearchError::NotFound { examined, reason }) => {
            if args.json {
                let output = json!({ "found": false, "examined": examined, "reason": reason });
                println!("{}", to_pretty(&output));
            } else {
                println!("not found: {reason} after examining {examined} candidate(s)");
            }
            Ok(EXIT_NOT_FOUND)
        }
        Err(err) => {
            eprintln!("Error: {err}");
            Err(EXIT_FAILED)
        }
    }
}

/// Applies command-line flags on top of `base`.
fn search_config(args: &SearchArgs, mut base: SearchConfig) -> Result<SearchConfig, i32> {
    base.strategy = strategy(args, base.strategy)?;
    if let Some(threads) = args.threads {
        base.threads = threads;
    }
    if let Some(chunk_size) = args.chunk_size {
        base.chunk_size = chunk_size;
    }
    if args.max_candidates.is_some() {
        base.budget.max_candidates = args.max_candidates;
    }
    if args.timeout_ms.is_some() {
        base.budget.max_duration_ms = args.timeout_ms;
    }
    Ok(base)
}

fn strategy(args: &SearchArgs, base: CandidateStrategy) -> Result<CandidateStrategy, i32> {
    if let Some(path) = &args.wordlist {
        let bytes = fs::read(path).map_err(|err| {
            eprintln!("Error: failed to read '{}': {err}", path.display());
            EXIT_IO
        })?;
        return Ok(CandidateStrategy::Wordlist {
            words: split_words(&bytes),
        });
    }

    let base_width = match base {
        CandidateStrategy::Range { width, .. } | CandidateStrategy::Sampled { width, .. } => width,
        CandidateStrategy::Wordlist { .. } => DEFAULT_WIDTH,
    };

    if let (Some(seed), Some(count)) = (args.sample_seed, args.sample_count) {
        return Ok(CandidateStrategy::Sampled {
            seed,
            count,
            width: args.width.unwrap_or(base_width),
        });
    }

    if args.start.is_none() && args.end.is_none() && args.width.is_none() {
        return Ok(base);
    }

    let width = args.width.unwrap_or(base_width);
    let (base_start, base_end) = match base {
        // A new width invalidates the configured end.
        CandidateStrategy::Range { start, end, .. } if args.width.is_none() => (start, Some(end)),
        CandidateStrategy::Range { start, .. } => (start, None),
        _ => (0, None),
    };
    Ok(CandidateStrategy::Range {
        start: args.start.unwrap_or(base_start),
        end: args.end.or(base_end).unwrap_or_else(|| full_range_end(width)),
        width,
    })
}

/// One past the largest integer that fits in `width` bytes, saturated.
fn full_range_end(width: usize) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        1u64 << (8 * width)
    }
}

/// Splits a wordlist into lines, dropping `\r` line ends and empty lines.
fn split_words(bytes: &[u8]) -> Vec<Vec<u8>> {
    bytes
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(<[u8]>::to_vec)
        .collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, i32> {
    fs::read_to_string(path).map_err(|err| {
        eprintln!("Error: failed to read '{}': {err}", path.display());
        EXIT_IO
    })
}

fn write_file(path: &Path, contents: &str) -> Result<(), i32> {
    fs::write(path, contents).map_err(|err| {
        eprintln!("Error: failed to write '{}': {err}", path.display());
        EXIT_IO
    })
}

fn decode_hex(what: &str, text: &str) -> Result<Vec<u8>, i32> {
    hex::decode(text.trim()).map_err(|err| {
        eprintln!("Error: {what} is not valid hex: {err}");
        EXIT_FAILED
    })
}

fn to_pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize result: {}\"}}", e))
}
