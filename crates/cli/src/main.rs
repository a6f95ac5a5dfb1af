//! Shared-bus coherence simulator CLI.
//!
//! This binary is the single entry point for trace-driven runs. It
//! performs:
//! 1. **Discovery:** one trace per core from `<prefix>_<pid>.data`,
//!    lexicographically sorted.
//! 2. **Configuration:** built from flags, optionally over a JSON base
//!    file (`--config`); flags override the file.
//! 3. **Run and report:** simulate to completion and print the sectioned
//!    statistics report.

use std::path::PathBuf;
use std::process;
use std::time::Instant;

use clap::Parser;

use snoopsim_core::config::{Config, Protocol};
use snoopsim_core::sim::trace;
use snoopsim_core::{SimReport, Simulator};

#[derive(Parser, Debug)]
#[command(
    name = "snoopsim",
    author,
    version,
    about = "Cycle-accurate shared-bus cache-coherence simulator",
    long_about = "Simulate per-core instruction traces over private caches kept coherent \
with MESI or Dragon on one shared bus.\n\nTraces live in one file per core named \
<prefix>_<pid>.data; pids follow the lexicographic order of the file names.\n\nExamples:\n  \
snoopsim traces/bodytrack\n  snoopsim --protocol dragon --cache-size 8192 --assoc 4 traces/fluid\n  \
snoopsim --config sweep.json --sections summary,bus traces/blackscholes"
)]
struct Cli {
    /// Trace prefix: `DIR/PREFIX` selecting every `DIR/PREFIX_<pid>.data`.
    trace_prefix: PathBuf,

    /// Coherence protocol (mesi or dragon).
    #[arg(short, long)]
    protocol: Option<Protocol>,

    /// JSON configuration file used as the base; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Total per-core cache size in bytes.
    #[arg(long)]
    cache_size: Option<u64>,

    /// Set associativity.
    #[arg(long)]
    assoc: Option<usize>,

    /// Cache block size in bytes.
    #[arg(long)]
    block_size: Option<u64>,

    /// Word size in bytes.
    #[arg(long)]
    word_size: Option<u64>,

    /// Address size in bytes (cost of a bus address broadcast).
    #[arg(long)]
    address_size: Option<u64>,

    /// Memory fetch/writeback latency in cycles.
    #[arg(long)]
    mem_latency: Option<u64>,

    /// Cache hit latency in cycles.
    #[arg(long)]
    hit_latency: Option<u64>,

    /// Cycles per word transferred on the bus.
    #[arg(long)]
    bus_word_latency: Option<u64>,

    /// Report sections to print (summary, cores, bus); default all.
    #[arg(long, value_delimiter = ',')]
    sections: Vec<String>,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = build_config(&cli);
    let programs = trace::load_programs(&cli.trace_prefix).unwrap_or_else(|e| fatal(&e));
    let mut sim = Simulator::new(&config, programs).unwrap_or_else(|e| fatal(&e));

    let started = Instant::now();
    if let Err(e) = sim.run() {
        fatal(&e);
    }
    let report = SimReport::from_simulator(&sim, started.elapsed().as_secs_f64());
    report.print_sections(&cli.sections);
}

/// Prints a single diagnostic and exits with status 1.
fn fatal(err: &dyn std::fmt::Display) -> ! {
    eprintln!("\n[!] FATAL: {err}");
    process::exit(1);
}

/// Assembles the configuration: JSON base if given, then flag overrides.
fn build_config(cli: &Cli) -> Config {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).unwrap_or_else(|e| {
                fatal(&format!("could not read config {}: {e}", path.display()))
            });
            serde_json::from_str(&text).unwrap_or_else(|e| {
                fatal(&format!("could not parse config {}: {e}", path.display()))
            })
        }
        None => Config::default(),
    };
    if let Some(protocol) = cli.protocol {
        config.protocol = protocol;
    }
    if let Some(cache_size) = cli.cache_size {
        config.cache_size = cache_size;
    }
    if let Some(assoc) = cli.assoc {
        config.assoc = assoc;
    }
    if let Some(block_size) = cli.block_size {
        config.block_size = block_size;
    }
    if let Some(word_size) = cli.word_size {
        config.word_size = word_size;
    }
    if let Some(address_size) = cli.address_size {
        config.address_size = address_size;
    }
    if let Some(mem_latency) = cli.mem_latency {
        config.mem_latency = mem_latency;
    }
    if let Some(hit_latency) = cli.hit_latency {
        config.cache_hit_latency = hit_latency;
    }
    if let Some(bus_word_latency) = cli.bus_word_latency {
        config.bus_word_tf_latency = bus_word_latency;
    }
    config
}

/// Installs the tracing subscriber; `RUST_LOG` overrides the verbosity
/// flags.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "snoopsim_core=debug",
        _ => "snoopsim_core=trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
