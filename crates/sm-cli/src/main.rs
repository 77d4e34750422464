//! Sigmatch CLI
//!
//! CLI tool for compiling signature lists and running them against data.

mod bench;
mod compile;
mod config;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use compile::{compile_set, read_data};
use config::{Config, Overrides};

#[derive(Parser)]
#[command(name = "sigmatch")]
#[command(about = "Signature prequalification with Aho-Corasick and radix prefix matching")]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ListArgs {
    /// Input signature list files
    #[arg(short, long)]
    input: Vec<String>,

    /// Match patterns without regard to ASCII case
    #[arg(long)]
    nocase: bool,

    /// Report every pattern ending at a position, not just the longest
    #[arg(long)]
    match_all: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and build signature lists, then print counts
    Check {
        #[command(flatten)]
        lists: ListArgs,
    },

    /// Stream a file through the pattern automaton
    Scan {
        #[command(flatten)]
        lists: ListArgs,

        /// Data file to scan
        #[arg(short, long)]
        data: PathBuf,

        /// Bytes fed per consume call
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Look up an address in the network signatures
    Lookup {
        #[command(flatten)]
        lists: ListArgs,

        /// IPv4 or IPv6 address, optionally with /mask
        #[arg(short, long)]
        addr: String,
    },

    /// Measure scan throughput
    Bench {
        #[command(flatten)]
        lists: ListArgs,

        /// Data file to scan
        #[arg(short, long)]
        data: PathBuf,

        /// Number of timed passes
        #[arg(long, default_value = "100")]
        iterations: usize,

        /// Bytes fed per consume call
        #[arg(long)]
        chunk_size: Option<usize>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config_path = cli.config.as_deref();
    let verbose = cli.verbose;

    let result = match cli.command {
        Commands::Check { lists } => {
            resolve(config_path, lists, None).and_then(|config| cmd_check(&config, verbose))
        }
        Commands::Scan {
            lists,
            data,
            chunk_size,
        } => resolve(config_path, lists, chunk_size).and_then(|config| cmd_scan(&config, &data)),
        Commands::Lookup { lists, addr } => {
            resolve(config_path, lists, None).and_then(|config| cmd_lookup(&config, &addr))
        }
        Commands::Bench {
            lists,
            data,
            iterations,
            chunk_size,
        } => resolve(config_path, lists, chunk_size)
            .and_then(|config| cmd_bench(&config, &data, iterations)),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn resolve(path: Option<&Path>, lists: ListArgs, chunk_size: Option<usize>) -> Result<Config, String> {
    Config::resolve(
        path,
        Overrides {
            lists: lists.input,
            nocase: lists.nocase,
            match_all: lists.match_all,
            chunk_size,
        },
    )
}

fn cmd_check(config: &Config, verbose: bool) -> Result<(), String> {
    let (set, stats) = compile_set(&config.lists, &config.compile_options(), verbose)?;
    let set_stats = set.stats();

    println!("Compiled {} signature lists", config.lists.len());
    println!("  Lines:      {}", stats.lines);
    println!(
        "  Signatures: {} -> {} (dedupe removed {})",
        stats.signatures_before, stats.signatures_after, stats.deduped
    );
    println!(
        "  Patterns:   {} ({} states)",
        set_stats.patterns, set_stats.states
    );
    println!("  Networks:   {}", set_stats.networks);
    println!(
        "  Time:       {:.1}ms (parse: {:.1}ms, build: {:.1}ms)",
        stats.total_ms, stats.parse_ms, stats.build_ms
    );

    Ok(())
}

fn cmd_scan(config: &Config, data_path: &Path) -> Result<(), String> {
    let (set, _) = compile_set(&config.lists, &config.compile_options(), false)?;
    let data = read_data(data_path)?;

    let flags = set.consume_flags();
    let mut ctx = set.scanner();
    let mut hits = Vec::new();
    for chunk in data.chunks(config.chunk_size) {
        ctx.consume(chunk, flags)
            .map_err(|e| format!("Scan failed: {}", e))?;
        set.collect_hits(&mut ctx, &mut hits);
    }

    for hit in &hits {
        let message = set
            .signature_by_id(hit.id)
            .and_then(|s| s.message.as_deref())
            .unwrap_or("");
        println!("{:>10}  len={:<4} id={:<8} {}", hit.offset, hit.len, hit.id, message);
    }
    println!(
        "Scanned {} bytes in {}-byte chunks: {} hits",
        ctx.processed(),
        config.chunk_size,
        hits.len()
    );

    Ok(())
}

fn cmd_lookup(config: &Config, addr: &str) -> Result<(), String> {
    let (set, _) = compile_set(&config.lists, &config.compile_options(), false)?;
    let invalid = |e| format!("Invalid address '{}': {}", addr, e);

    let exact = set.exact(addr).map_err(invalid)?;
    let closest = set.lookup(addr).map_err(invalid)?;
    let covering = set.covering(addr).map_err(invalid)?;

    let describe = |sigs: &[&sm_compiler::Signature]| -> String {
        if sigs.is_empty() {
            return "(none)".to_string();
        }
        sigs.iter()
            .map(|s| match &s.message {
                Some(message) => format!("{} \"{}\"", s.id, message),
                None => s.id.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    };

    println!("Address: {}", addr);
    println!("  Exact:    {}", describe(&exact));
    println!("  Closest:  {}", describe(&closest));
    println!("  Covering: {}", describe(&covering));

    Ok(())
}

fn cmd_bench(config: &Config, data_path: &Path, iterations: usize) -> Result<(), String> {
    let (set, stats) = compile_set(&config.lists, &config.compile_options(), false)?;
    let data = read_data(data_path)?;

    println!(
        "Compiled {} signatures in {:.1}ms",
        stats.signatures_after, stats.total_ms
    );

    bench::run(
        &set,
        &data,
        &bench::BenchOptions {
            iterations,
            chunk_size: config.chunk_size,
        },
    )
}
