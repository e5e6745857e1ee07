use clap::Parser;
use cuckatoo::prelude::*;
use serde_json::json;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Cuckoo/Cuckatoo 42-cycle solver.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Header bytes in hex.
    header: String,
    /// Graph size exponent (2^n edges).
    n: u32,
    /// Number of bins the edge range is trimmed in.
    k: usize,
    /// Worker threads for bin trimming.
    #[arg(default_value_t = 1)]
    threads: usize,
    /// First attempt index.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Attempts before giving up.
    #[arg(long, default_value_t = 1)]
    max_attempts: u64,
    /// Wall-clock budget in seconds.
    #[arg(long)]
    time_budget_sec: Option<f64>,
    /// Bin layout: contiguous or strided.
    #[arg(long, default_value_t = BinLayout::Contiguous)]
    layout: BinLayout,
    /// Endpoint hasher: blake3 or siphash24.
    #[arg(long, default_value_t = HasherKind::Blake3)]
    hasher: HasherKind,
    /// Maximum trimming scans per bin.
    #[arg(long, default_value_t = SolverConfig::default().max_trim_rounds)]
    max_trim_rounds: usize,
    /// Maximum DFS states per attempt.
    #[arg(long, default_value_t = SolverConfig::default().max_search_states)]
    max_search_states: u64,
}

impl Cli {
    fn config(&self) -> Result<SolverConfig> {
        let time_budget = match self.time_budget_sec {
            Some(secs) => Some(
                Duration::try_from_secs_f64(secs)
                    .map_err(|e| SolverError::invalid(format!("time budget {secs}: {e}")))?,
            ),
            None => None,
        };
        Ok(SolverConfig {
            edge_bits: self.n,
            bins: self.k,
            threads: self.threads,
            layout: self.layout,
            hasher: self.hasher,
            start_attempt: self.seed,
            max_attempts: self.max_attempts,
            time_budget,
            max_trim_rounds: self.max_trim_rounds,
            max_search_states: self.max_search_states,
        })
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let header = match hex::decode(cli.header.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("invalid header hex: {e}");
            return ExitCode::from(2);
        }
    };

    let report = match cli.config().and_then(|cfg| solve(cfg, &header)) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(if e.is_invalid_parameter() { 2 } else { 1 });
        }
    };

    let out = json!({
        "status": if report.is_found() { "FOUND" } else { "NOT_FOUND" },
        "solution": report.solution().map(|s| &s.cycle),
        "attempt": report.solution().map(|s| s.attempt),
        "outcome": &report.outcome,
        "metrics": &report.counters,
        "build_info": {
            "version": env!("CARGO_PKG_VERSION"),
            "hasher": cli.hasher.to_string(),
            "layout": cli.layout.to_string(),
            "threads": cli.threads,
        },
    });
    println!("{out}");
    ExitCode::SUCCESS
}
