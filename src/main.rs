#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use energy_bench::config::HarnessConfig;
use energy_bench::{HarnessResult, discover_cmd, measure_cmd, monitor_cmd, probe_cmd};

#[derive(Parser, Debug)]
#[command(name = "energy-bench")]
#[command(about = "Measure the energy of cross-language benchmark implementations", long_about = None)]
struct Cli {
    /// Enable verbose logging (or set ENERGY_BENCH_LOG)
    #[arg(long, global = true)]
    verbose: bool,

    /// Path to a TOML config file (default: ./energy-bench.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Settings that override the config file.
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Prometheus base URL
    #[arg(long, env = "ENERGY_BENCH_PROMETHEUS_URL")]
    prometheus_url: Option<String>,
    /// PromQL expression returning aggregate power in watts
    #[arg(long, env = "ENERGY_BENCH_QUERY")]
    query: Option<String>,
    /// Benchmark root containing one directory per language
    #[arg(long)]
    root: Option<PathBuf>,
    /// Language directories to scan (repeatable or comma separated)
    #[arg(long = "language", value_delimiter = ',')]
    languages: Vec<String>,
    /// Nominal sampling interval in seconds
    #[arg(long)]
    interval: Option<f64>,
    /// Idle power baseline in watts
    #[arg(long)]
    idle_watts: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build and run every discovered benchmark and write the result table
    Measure {
        #[command(flatten)]
        overrides: Overrides,
        /// Number of measured run repetitions per unit
        #[arg(long)]
        runs: Option<usize>,
        /// Result table path (CSV)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Write one JSON line per invocation to this file
        #[arg(long)]
        repetition_log: Option<PathBuf>,
        /// Kill any build or run invocation after this many seconds
        #[arg(long)]
        timeout: Option<f64>,
        /// Only measure this algorithm
        #[arg(long)]
        only: Option<String>,
        /// Run units even when their build failed (e.g. against a stale binary)
        #[arg(long)]
        run_after_failed_build: bool,
    },

    /// List discovered benchmark units
    Discover {
        #[command(flatten)]
        overrides: Overrides,
        /// Print one unit per line, ordered by language
        #[arg(long)]
        by_language: bool,
        /// Only list this algorithm
        #[arg(long)]
        only: Option<String>,
    },

    /// Take a few power readings from the telemetry source
    Probe {
        #[command(flatten)]
        overrides: Overrides,
        /// Number of readings
        #[arg(long, default_value_t = 10)]
        count: usize,
    },

    /// Measure the energy of a single command
    Monitor {
        #[command(flatten)]
        overrides: Overrides,
        /// Working directory for the command
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Kill the command after this many seconds
        #[arg(long)]
        timeout: Option<f64>,
        /// Command and arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("ENERGY_BENCH_LOG").unwrap_or_else(|_| {
        if verbose { "energy_bench=debug".to_string() } else { "energy_bench=info".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::ACTIVE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn load_config(path: Option<&PathBuf>, overrides: Overrides) -> HarnessResult<HarnessConfig> {
    let mut cfg = HarnessConfig::resolve(path.map(PathBuf::as_path))?;
    if let Some(url) = overrides.prometheus_url {
        cfg.prometheus_url = url;
    }
    if let Some(query) = overrides.query {
        cfg.query = query;
    }
    if let Some(root) = overrides.root {
        cfg.root = root;
    }
    if !overrides.languages.is_empty() {
        cfg.languages = overrides.languages;
    }
    if let Some(interval) = overrides.interval {
        cfg.sample_interval_secs = interval;
    }
    if let Some(idle) = overrides.idle_watts {
        cfg.idle_power_watts = idle;
    }
    Ok(cfg)
}

fn run(cli: Cli) -> HarnessResult<()> {
    let config_path = cli.config.as_ref();
    match cli.command {
        Commands::Measure { overrides, runs, output, repetition_log, timeout, only, run_after_failed_build } => {
            let mut cfg = load_config(config_path, overrides)?;
            if let Some(runs) = runs {
                cfg.runs = runs;
            }
            if let Some(output) = output {
                cfg.output = output;
            }
            if repetition_log.is_some() {
                cfg.repetition_log = repetition_log;
            }
            if timeout.is_some() {
                cfg.run_timeout_secs = timeout;
            }
            if only.is_some() {
                cfg.only = only;
            }
            if run_after_failed_build {
                cfg.skip_run_on_failed_build = false;
            }
            measure_cmd::run(cfg)
        }
        Commands::Discover { overrides, by_language, only } => {
            let mut cfg = load_config(config_path, overrides)?;
            if only.is_some() {
                cfg.only = only;
            }
            discover_cmd::run(cfg, by_language)
        }
        Commands::Probe { overrides, count } => {
            let cfg = load_config(config_path, overrides)?;
            probe_cmd::run(cfg, count)
        }
        Commands::Monitor { overrides, dir, timeout, command } => {
            let mut cfg = load_config(config_path, overrides)?;
            if timeout.is_some() {
                cfg.run_timeout_secs = timeout;
            }
            monitor_cmd::run(cfg, dir, command)
        }
    }
}

fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
