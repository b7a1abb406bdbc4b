//! Headless movement scenario runner.
//!
//! Reports go to stdout as JSON, logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Run one scenario and print its report
//! cargo run -p muster_headless -- run --scenario scenarios/wall_crossing.ron
//!
//! # Override the tick count and tuning
//! cargo run -p muster_headless -- run -s scenarios/retask.ron --ticks 300 --config tuning.ron
//!
//! # Validate a scenario without running it
//! cargo run -p muster_headless -- check --scenario scenarios/retask.ron
//!
//! # Run every scenario in a directory three times each
//! cargo run -p muster_headless -- batch --dir scenarios --repeat 3
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use muster_core::config::SimConfig;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use muster_headless::{
    batch::{run_batch, BatchConfig},
    runner::run_scenario,
    scenario::Scenario,
    HeadlessError, Result,
};

#[derive(Parser)]
#[command(name = "muster_headless")]
#[command(about = "Headless runner for group movement scenarios")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single scenario
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Ticks to run instead of the scenario's own count
        #[arg(short, long)]
        ticks: Option<u64>,

        /// RON tuning file overriding the scenario's config
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Parse and validate a scenario
    Check {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,
    },
    /// Run every scenario in a directory in parallel
    Batch {
        /// Directory of `.ron` scenarios
        #[arg(short, long, default_value = "scenarios")]
        dir: PathBuf,

        /// Runs per scenario; repeats must agree on the final hash
        #[arg(short, long, default_value = "1")]
        repeat: u32,

        /// Ticks to run instead of each scenario's own count
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Worker threads (0 = one per core)
        #[arg(short = 'j', long, default_value = "0")]
        threads: usize,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v when set.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let outcome = match cli.command {
        Commands::Run {
            scenario,
            ticks,
            config,
        } => cmd_run(&scenario, ticks, config.as_deref(), cli.pretty),
        Commands::Check { scenario } => cmd_check(&scenario, cli.pretty),
        Commands::Batch {
            dir,
            repeat,
            ticks,
            threads,
        } => cmd_batch(&dir, repeat, ticks, threads, cli.pretty),
    };

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn emit<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

fn load_config(path: &Path) -> Result<SimConfig> {
    if !path.exists() {
        return Err(HeadlessError::FileNotFound(path.display().to_string()));
    }
    let text = std::fs::read_to_string(path)?;
    Ok(SimConfig::from_ron_str(&text)?)
}

/// Run one scenario and print its report.
fn cmd_run(
    path: &Path,
    ticks: Option<u64>,
    config: Option<&Path>,
    pretty: bool,
) -> Result<bool> {
    let scenario = Scenario::load(path)?;
    let config = config.map(load_config).transpose()?;
    let report = run_scenario(&scenario, ticks, config)?;
    emit(&report, pretty)?;
    Ok(true)
}

#[derive(Serialize)]
struct CheckSummary<'a> {
    name: &'a str,
    description: &'a str,
    units: usize,
    orders: usize,
    ticks: u64,
    blocked_cells: usize,
}

/// Validate a scenario and print a short summary.
fn cmd_check(path: &Path, pretty: bool) -> Result<bool> {
    let scenario = Scenario::load(path)?;
    let grid = scenario.build_grid()?;
    let blocked_cells = (0..scenario.grid.height)
        .flat_map(|y| (0..scenario.grid.width).map(move |x| (x, y)))
        .filter(|&(x, y)| !grid.is_walkable(x, y))
        .count();
    emit(
        &CheckSummary {
            name: &scenario.name,
            description: &scenario.description,
            units: scenario.units.len(),
            orders: scenario.orders.len(),
            ticks: scenario.ticks,
            blocked_cells,
        },
        pretty,
    )?;
    Ok(true)
}

/// Run a directory of scenarios. Exits non-zero when any fail or diverge.
fn cmd_batch(
    dir: &Path,
    repeat: u32,
    ticks: Option<u64>,
    threads: usize,
    pretty: bool,
) -> Result<bool> {
    let mut config = BatchConfig::from_dir(dir)?;
    config.repeat = repeat;
    config.ticks = ticks;
    config.threads = threads;
    let results = run_batch(&config);
    emit(&results, pretty)?;
    Ok(results.all_ok())
}
