//! Parallel batch runs.
//!
//! Every scenario file is run `repeat` times on the rayon pool. Each run
//! builds its own simulation, so nothing is shared between threads except
//! the progress counter. Repeats double as a determinism check: all runs of
//! one scenario must end on the same state hash.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{HeadlessError, Result};
use crate::runner::{run_scenario, RunReport};
use crate::scenario::Scenario;

/// Settings for a batch.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Scenario files to run.
    pub scenarios: Vec<PathBuf>,
    /// Runs per scenario.
    pub repeat: u32,
    /// Tick override applied to every scenario.
    pub ticks: Option<u64>,
    /// Worker threads (0 = rayon default).
    pub threads: usize,
}

impl BatchConfig {
    /// Run each of `scenarios` once with their own tick counts.
    #[must_use]
    pub fn new(scenarios: Vec<PathBuf>) -> Self {
        Self {
            scenarios,
            repeat: 1,
            ticks: None,
            threads: 0,
        }
    }

    /// Collect every `.ron` file in `dir`, sorted by name.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(HeadlessError::FileNotFound(dir.display().to_string()));
        }
        let mut scenarios = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "ron") {
                scenarios.push(path);
            }
        }
        scenarios.sort();
        Ok(Self::new(scenarios))
    }
}

/// Outcome of all runs of one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    /// File the scenario came from.
    pub path: PathBuf,
    /// Report of the first run, if it succeeded.
    pub report: Option<RunReport>,
    /// Whether every repeat ended on the same hash.
    pub deterministic: bool,
    /// Load or run error, rendered.
    pub error: Option<String>,
}

/// Result of a whole batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResults {
    /// One entry per scenario file, in input order.
    pub outcomes: Vec<ScenarioOutcome>,
    /// Scenarios that loaded and ran.
    pub succeeded: usize,
    /// Scenarios whose repeats disagreed.
    pub diverged: usize,
    /// Wall-clock time in milliseconds.
    pub elapsed_ms: u128,
}

impl BatchResults {
    /// True when every scenario ran and replayed identically.
    #[must_use]
    pub fn all_ok(&self) -> bool {
        self.succeeded == self.outcomes.len() && self.diverged == 0
    }
}

/// Run a batch.
pub fn run_batch(config: &BatchConfig) -> BatchResults {
    let start = Instant::now();
    let done = AtomicU32::new(0);
    let total = config.scenarios.len();
    info!(scenarios = total, repeat = config.repeat, "Starting batch run");

    let work = || {
        config
            .scenarios
            .par_iter()
            .map(|path| {
                let outcome = run_one(path, config);
                let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(finished, total, path = %path.display(), "Scenario done");
                outcome
            })
            .collect::<Vec<_>>()
    };

    let outcomes = if config.threads == 0 {
        work()
    } else {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
        {
            Ok(pool) => pool.install(work),
            Err(err) => {
                warn!(%err, "Could not build thread pool, using the global one");
                work()
            }
        }
    };

    let succeeded = outcomes.iter().filter(|o| o.error.is_none()).count();
    let diverged = outcomes
        .iter()
        .filter(|o| o.error.is_none() && !o.deterministic)
        .count();
    let results = BatchResults {
        outcomes,
        succeeded,
        diverged,
        elapsed_ms: start.elapsed().as_millis(),
    };
    info!(
        succeeded = results.succeeded,
        diverged = results.diverged,
        elapsed_ms = results.elapsed_ms,
        "Batch complete"
    );
    results
}

fn run_one(path: &Path, config: &BatchConfig) -> ScenarioOutcome {
    let runs = || -> Result<Vec<RunReport>> {
        let scenario = Scenario::load(path)?;
        (0..config.repeat.max(1))
            .map(|_| run_scenario(&scenario, config.ticks, None))
            .collect()
    };

    match runs() {
        Ok(mut reports) => {
            let first_hash = reports.first().map(|r| r.state_hash);
            let deterministic = reports.iter().all(|r| Some(r.state_hash) == first_hash);
            if !deterministic {
                warn!(path = %path.display(), "Repeated runs ended on different states");
            }
            ScenarioOutcome {
                path: path.to_path_buf(),
                report: if reports.is_empty() {
                    None
                } else {
                    Some(reports.swap_remove(0))
                },
                deterministic,
                error: None,
            }
        }
        Err(err) => {
            warn!(path = %path.display(), %err, "Scenario failed");
            ScenarioOutcome {
                path: path.to_path_buf(),
                report: None,
                deterministic: false,
                error: Some(err.to_string()),
            }
        }
    }
}
