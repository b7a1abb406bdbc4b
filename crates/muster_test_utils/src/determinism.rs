//! Replay harness for checking that movement is reproducible.
//!
//! Two simulations built the same way and given the same orders must agree
//! on [`Simulation::state_hash`] after every fixed step. The core makes that
//! possible by using [`muster_core::math::Fixed`] for all movement math,
//! walking entities and agents in id order and updating groups in creation
//! order. The helpers here build several copies of a scenario, step them in
//! lockstep or on separate threads, and report where they part ways.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::thread;

use muster_core::simulation::Simulation;

/// Final hashes of several replays of one scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashReport {
    /// One hash per replay, in run order.
    pub hashes: Vec<u64>,
    /// Fixed steps each replay ran.
    pub ticks: u64,
}

impl HashReport {
    /// True when every replay ended on the same hash.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.distinct().len() <= 1
    }

    /// Distinct hashes, ascending.
    #[must_use]
    pub fn distinct(&self) -> BTreeSet<u64> {
        self.hashes.iter().copied().collect()
    }

    /// # Panics
    ///
    /// Panics listing every hash if the replays disagree.
    pub fn assert_deterministic(&self) {
        assert!(
            self.is_deterministic(),
            "{} replays of {} ticks ended on {} different states: {:?}",
            self.hashes.len(),
            self.ticks,
            self.distinct().len(),
            self.hashes
        );
    }
}

/// Build `runs` copies of some state with `setup`, step each `ticks` times
/// and hash the result.
///
/// Generic over the state so tests can wrap a simulation with their own
/// order schedule.
pub fn verify_determinism<S>(
    runs: usize,
    ticks: u64,
    setup: impl Fn() -> S,
    step: impl Fn(&mut S),
    hash: impl Fn(&S) -> u64,
) -> HashReport {
    let hashes = (0..runs)
        .map(|_| {
            let mut state = setup();
            (0..ticks).for_each(|_| step(&mut state));
            hash(&state)
        })
        .collect();
    HashReport { hashes, ticks }
}

fn advance(sim: &mut Simulation) {
    if let Err(err) = sim.fixed_step() {
        panic!("fixed step {} failed: {err}", sim.tick());
    }
}

/// Replay a simulation twice for `ticks` fixed steps.
pub fn verify_simulation_determinism(setup: impl Fn() -> Simulation, ticks: u64) -> HashReport {
    verify_determinism(2, ticks, setup, advance, Simulation::state_hash)
}

/// Replay `copies` simulations concurrently, one per scoped thread.
///
/// `Simulation` is not `Send`, so each thread builds, steps and drops its
/// own copy and hands back only the hash.
///
/// # Panics
///
/// Re-raises a panic from any replay thread.
pub fn run_parallel_simulations_scoped(
    setup: impl Fn() -> Simulation + Sync,
    copies: usize,
    ticks: u64,
) -> HashReport {
    let setup = &setup;
    let hashes = thread::scope(|scope| {
        let workers: Vec<_> = (0..copies)
            .map(|_| {
                scope.spawn(move || {
                    let mut sim = setup();
                    (0..ticks).for_each(|_| advance(&mut sim));
                    sim.state_hash()
                })
            })
            .collect();
        workers
            .into_iter()
            .map(|worker| match worker.join() {
                Ok(hash) => hash,
                Err(payload) => std::panic::resume_unwind(payload),
            })
            .collect()
    });
    HashReport { hashes, ticks }
}

/// Per-tick hashes of one replay, starting with the state before any step.
pub fn hash_trace(setup: impl FnOnce() -> Simulation, ticks: u64) -> Vec<u64> {
    let mut sim = setup();
    let mut trace = Vec::with_capacity(ticks as usize + 1);
    trace.push(sim.state_hash());
    for _ in 0..ticks {
        advance(&mut sim);
        trace.push(sim.state_hash());
    }
    trace
}

/// Step two replays in lockstep and return the first tick on which their
/// hashes differ. Tick 0 is the freshly built state.
pub fn find_first_divergence(setup: impl Fn() -> Simulation, ticks: u64) -> Option<u64> {
    let a = hash_trace(&setup, ticks);
    let b = hash_trace(&setup, ticks);
    a.iter().zip(&b).position(|(x, y)| x != y).map(|i| i as u64)
}

/// Hash any value with the std hasher. Stable within one process only.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
