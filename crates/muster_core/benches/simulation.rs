//! Simulation benchmarks for muster_core.
//!
//! Run with: `cargo bench -p muster_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use muster_core::ecs::{
    Component, EntityId, Phase, Resolver, StoreHandle, System, TickContext, World,
};
use muster_core::simulation::Simulation;
use muster_test_utils::fixtures::{fixed, vec2, GridNav};
use muster_test_utils::scenario::{block_formation, ScenarioBuilder};

#[derive(Debug, Default, Clone, Copy)]
struct Counter(u64);

impl Component for Counter {}

#[derive(Default)]
struct Bump {
    counters: Option<StoreHandle<Counter>>,
}

impl System for Bump {
    fn phases(&self) -> &'static [Phase] {
        &[Phase::Fixed]
    }

    fn install(&mut self, resolver: &Resolver<'_>) -> muster_core::error::Result<()> {
        self.counters = Some(resolver.store::<Counter>()?);
        Ok(())
    }

    fn fixed_update(&mut self, _ctx: &TickContext, entity: EntityId) {
        if let Some(counters) = &self.counters {
            if let Some(counter) = counters.borrow_mut().get_mut(entity) {
                counter.0 += 1;
            }
        }
    }
}

fn scheduler_world(entities: usize) -> World {
    let mut world = World::new();
    world.bind_component::<Counter>();
    world.bind_system(Bump::default()).unwrap();
    world.install().unwrap();
    for _ in 0..entities {
        let id = world.create_entity();
        world.set(id, Counter(0)).unwrap();
    }
    world
}

fn marching_group(units: usize) -> Simulation {
    let mut grid = GridNav::new(128, 128, fixed(1));
    grid.block_rect(60, 20, 64, 100);

    let mut scenario = ScenarioBuilder::new()
        .grid(grid)
        .units(&block_formation(vec2(20, 50), units, 8, fixed(2)), fixed(5))
        .build();
    scenario.sim.move_units(&scenario.units, vec2(100, 60));
    scenario.sim
}

/// ECS fixed phase over a dense world.
pub fn scheduler_benchmark(c: &mut Criterion) {
    let mut world = scheduler_world(1024);
    let ctx = TickContext::default();
    c.bench_function("fixed_phase_1024_entities", |b| {
        b.iter(|| world.run_phase(black_box(Phase::Fixed), &ctx).unwrap());
    });
}

/// Twenty fixed steps of a group walking around a wall.
pub fn group_benchmark(c: &mut Criterion) {
    for units in [8usize, 64] {
        c.bench_function(&format!("group_step_{units}_units"), |b| {
            b.iter_batched(
                || marching_group(units),
                |mut sim| {
                    for _ in 0..20 {
                        sim.fixed_step().unwrap();
                    }
                    black_box(sim.state_hash())
                },
                BatchSize::SmallInput,
            );
        });
    }
}

criterion_group!(benches, scheduler_benchmark, group_benchmark);
criterion_main!(benches);
