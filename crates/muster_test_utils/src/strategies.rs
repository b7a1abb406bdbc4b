//! Proptest strategies.
//!
//! These strategies generate random but reproducible inputs for
//! property-based testing of the ECS and of movement determinism.

use muster_core::math::{Fixed, Vec2Fixed};
use proptest::prelude::*;

/// Generate a fixed-point coordinate on a small map.
///
/// Range: -40 to 40 in quarter units.
pub fn arb_fixed_position() -> impl Strategy<Value = Fixed> {
    (-160i32..160i32).prop_map(|quarters| Fixed::from_num(quarters) / Fixed::from_num(4))
}

/// Generate a fixed-point speed.
///
/// Range: 1 to 10 (units per second).
pub fn arb_fixed_speed() -> impl Strategy<Value = Fixed> {
    (1i32..=10i32).prop_map(Fixed::from_num)
}

/// Generate a fixed-point 2D vector for positions.
pub fn arb_vec2_position() -> impl Strategy<Value = Vec2Fixed> {
    (arb_fixed_position(), arb_fixed_position()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
}

/// Parameters for spawning a test unit.
#[derive(Debug, Clone)]
pub struct TestUnitParams {
    /// Position.
    pub position: Vec2Fixed,
    /// Movement speed.
    pub speed: Fixed,
}

/// Generate parameters for a test unit.
pub fn arb_unit_params() -> impl Strategy<Value = TestUnitParams> {
    (arb_vec2_position(), arb_fixed_speed())
        .prop_map(|(position, speed)| TestUnitParams { position, speed })
}

/// Generate a list of unit spawn parameters.
pub fn arb_unit_list(max_units: usize) -> impl Strategy<Value = Vec<TestUnitParams>> {
    proptest::collection::vec(arb_unit_params(), 1..max_units.max(2))
}

/// A group move order over spawned units, by spawn index.
#[derive(Debug, Clone)]
pub struct TestMoveOrder {
    /// Tick the order is issued at.
    pub at_tick: u64,
    /// Indices into the spawned unit list (may be out of range).
    pub units: Vec<usize>,
    /// Destination.
    pub destination: Vec2Fixed,
}

/// Generate a move order issued within the first `max_tick` ticks.
pub fn arb_move_order(max_tick: u64, max_units: usize) -> impl Strategy<Value = TestMoveOrder> {
    (
        0..max_tick.max(1),
        proptest::collection::vec(0..max_units.max(1), 1..max_units.max(2)),
        arb_vec2_position(),
    )
        .prop_map(|(at_tick, units, destination)| TestMoveOrder {
            at_tick,
            units,
            destination,
        })
}

/// Generate a schedule of move orders.
pub fn arb_order_schedule(
    max_orders: usize,
    max_tick: u64,
    max_units: usize,
) -> impl Strategy<Value = Vec<TestMoveOrder>> {
    proptest::collection::vec(arb_move_order(max_tick, max_units), 0..max_orders.max(1))
}

/// One entity-lifecycle operation for ECS property tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcsOp {
    /// Create an entity.
    Create,
    /// Destroy the n-th live entity, modulo the live count.
    Destroy(usize),
    /// Set a component value on the n-th live entity.
    Set(usize, i32),
    /// Remove the component from the n-th live entity.
    Remove(usize),
}

/// Generate a single ECS operation, biased toward creation.
pub fn arb_ecs_op() -> impl Strategy<Value = EcsOp> {
    prop_oneof![
        3 => Just(EcsOp::Create),
        2 => any::<usize>().prop_map(EcsOp::Destroy),
        2 => (any::<usize>(), any::<i32>()).prop_map(|(n, v)| EcsOp::Set(n, v)),
        1 => any::<usize>().prop_map(EcsOp::Remove),
    ]
}

/// Generate a sequence of ECS operations.
pub fn arb_ecs_ops(max_len: usize) -> impl Strategy<Value = Vec<EcsOp>> {
    proptest::collection::vec(arb_ecs_op(), 0..max_len.max(1))
}
