//! Entity-component-system runtime.
//!
//! - [`EntityRegistry`] hands out integer ids, reusing the lowest free slot
//! - [`ComponentStore`] keeps one dense `(exists, value)` slot per id
//! - [`Scheduler`] runs systems per phase in registration order
//! - [`World`] ties them together behind a single setup/tick API
//!
//! Ids carry no generation. Callers that keep ids across a destroy must do
//! their own bookkeeping.

mod component;
mod entity;
mod scheduler;
mod system;
mod world;

pub use component::{Component, ComponentStore, StoreHandle, Stores};
pub use entity::EntityRegistry;
pub use scheduler::Scheduler;
pub use system::{Phase, Resolver, System, TickContext};
pub use world::World;

/// Entity identifier. Doubles as the slot index in every component store.
pub type EntityId = u32;
