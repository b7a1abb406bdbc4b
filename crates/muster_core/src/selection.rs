//! Selected-unit stack with explicit observers.
//!
//! The stack holds the units the player has selected and tells subscribers
//! when that set changes. Rectangle selection is plain geometry over unit
//! positions.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ecs::{EntityId, World};
use crate::math::{Fixed, Vec2Fixed};
use crate::movement::Transform;

/// Change to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent<'a> {
    /// The selection was replaced by these units.
    Changed(&'a [EntityId]),
    /// A unit joined the selection.
    Added(EntityId),
    /// A unit left the selection.
    Removed(EntityId),
    /// The selection was emptied.
    Cleared,
}

/// Handle returned by [`SelectedUnits::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&SelectionEvent<'_>)>;

/// Default margin added around a selection rectangle.
pub const DEFAULT_SELECT_EXPAND: Fixed = Fixed::from_bits(1 << 31);

/// The current selection.
#[derive(Default)]
pub struct SelectedUnits {
    units: BTreeSet<EntityId>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl fmt::Debug for SelectedUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedUnits")
            .field("units", &self.units)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl SelectedUnits {
    /// Empty selection without observers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `observer` for every later event.
    pub fn subscribe(
        &mut self,
        observer: impl FnMut(&SelectionEvent<'_>) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Drop an observer. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer, _)| *observer != id);
        self.observers.len() != before
    }

    /// Replace the selection with `units`.
    pub fn set_units(&mut self, units: &[EntityId]) {
        self.units.clear();
        self.units.extend(units.iter().copied());
        self.notify(&SelectionEvent::Changed(units));
    }

    /// Add `unit`. Notifies only if it was not selected.
    pub fn add_unit(&mut self, unit: EntityId) {
        if self.units.insert(unit) {
            self.notify(&SelectionEvent::Added(unit));
        }
    }

    /// Remove `unit`. Notifies only if it was selected.
    pub fn remove_unit(&mut self, unit: EntityId) {
        if self.units.remove(&unit) {
            self.notify(&SelectionEvent::Removed(unit));
        }
    }

    /// Empty the selection.
    pub fn clear(&mut self) {
        self.units.clear();
        self.notify(&SelectionEvent::Cleared);
    }

    /// Selected units in ascending order.
    #[must_use]
    pub fn units(&self) -> Vec<EntityId> {
        self.units.iter().copied().collect()
    }

    /// Returns true if `unit` is selected.
    #[must_use]
    pub fn contains(&self, unit: EntityId) -> bool {
        self.units.contains(&unit)
    }

    /// Number of selected units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Select every live unit inside the rectangle spanned by `corner_a`
    /// and `corner_b`, grown by `expand` on each side. Edges are inclusive.
    ///
    /// Returns the new selection.
    ///
    /// # Panics
    ///
    /// Panics if [`Transform`] was never bound to `world`.
    pub fn select_in_rect(
        &mut self,
        world: &World,
        corner_a: Vec2Fixed,
        corner_b: Vec2Fixed,
        expand: Fixed,
    ) -> Vec<EntityId> {
        let min = Vec2Fixed::new(corner_a.x.min(corner_b.x), corner_a.y.min(corner_b.y));
        let max = Vec2Fixed::new(corner_a.x.max(corner_b.x), corner_a.y.max(corner_b.y));
        let min = Vec2Fixed::new(min.x.saturating_sub(expand), min.y.saturating_sub(expand));
        let max = Vec2Fixed::new(max.x.saturating_add(expand), max.y.saturating_add(expand));

        let transforms = world.store::<Transform>().borrow();
        let picked: Vec<EntityId> = world
            .entities()
            .live_ids()
            .filter(|&id| {
                transforms.get(id).is_some_and(|transform| {
                    let p = transform.position;
                    p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y
                })
            })
            .collect();
        drop(transforms);

        tracing::debug!(count = picked.len(), "Rectangle selection");
        self.set_units(&picked);
        picked
    }

    fn notify(&mut self, event: &SelectionEvent<'_>) {
        for (_, observer) in &mut self.observers {
            observer(event);
        }
    }
}
