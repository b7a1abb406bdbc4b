//! Entity id allocation.

use super::EntityId;

/// Allocates and recycles entity ids.
///
/// Liveness is a dense `Vec<bool>` indexed by id. The lowest free slot is
/// handed out before the sequence grows, so iteration over live ids stays
/// compact. There are no generations: a recycled id looks exactly like the
/// entity that used to own it.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    alive: Vec<bool>,
}

impl EntityRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id, reusing the lowest free slot if there is one.
    pub fn create(&mut self) -> EntityId {
        if let Some(index) = self.alive.iter().position(|alive| !alive) {
            self.alive[index] = true;
            return index as EntityId;
        }

        self.alive.push(true);
        (self.alive.len() - 1) as EntityId
    }

    /// Mark an id as free. Returns `false` if it was not alive.
    pub fn destroy(&mut self, id: EntityId) -> bool {
        match self.alive.get_mut(id as usize) {
            Some(slot) if *slot => {
                *slot = false;
                true
            }
            _ => false,
        }
    }

    /// Returns true if the id is currently alive.
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.alive.get(id as usize).copied().unwrap_or(false)
    }

    /// Length of the liveness sequence (live and free slots).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.alive.len()
    }

    /// Number of live entities.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.alive.iter().filter(|alive| **alive).count()
    }

    /// Live ids in ascending order.
    pub fn live_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(|(index, _)| index as EntityId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential_when_nothing_is_free() {
        let mut registry = EntityRegistry::new();
        assert_eq!(registry.create(), 0);
        assert_eq!(registry.create(), 1);
        assert_eq!(registry.create(), 2);
        assert_eq!(registry.capacity(), 3);
    }

    #[test]
    fn test_lowest_free_slot_is_reused_first() {
        let mut registry = EntityRegistry::new();
        for _ in 0..5 {
            registry.create();
        }
        assert!(registry.destroy(3));
        assert!(registry.destroy(1));

        assert_eq!(registry.create(), 1);
        assert_eq!(registry.create(), 3);
        assert_eq!(registry.create(), 5);
    }

    #[test]
    fn test_destroy_dead_id_is_rejected() {
        let mut registry = EntityRegistry::new();
        let id = registry.create();
        assert!(registry.destroy(id));
        assert!(!registry.destroy(id));
        assert!(!registry.destroy(42));
    }

    #[test]
    fn test_live_ids_ascending_and_skip_free_slots() {
        let mut registry = EntityRegistry::new();
        for _ in 0..4 {
            registry.create();
        }
        registry.destroy(2);
        let ids: Vec<_> = registry.live_ids().collect();
        assert_eq!(ids, vec![0, 1, 3]);
        assert_eq!(registry.live_count(), 3);
        assert_eq!(registry.capacity(), 4);
    }
}
