//! The ECS world: entity ids, component stores and the system scheduler.

use std::cell::{Ref, RefMut};

use super::component::{Component, StoreHandle, Stores};
use super::entity::EntityRegistry;
use super::scheduler::Scheduler;
use super::system::{Phase, System, TickContext};
use super::EntityId;
use crate::error::{CoreError, Result};

/// Owns every entity, component store and system.
///
/// Setup happens in a fixed order: bind component types, bind systems, then
/// [`install`](Self::install) once. After that the world is driven by
/// [`run_phase`](Self::run_phase).
///
/// # Example
///
/// ```
/// use muster_core::ecs::{Component, World};
///
/// #[derive(Debug, Default, Clone, Copy, PartialEq)]
/// struct Hitpoints(u32);
/// impl Component for Hitpoints {}
///
/// let mut world = World::new();
/// world.bind_component::<Hitpoints>();
/// world.install().unwrap();
///
/// let unit = world.create_entity();
/// assert!(!world.has::<Hitpoints>(unit));
/// world.set(unit, Hitpoints(30)).unwrap();
/// world.get_mut::<Hitpoints>(unit).unwrap().0 -= 5;
/// assert_eq!(world.get_copy::<Hitpoints>(unit), Some(Hitpoints(25)));
/// ```
#[derive(Debug, Default)]
pub struct World {
    entities: EntityRegistry,
    stores: Stores,
    scheduler: Scheduler,
}

impl World {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    /// Bind a component type. The new store is grown to the current entity
    /// sequence length. Binding twice is a no-op.
    pub fn bind_component<T: Component>(&mut self) {
        if self.stores.bind::<T>(self.entities.capacity()) {
            tracing::debug!(component = std::any::type_name::<T>(), "Bound component");
        }
    }

    /// Register a system into the phase lists it declares.
    pub fn bind_system<S: System + 'static>(&mut self, system: S) -> Result<()> {
        self.scheduler.register(Box::new(system))
    }

    /// Resolve every system's component dependencies.
    ///
    /// Runs once. If it fails the world stays uninstalled for good.
    pub fn install(&mut self) -> Result<()> {
        self.scheduler.install(&self.stores)
    }

    /// Returns true once install has succeeded.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.scheduler.is_installed()
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Allocate an entity id. Every store grows if the id is new.
    pub fn create_entity(&mut self) -> EntityId {
        let before = self.entities.capacity();
        let id = self.entities.create();
        if self.entities.capacity() > before {
            self.stores.allocate_all();
        }
        id
    }

    /// Free an entity id and mark all of its components absent.
    pub fn destroy_entity(&mut self, id: EntityId) -> Result<()> {
        if !self.entities.destroy(id) {
            return Err(CoreError::EntityNotAlive(id));
        }
        self.stores.remove_all(id);
        Ok(())
    }

    /// Returns true if the entity is alive.
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        self.entities.is_alive(id)
    }

    /// The entity registry.
    #[must_use]
    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    /// The bound component stores.
    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// The system scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Store handle for `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` was never bound. That is a setup bug, not a runtime
    /// condition.
    #[must_use]
    pub fn store<T: Component>(&self) -> &StoreHandle<T> {
        match self.stores.handle::<T>() {
            Some(handle) => handle,
            None => panic!(
                "component type `{}` was never bound to the world",
                std::any::type_name::<T>()
            ),
        }
    }

    /// Store handle for `T`, or [`CoreError::UnboundComponent`].
    pub fn try_store<T: Component>(&self) -> Result<StoreHandle<T>> {
        self.stores
            .handle::<T>()
            .cloned()
            .ok_or(CoreError::UnboundComponent {
                component: std::any::type_name::<T>(),
                system: None,
            })
    }

    /// Set a component on a live entity.
    ///
    /// # Panics
    ///
    /// Panics if `T` was never bound.
    pub fn set<T: Component>(&self, id: EntityId, value: T) -> Result<()> {
        if !self.entities.is_alive(id) {
            return Err(CoreError::EntityNotAlive(id));
        }
        self.store::<T>().set(id, value);
        Ok(())
    }

    /// Mark a component absent.
    ///
    /// # Panics
    ///
    /// Panics if `T` was never bound.
    pub fn remove<T: Component>(&self, id: EntityId) {
        self.store::<T>().remove(id);
    }

    /// Returns true if the entity has the component.
    ///
    /// # Panics
    ///
    /// Panics if `T` was never bound.
    #[must_use]
    pub fn has<T: Component>(&self, id: EntityId) -> bool {
        self.store::<T>().has(id)
    }

    /// Borrow a component, if present.
    ///
    /// # Panics
    ///
    /// Panics if `T` was never bound or its store is mutably borrowed.
    #[must_use]
    pub fn get<T: Component>(&self, id: EntityId) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.store::<T>().borrow(), |store| store.get(id)).ok()
    }

    /// Borrow a component mutably for in-place edits, if present.
    ///
    /// # Panics
    ///
    /// Panics if `T` was never bound or its store is already borrowed.
    #[must_use]
    pub fn get_mut<T: Component>(&self, id: EntityId) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.store::<T>().borrow_mut(), |store| store.get_mut(id)).ok()
    }

    /// Copy of a component, if present.
    ///
    /// # Panics
    ///
    /// Panics if `T` was never bound.
    #[must_use]
    pub fn get_copy<T: Component + Copy>(&self, id: EntityId) -> Option<T> {
        self.store::<T>().get_copy(id)
    }

    // ------------------------------------------------------------------
    // Ticking
    // ------------------------------------------------------------------

    /// Run every system of `phase` over every live entity.
    pub fn run_phase(&mut self, phase: Phase, ctx: &TickContext) -> Result<()> {
        self.scheduler.run(phase, ctx, &self.entities)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::ecs::Resolver;

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct Counter(u32);
    impl Component for Counter {}

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct Tag;
    impl Component for Tag {}

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct NeverBound;
    impl Component for NeverBound {}

    type Log = Rc<RefCell<Vec<(&'static str, Phase, EntityId)>>>;

    /// Records every callback and bumps `Counter` on tagged entities.
    struct Recorder {
        label: &'static str,
        phases: &'static [Phase],
        log: Log,
        counters: Option<StoreHandle<Counter>>,
        tags: Option<StoreHandle<Tag>>,
    }

    impl Recorder {
        fn new(label: &'static str, phases: &'static [Phase], log: &Log) -> Self {
            Self {
                label,
                phases,
                log: Rc::clone(log),
                counters: None,
                tags: None,
            }
        }

        fn record(&mut self, phase: Phase, entity: EntityId) {
            self.log.borrow_mut().push((self.label, phase, entity));
            let (Some(counters), Some(tags)) = (&self.counters, &self.tags) else {
                return;
            };
            if !tags.has(entity) {
                return;
            }
            let mut counters = counters.borrow_mut();
            if let Some(counter) = counters.get_mut(entity) {
                counter.0 += 1;
            }
        }
    }

    impl System for Recorder {
        fn name(&self) -> &'static str {
            self.label
        }

        fn phases(&self) -> &'static [Phase] {
            self.phases
        }

        fn install(&mut self, resolver: &Resolver<'_>) -> Result<()> {
            self.counters = Some(resolver.store::<Counter>()?);
            self.tags = Some(resolver.store::<Tag>()?);
            Ok(())
        }

        fn update(&mut self, _ctx: &TickContext, entity: EntityId) {
            self.record(Phase::Regular, entity);
        }

        fn fixed_update(&mut self, _ctx: &TickContext, entity: EntityId) {
            self.record(Phase::Fixed, entity);
        }

        fn late_update(&mut self, _ctx: &TickContext, entity: EntityId) {
            self.record(Phase::Late, entity);
        }
    }

    struct NeedsUnbound;

    impl System for NeedsUnbound {
        fn phases(&self) -> &'static [Phase] {
            &[Phase::Fixed]
        }

        fn install(&mut self, resolver: &Resolver<'_>) -> Result<()> {
            resolver.store::<NeverBound>().map(|_| ())
        }
    }

    struct Phaseless;

    impl System for Phaseless {
        fn phases(&self) -> &'static [Phase] {
            &[]
        }

        fn install(&mut self, _resolver: &Resolver<'_>) -> Result<()> {
            Ok(())
        }
    }

    fn world_with_components() -> World {
        let mut world = World::new();
        world.bind_component::<Counter>();
        world.bind_component::<Tag>();
        world
    }

    #[test]
    fn test_reuses_destroyed_id_before_growing() {
        let mut world = world_with_components();
        let a = world.create_entity();
        let b = world.create_entity();
        let _c = world.create_entity();
        world.destroy_entity(b).unwrap();

        assert_eq!(world.create_entity(), b);
        assert_eq!(world.create_entity(), 3);
        assert_eq!(a, 0);
    }

    #[test]
    fn test_components_absent_after_create_and_destroy() {
        let mut world = world_with_components();
        world.install().unwrap();
        let id = world.create_entity();
        assert!(!world.has::<Counter>(id));

        world.set(id, Counter(4)).unwrap();
        assert!(world.has::<Counter>(id));

        world.destroy_entity(id).unwrap();
        assert!(!world.has::<Counter>(id));

        // The recycled id starts clean.
        let again = world.create_entity();
        assert_eq!(again, id);
        assert!(!world.has::<Counter>(again));
        assert!(world.get::<Counter>(again).is_none());
    }

    #[test]
    fn test_store_bound_late_matches_entity_count() {
        let mut world = World::new();
        for _ in 0..5 {
            world.create_entity();
        }
        world.bind_component::<Counter>();
        assert_eq!(world.store::<Counter>().len(), 5);

        world.create_entity();
        assert_eq!(world.store::<Counter>().len(), 6);
    }

    #[test]
    fn test_set_on_dead_entity_is_rejected() {
        let mut world = world_with_components();
        let id = world.create_entity();
        world.destroy_entity(id).unwrap();
        assert!(matches!(
            world.set(id, Counter(1)),
            Err(CoreError::EntityNotAlive(_))
        ));
        assert!(matches!(
            world.destroy_entity(id),
            Err(CoreError::EntityNotAlive(_))
        ));
    }

    #[test]
    #[should_panic(expected = "never bound")]
    fn test_get_unbound_component_panics() {
        let mut world = World::new();
        let id = world.create_entity();
        let _ = world.has::<NeverBound>(id);
    }

    #[test]
    fn test_try_store_reports_unbound() {
        let world = World::new();
        assert!(matches!(
            world.try_store::<NeverBound>(),
            Err(CoreError::UnboundComponent { system: None, .. })
        ));
    }

    #[test]
    fn test_install_fails_on_unbound_dependency() {
        let mut world = world_with_components();
        world.bind_system(NeedsUnbound).unwrap();
        let err = world.install().unwrap_err();
        assert!(matches!(
            err,
            CoreError::UnboundComponent {
                system: Some(_),
                ..
            }
        ));
        assert!(!world.is_installed());
    }

    #[test]
    fn test_failed_install_cannot_be_retried() {
        let log = Log::default();
        let mut world = world_with_components();
        world
            .bind_system(Recorder::new("first", &[Phase::Regular], &log))
            .unwrap();
        world.bind_system(NeedsUnbound).unwrap();
        assert!(world.install().is_err());

        // Binding the missing store does not make a second attempt safe:
        // the first system already holds its handles.
        world.bind_component::<NeverBound>();
        assert!(matches!(
            world.install(),
            Err(CoreError::AlreadyInstalled(_))
        ));
        assert!(matches!(
            world.bind_system(Phaseless),
            Err(CoreError::AlreadyInstalled(_))
        ));
        assert!(matches!(
            world.run_phase(Phase::Regular, &TickContext::default()),
            Err(CoreError::NotInstalled(_))
        ));
        assert!(!world.is_installed());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_phaseless_system_rejected() {
        let mut world = World::new();
        assert!(matches!(
            world.bind_system(Phaseless),
            Err(CoreError::NoPhases(_))
        ));
    }

    #[test]
    fn test_install_runs_once_and_seals_registration() {
        let log = Log::default();
        let mut world = world_with_components();
        world.install().unwrap();
        assert!(matches!(
            world.install(),
            Err(CoreError::AlreadyInstalled(_))
        ));
        assert!(matches!(
            world.bind_system(Recorder::new("late", &[Phase::Fixed], &log)),
            Err(CoreError::AlreadyInstalled(_))
        ));
    }

    #[test]
    fn test_phase_before_install_fails() {
        let mut world = world_with_components();
        assert!(matches!(
            world.run_phase(Phase::Fixed, &TickContext::default()),
            Err(CoreError::NotInstalled("fixed"))
        ));
    }

    #[test]
    fn test_systems_run_in_registration_order_over_ascending_ids() {
        let log = Log::default();
        let mut world = world_with_components();
        world
            .bind_system(Recorder::new("first", &[Phase::Fixed], &log))
            .unwrap();
        world
            .bind_system(Recorder::new("second", &[Phase::Fixed, Phase::Late], &log))
            .unwrap();
        world.install().unwrap();

        for _ in 0..3 {
            world.create_entity();
        }
        world.destroy_entity(1).unwrap();

        world
            .run_phase(Phase::Fixed, &TickContext::default())
            .unwrap();
        world
            .run_phase(Phase::Regular, &TickContext::default())
            .unwrap();
        world
            .run_phase(Phase::Late, &TickContext::default())
            .unwrap();

        let entries = log.borrow().clone();
        assert_eq!(
            entries,
            vec![
                ("first", Phase::Fixed, 0),
                ("first", Phase::Fixed, 2),
                ("second", Phase::Fixed, 0),
                ("second", Phase::Fixed, 2),
                ("second", Phase::Late, 0),
                ("second", Phase::Late, 2),
            ]
        );
        assert_eq!(world.scheduler().phase_systems(Phase::Fixed), vec!["first", "second"]);
        assert!(world.scheduler().phase_systems(Phase::Regular).is_empty());
    }

    #[test]
    fn test_systems_check_presence_themselves() {
        let log = Log::default();
        let mut world = world_with_components();
        world
            .bind_system(Recorder::new("counter", &[Phase::Fixed], &log))
            .unwrap();
        world.install().unwrap();

        let tagged = world.create_entity();
        let untagged = world.create_entity();
        world.set(tagged, Counter(0)).unwrap();
        world.set(tagged, Tag).unwrap();
        world.set(untagged, Counter(0)).unwrap();

        for _ in 0..3 {
            world
                .run_phase(Phase::Fixed, &TickContext::default())
                .unwrap();
        }

        assert_eq!(world.get_copy::<Counter>(tagged), Some(Counter(3)));
        assert_eq!(world.get_copy::<Counter>(untagged), Some(Counter(0)));
    }
}
