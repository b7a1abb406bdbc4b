//! Dense component storage.
//!
//! Every bound component type gets one [`ComponentStore`], a vector of
//! `(exists, value)` slots indexed directly by entity id. Stores grow in
//! lockstep with the entity sequence and never shrink.
//!
//! Stores are shared between the world and the systems installed into it
//! through [`StoreHandle`], a single-threaded `Rc<RefCell<_>>`. Borrows are
//! per component type, so a system may hold one store mutably while
//! reading another.

use std::any::{Any, TypeId};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::EntityId;

/// Marker for plain-data component types.
///
/// Components are default-initialized when a store grows; the default value
/// is never observed because the slot is flagged as absent.
pub trait Component: Default + 'static {}

#[derive(Debug, Clone, Default)]
struct Slot<T> {
    exists: bool,
    value: T,
}

/// Dense per-type component storage.
#[derive(Debug, Clone)]
pub struct ComponentStore<T> {
    slots: Vec<Slot<T>>,
}

impl<T: Component> ComponentStore<T> {
    /// Create a store with `len` absent slots.
    #[must_use]
    pub fn with_len(len: usize) -> Self {
        let mut slots = Vec::with_capacity(len);
        slots.resize_with(len, Slot::default);
        Self { slots }
    }

    /// Append one absent slot.
    pub fn allocate(&mut self) {
        self.slots.push(Slot::default());
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the store has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns true if the entity has this component.
    #[must_use]
    pub fn has(&self, entity: EntityId) -> bool {
        self.slots
            .get(entity as usize)
            .is_some_and(|slot| slot.exists)
    }

    /// Mark present and overwrite the value.
    ///
    /// # Panics
    ///
    /// Panics if `entity` is beyond the store length, which means it was
    /// never allocated by the owning world.
    pub fn set(&mut self, entity: EntityId, value: T) {
        let slot = &mut self.slots[entity as usize];
        slot.exists = true;
        slot.value = value;
    }

    /// Mark absent. The stale value stays in place until overwritten.
    pub fn remove(&mut self, entity: EntityId) {
        if let Some(slot) = self.slots.get_mut(entity as usize) {
            slot.exists = false;
        }
    }

    /// Component value, if present.
    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.slots
            .get(entity as usize)
            .filter(|slot| slot.exists)
            .map(|slot| &slot.value)
    }

    /// Mutable component value, if present.
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.slots
            .get_mut(entity as usize)
            .filter(|slot| slot.exists)
            .map(|slot| &mut slot.value)
    }

    /// Present components in ascending entity order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.exists)
            .map(|(index, slot)| (index as EntityId, &slot.value))
    }
}

/// Shared handle to a component store.
///
/// Cloning the handle shares the store. Handles are resolved once during the
/// world's install step and kept by systems for their lifetime.
pub struct StoreHandle<T> {
    inner: Rc<RefCell<ComponentStore<T>>>,
}

impl<T> Clone for StoreHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for StoreHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle")
            .field("component", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Component> StoreHandle<T> {
    fn with_len(len: usize) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ComponentStore::with_len(len))),
        }
    }

    /// Borrow the whole store.
    ///
    /// # Panics
    ///
    /// Panics if the store is currently borrowed mutably.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, ComponentStore<T>> {
        self.inner.borrow()
    }

    /// Borrow the whole store mutably.
    ///
    /// # Panics
    ///
    /// Panics if the store is currently borrowed.
    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, ComponentStore<T>> {
        self.inner.borrow_mut()
    }

    /// Returns true if the entity has this component.
    #[must_use]
    pub fn has(&self, entity: EntityId) -> bool {
        self.inner.borrow().has(entity)
    }

    /// Copy of the component value, if present.
    #[must_use]
    pub fn get_copy(&self, entity: EntityId) -> Option<T>
    where
        T: Copy,
    {
        self.inner.borrow().get(entity).copied()
    }

    /// Mark present and overwrite the value.
    pub fn set(&self, entity: EntityId, value: T) {
        self.inner.borrow_mut().set(entity, value);
    }

    /// Mark absent.
    pub fn remove(&self, entity: EntityId) {
        self.inner.borrow_mut().remove(entity);
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    /// Returns true if the store has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

/// Type-erased view used by the world to grow and clear every store at once.
trait ErasedStore {
    fn allocate(&self);
    fn remove(&self, entity: EntityId);
    fn len(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Component> ErasedStore for StoreHandle<T> {
    fn allocate(&self) {
        self.inner.borrow_mut().allocate();
    }

    fn remove(&self, entity: EntityId) {
        self.inner.borrow_mut().remove(entity);
    }

    fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// All bound component stores, keyed by component type.
///
/// Stores are kept in bind order so growth and clearing touch them in a
/// fixed sequence.
#[derive(Default)]
pub struct Stores {
    index: HashMap<TypeId, usize>,
    stores: Vec<Box<dyn ErasedStore>>,
    names: Vec<&'static str>,
}

impl fmt::Debug for Stores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stores").field("bound", &self.names).finish()
    }
}

impl Stores {
    /// Bind a component type, creating a store with `len` absent slots.
    ///
    /// Binding the same type twice keeps the existing store. Returns true if
    /// a new store was created.
    pub fn bind<T: Component>(&mut self, len: usize) -> bool {
        let type_id = TypeId::of::<T>();
        if self.index.contains_key(&type_id) {
            return false;
        }
        self.index.insert(type_id, self.stores.len());
        self.stores.push(Box::new(StoreHandle::<T>::with_len(len)));
        self.names.push(std::any::type_name::<T>());
        true
    }

    /// Handle to the store for `T`, if bound.
    #[must_use]
    pub fn handle<T: Component>(&self) -> Option<&StoreHandle<T>> {
        let index = *self.index.get(&TypeId::of::<T>())?;
        self.stores[index].as_any().downcast_ref::<StoreHandle<T>>()
    }

    /// Returns true if `T` is bound.
    #[must_use]
    pub fn is_bound<T: Component>(&self) -> bool {
        self.index.contains_key(&TypeId::of::<T>())
    }

    /// Number of bound component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Bound type names in bind order.
    #[must_use]
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// Shortest store length, or `None` if nothing is bound.
    #[must_use]
    pub fn min_len(&self) -> Option<usize> {
        self.stores.iter().map(|store| store.len()).min()
    }

    pub(crate) fn allocate_all(&self) {
        for store in &self.stores {
            store.allocate();
        }
    }

    pub(crate) fn remove_all(&self, entity: EntityId) {
        for store in &self.stores {
            store.remove(entity);
        }
    }
}
