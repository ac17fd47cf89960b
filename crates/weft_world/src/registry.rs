//! Component type registry and per-type storage.
//!
//! The registry assigns each component type its [`ComponentTypeId`], keeps
//! the per-type live-attachment counters, and owns the per-type slot pools
//! that entity records point into. Typed access goes through `Any`
//! downcasts; the tid-to-store mapping is established at registration and
//! never changes, so a mismatch is an internal bug rather than a runtime
//! condition.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use tracing::{debug, warn};

use weft_core::{Component, ComponentTypeId, ObjectPool, PoolHandle, PoolStats};

/// Type-erased view of one component type's slot pool.
trait ComponentStore: Send + Sync {
    fn release(&mut self, slot: PoolHandle);
    fn stats(&self) -> PoolStats;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct TypedStore<T: Component> {
    pool: ObjectPool<T>,
}

impl<T: Component> ComponentStore for TypedStore<T> {
    fn release(&mut self, slot: PoolHandle) {
        self.pool.release(slot);
    }

    fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Per-type bookkeeping kept alongside the store.
#[derive(Debug)]
pub struct ComponentInfo {
    /// Canonical component name.
    pub name: &'static str,
    /// Lower-cased name, used in query signature keys and stats.
    pub key: String,
    /// Whether instances are recycled through a free list.
    pub pooled: bool,
    /// Number of live attachments across all entities.
    live: usize,
}

/// Registers component types and owns their slot pools.
#[derive(Default)]
pub struct ComponentRegistry {
    ids: HashMap<TypeId, ComponentTypeId>,
    infos: Vec<ComponentInfo>,
    stores: Vec<Box<dyn ComponentStore>>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T`, returning its id. Idempotent: re-registration returns
    /// the existing id and changes nothing.
    ///
    /// The first registration decides the storage flavour: a recycling pool
    /// for resettable types, a transient pool (fresh instance per attach,
    /// released instances discarded) for types that opt out of pooling.
    pub fn register<T: Component>(&mut self) -> ComponentTypeId {
        if let Some(&tid) = self.ids.get(&TypeId::of::<T>()) {
            return tid;
        }
        let tid = ComponentTypeId(self.infos.len() as u32);
        let pool = if T::POOLED {
            ObjectPool::recycling(T::default, T::reset)
        } else {
            warn!(
                component = T::type_name(),
                "component type opts out of pooling; instances are allocated per attach"
            );
            ObjectPool::transient(T::default)
        };
        self.stores.push(Box::new(TypedStore::<T> { pool }));
        self.infos.push(ComponentInfo {
            name: T::type_name(),
            key: T::type_name().to_lowercase(),
            pooled: T::POOLED,
            live: 0,
        });
        self.ids.insert(TypeId::of::<T>(), tid);
        debug!(component = T::type_name(), id = tid.0, "component type registered");
        tid
    }

    /// Returns the id assigned to `T`, if it has been registered.
    #[must_use]
    pub fn type_id<T: Component>(&self) -> Option<ComponentTypeId> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    /// Canonical name of a registered type.
    #[must_use]
    pub fn name(&self, tid: ComponentTypeId) -> &'static str {
        self.infos[tid.index()].name
    }

    /// Lower-cased signature key of a registered type.
    #[must_use]
    pub fn key(&self, tid: ComponentTypeId) -> &str {
        &self.infos[tid.index()].key
    }

    /// Number of live attachments of `tid` across all entities.
    #[must_use]
    pub fn live_count(&self, tid: ComponentTypeId) -> usize {
        self.infos[tid.index()].live
    }

    /// Number of registered component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Returns `true` if no component types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Pool occupancy per registered type, keyed by canonical name.
    pub fn pool_stats(&self) -> impl Iterator<Item = (&'static str, PoolStats)> + '_ {
        self.infos
            .iter()
            .zip(&self.stores)
            .map(|(info, store)| (info.name, store.stats()))
    }

    pub(crate) fn component_attached(&mut self, tid: ComponentTypeId) {
        self.infos[tid.index()].live += 1;
    }

    pub(crate) fn component_detached(&mut self, tid: ComponentTypeId) {
        let live = &mut self.infos[tid.index()].live;
        *live = live.saturating_sub(1);
    }

    pub(crate) fn acquire<T: Component>(&mut self, tid: ComponentTypeId) -> PoolHandle {
        self.typed_mut::<T>(tid).pool.acquire()
    }

    pub(crate) fn release(&mut self, tid: ComponentTypeId, slot: PoolHandle) {
        self.stores[tid.index()].release(slot);
    }

    pub(crate) fn slot<T: Component>(&self, tid: ComponentTypeId, slot: PoolHandle) -> &T {
        self.typed::<T>(tid)
            .pool
            .get(slot)
            .expect("component slot out of range")
    }

    pub(crate) fn slot_mut<T: Component>(
        &mut self,
        tid: ComponentTypeId,
        slot: PoolHandle,
    ) -> &mut T {
        self.typed_mut::<T>(tid)
            .pool
            .get_mut(slot)
            .expect("component slot out of range")
    }

    fn typed<T: Component>(&self, tid: ComponentTypeId) -> &TypedStore<T> {
        self.stores[tid.index()]
            .as_any()
            .downcast_ref()
            .expect("component store type mismatch")
    }

    fn typed_mut<T: Component>(&mut self, tid: ComponentTypeId) -> &mut TypedStore<T> {
        self.stores[tid.index()]
            .as_any_mut()
            .downcast_mut()
            .expect("component store type mismatch")
    }
}
