//! Entity records, the live-entity index, and deferred-removal staging.
//!
//! The store owns every entity record in a recycling pool and maps live
//! entity ids to their pool slots. Component detachment is two-phase by
//! default: the index (and therefore every query) updates the moment the
//! detach call returns, but the instance is parked in the record's
//! pending-removal slot — still readable through `get_removed_component` —
//! and only released back to its pool when the frame's deferred work is
//! committed. Two per-frame worklists drive the commit: entities staged for
//! full removal, and entities holding staged component instances.

use std::collections::HashMap;

use weft_core::{Component, ComponentTypeId, Entity, EventDispatcher, ObjectPool, PoolHandle};

use crate::error::WorldError;
use crate::events::{
    COMPONENT_ADDED, COMPONENT_REMOVED, ENTITY_CREATED, ENTITY_REMOVED, EntityEvent,
};
use crate::query::{QueryEngine, QueryId};
use crate::registry::ComponentRegistry;

/// Per-entity bookkeeping: attached components, staged removals, and the
/// queries whose matched set currently includes this entity.
#[derive(Default)]
pub(crate) struct EntityRecord {
    /// Set while the entity's removal is underway; suppresses re-indexing
    /// so a dying entity cannot re-enter a query.
    pub(crate) removing: bool,
    /// Attached component types, in attach order.
    pub(crate) attached: Vec<ComponentTypeId>,
    /// Live component instances.
    pub(crate) instances: HashMap<ComponentTypeId, PoolHandle>,
    /// Instances staged for removal, readable until commit.
    pub(crate) pending: HashMap<ComponentTypeId, PoolHandle>,
    /// Types staged for removal, in stage order.
    pub(crate) pending_types: Vec<ComponentTypeId>,
    /// Back-edges to the queries this entity currently matches.
    pub(crate) queries: Vec<QueryId>,
}

impl EntityRecord {
    fn reset(&mut self) {
        self.removing = false;
        self.attached.clear();
        self.instances.clear();
        self.pending.clear();
        self.pending_types.clear();
        self.queries.clear();
    }
}

/// Owns live entities and mediates component attach/detach.
pub struct EntityStore {
    records: ObjectPool<EntityRecord>,
    index: HashMap<Entity, PoolHandle>,
    live: Vec<Entity>,
    next_id: u64,
    /// Entities staged for full removal this frame.
    to_remove: Vec<Entity>,
    /// Entities holding staged component instances this frame.
    pending_cleanup: Vec<Entity>,
    pub(crate) dispatcher: EventDispatcher<EntityEvent>,
}

impl EntityStore {
    /// Creates a store whose record pool pre-holds `reserve` clean records.
    #[must_use]
    pub fn new(reserve: usize) -> Self {
        Self {
            records: ObjectPool::recycling(EntityRecord::default, EntityRecord::reset)
                .with_reserve(reserve),
            index: HashMap::new(),
            live: Vec::new(),
            next_id: 1,
            to_remove: Vec::new(),
            pending_cleanup: Vec::new(),
            dispatcher: EventDispatcher::new(),
        }
    }

    /// Live entities in creation order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.live
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns `true` if no entities are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Returns `true` if `entity` is managed by this store.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.index.contains_key(&entity)
    }

    /// Occupancy of the entity record pool.
    #[must_use]
    pub fn pool_stats(&self) -> weft_core::PoolStats {
        self.records.stats()
    }

    pub(crate) fn record(&self, entity: Entity) -> Option<&EntityRecord> {
        let handle = *self.index.get(&entity)?;
        self.records.get(handle)
    }

    pub(crate) fn record_mut(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        let handle = *self.index.get(&entity)?;
        self.records.get_mut(handle)
    }

    /// Pulls a clean record from the pool and brings it live under a fresh id.
    pub(crate) fn create_entity(&mut self) -> Entity {
        let handle = self.records.acquire();
        let entity = Entity(self.next_id);
        self.next_id += 1;
        self.index.insert(entity, handle);
        self.live.push(entity);
        self.dispatcher
            .dispatch(ENTITY_CREATED, EntityEvent::entity(entity));
        entity
    }

    /// Attaches a component, initialising the pooled instance from `value`.
    ///
    /// No-op if the type is already attached or the entity is not live.
    pub(crate) fn add_component<T: Component>(
        &mut self,
        registry: &mut ComponentRegistry,
        queries: &mut QueryEngine,
        entity: Entity,
        value: T,
    ) {
        let tid = registry.register::<T>();
        {
            let Some(record) = self.record(entity) else {
                return;
            };
            if record.removing || record.instances.contains_key(&tid) {
                return;
            }
        }
        let slot = registry.acquire::<T>(tid);
        registry.slot_mut::<T>(tid, slot).copy_from(&value);

        let record = self.record_mut(entity).expect("checked above");
        record.attached.push(tid);
        record.instances.insert(tid, slot);
        queries.on_component_added(entity, tid, record);
        registry.component_attached(tid);
        self.dispatcher
            .dispatch(COMPONENT_ADDED, EntityEvent::component(entity, tid));
    }

    /// Detaches a component by type id.
    ///
    /// The detachment is visible to queries immediately. With `force` the
    /// instance is released synchronously; otherwise it is staged and
    /// reclaimed at frame end. No-op if the type is not attached.
    pub(crate) fn remove_component_by_id(
        &mut self,
        registry: &mut ComponentRegistry,
        queries: &mut QueryEngine,
        entity: Entity,
        tid: ComponentTypeId,
        force: bool,
    ) {
        {
            let Some(record) = self.record(entity) else {
                return;
            };
            if !record.instances.contains_key(&tid) {
                return;
            }
        }
        self.dispatcher
            .dispatch(COMPONENT_REMOVED, EntityEvent::component(entity, tid));

        let record = self.record_mut(entity).expect("checked above");
        let slot = record.instances.remove(&tid).expect("checked above");
        if let Some(pos) = record.attached.iter().position(|t| *t == tid) {
            record.attached.remove(pos);
        }

        if force {
            if !record.removing {
                queries.on_component_removed(entity, tid, record);
            }
            registry.release(tid, slot);
            registry.component_detached(tid);
        } else {
            record.pending.insert(tid, slot);
            record.pending_types.push(tid);
            if !record.removing {
                queries.on_component_removed(entity, tid, record);
            }
            if !self.pending_cleanup.contains(&entity) {
                self.pending_cleanup.push(entity);
            }
        }
    }

    /// Detaches every attached component, in reverse attach order.
    pub(crate) fn remove_all_components(
        &mut self,
        registry: &mut ComponentRegistry,
        queries: &mut QueryEngine,
        entity: Entity,
        force: bool,
    ) {
        let attached: Vec<ComponentTypeId> = match self.record(entity) {
            Some(record) => record.attached.clone(),
            None => return,
        };
        for tid in attached.into_iter().rev() {
            self.remove_component_by_id(registry, queries, entity, tid, force);
        }
    }

    /// Removes an entity from the world.
    ///
    /// The entity leaves every query immediately. With `force` its record
    /// and instances are released synchronously; otherwise reclamation is
    /// deferred to frame end. Removing an entity this store does not manage
    /// is a contract violation.
    pub(crate) fn remove_entity(
        &mut self,
        registry: &mut ComponentRegistry,
        queries: &mut QueryEngine,
        entity: Entity,
        force: bool,
    ) -> Result<(), WorldError> {
        let Some(&handle) = self.index.get(&entity) else {
            return Err(WorldError::EntityNotFound(entity));
        };
        {
            let record = self.records.get_mut(handle).expect("indexed entity record");
            if record.removing && !force {
                return Ok(());
            }
            record.removing = true;
        }
        self.dispatcher
            .dispatch(ENTITY_REMOVED, EntityEvent::entity(entity));

        let record = self.records.get_mut(handle).expect("indexed entity record");
        queries.on_entity_removed(entity, record);

        self.remove_all_components(registry, queries, entity, force);

        if force {
            let record = self.records.get_mut(handle).expect("indexed entity record");
            while let Some(tid) = record.pending_types.pop() {
                let slot = record.pending.remove(&tid);
                if let Some(slot) = slot {
                    registry.release(tid, slot);
                    registry.component_detached(tid);
                }
            }
            if let Some(pos) = self.live.iter().position(|e| *e == entity) {
                self.live.remove(pos);
            }
            self.index.remove(&entity);
            self.records.release(handle);
        } else {
            self.to_remove.push(entity);
        }
        Ok(())
    }

    /// Slot of a staged (pending-removal) instance, if one exists.
    pub(crate) fn pending_slot(
        &self,
        entity: Entity,
        tid: ComponentTypeId,
    ) -> Option<PoolHandle> {
        self.record(entity)?.pending.get(&tid).copied()
    }

    /// Releases everything staged this frame: removed entities first, then
    /// staged component instances on surviving entities.
    ///
    /// Idempotent: with no interleaved mutation a second commit finds both
    /// worklists empty.
    pub(crate) fn commit_deferred(&mut self, registry: &mut ComponentRegistry) {
        let to_remove = std::mem::take(&mut self.to_remove);
        for entity in to_remove {
            let Some(handle) = self.index.remove(&entity) else {
                continue;
            };
            {
                let record = self.records.get_mut(handle).expect("indexed entity record");
                while let Some(tid) = record.pending_types.pop() {
                    let slot = record.pending.remove(&tid);
                    if let Some(slot) = slot {
                        registry.release(tid, slot);
                        registry.component_detached(tid);
                    }
                }
            }
            if let Some(pos) = self.live.iter().position(|e| *e == entity) {
                self.live.remove(pos);
            }
            self.records.release(handle);
        }

        let pending = std::mem::take(&mut self.pending_cleanup);
        for entity in pending {
            let Some(&handle) = self.index.get(&entity) else {
                continue;
            };
            let record = self.records.get_mut(handle).expect("indexed entity record");
            while let Some(tid) = record.pending_types.pop() {
                let slot = record.pending.remove(&tid);
                if let Some(slot) = slot {
                    registry.release(tid, slot);
                    registry.component_detached(tid);
                }
            }
        }
    }
}
