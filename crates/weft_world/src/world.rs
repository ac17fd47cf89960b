//! The [`World`] facade.
//!
//! A world owns the component registry, the entity store, the query engine,
//! the scheduler, and the world-level event dispatcher, and exposes the
//! whole consumer surface: entity and component operations, query access,
//! system registration, custom events, and diagnostics.
//!
//! One `World::execute` call is one frame: systems run in priority order
//! (each turn followed by its event-buffer clear), then all removals staged
//! during the frame are committed.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use weft_core::{
    Component, ComponentTypeId, DispatcherCounters, Entity, EventDispatcher, PoolStats,
};

use crate::entity_store::EntityStore;
use crate::error::WorldError;
use crate::query::{QueryEngine, QueryId, QuerySpec};
use crate::registry::ComponentRegistry;
use crate::scheduler::{Scheduler, SystemStats};
use crate::system::{System, SystemAttrs};

/// Construction options for a [`World`].
#[derive(Debug, Clone, Default)]
pub struct WorldOptions {
    /// Number of entity records to pre-allocate in the entity pool.
    pub entity_pool_reserve: usize,
}

/// The aggregate owning all ECS state for one simulation.
pub struct World {
    pub(crate) registry: ComponentRegistry,
    pub(crate) entities: EntityStore,
    pub(crate) queries: QueryEngine,
    pub(crate) scheduler: Scheduler,
    pub(crate) events: EventDispatcher<Value>,
    enabled: bool,
}

impl World {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(WorldOptions::default())
    }

    /// Creates an empty world with the given options.
    #[must_use]
    pub fn with_options(options: WorldOptions) -> Self {
        info!(
            entity_pool_reserve = options.entity_pool_reserve,
            "world created"
        );
        Self {
            registry: ComponentRegistry::new(),
            entities: EntityStore::new(options.entity_pool_reserve),
            queries: QueryEngine::new(),
            scheduler: Scheduler::default(),
            events: EventDispatcher::new(),
            enabled: true,
        }
    }

    // ── Component types ─────────────────────────────────────────────────

    /// Registers component type `T`. Idempotent.
    pub fn register_component<T: Component>(&mut self) -> ComponentTypeId {
        self.registry.register::<T>()
    }

    /// Returns the id of `T`, if registered.
    #[must_use]
    pub fn component_id<T: Component>(&self) -> Option<ComponentTypeId> {
        self.registry.type_id::<T>()
    }

    // ── Systems ─────────────────────────────────────────────────────────

    /// Registers a system with default attributes (priority 0).
    pub fn register_system<S: System>(&mut self, system: S) -> Result<(), WorldError> {
        self.register_system_with(system, SystemAttrs::default())
    }

    /// Registers a system with explicit attributes.
    pub fn register_system_with<S: System>(
        &mut self,
        system: S,
        attrs: SystemAttrs,
    ) -> Result<(), WorldError> {
        self.scheduler.register(
            system,
            attrs,
            &mut self.registry,
            &mut self.entities,
            &mut self.queries,
            &mut self.events,
        )
    }

    /// Unregisters the first system of type `S`.
    pub fn remove_system<S: System>(&mut self) -> bool {
        self.scheduler.remove::<S>(&mut self.queries, &mut self.events)
    }

    /// Returns the first registered system of type `S`.
    #[must_use]
    pub fn get_system<S: System>(&self) -> Option<&S> {
        self.scheduler.get::<S>()
    }

    /// Returns the first registered system of type `S`, mutably.
    pub fn get_system_mut<S: System>(&mut self) -> Option<&mut S> {
        self.scheduler.get_mut::<S>()
    }

    /// Iterates registered systems in run order.
    pub fn get_systems(&self) -> impl Iterator<Item = &dyn System> {
        self.scheduler.iter()
    }

    /// Enables or disables the first system of type `S`.
    pub fn set_system_enabled<S: System>(&mut self, enabled: bool) -> bool {
        self.scheduler.set_enabled::<S>(enabled)
    }

    // ── Entities & components ───────────────────────────────────────────

    /// Creates a new entity with a fresh id.
    pub fn create_entity(&mut self) -> Entity {
        self.entities.create_entity()
    }

    /// Live entities in creation order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        self.entities.entities()
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Removes an entity. With `force` the reclamation is synchronous;
    /// otherwise it happens at frame end.
    ///
    /// # Errors
    ///
    /// [`WorldError::EntityNotFound`] if the entity is not managed by this
    /// world.
    pub fn remove_entity(&mut self, entity: Entity, force: bool) -> Result<(), WorldError> {
        self.entities
            .remove_entity(&mut self.registry, &mut self.queries, entity, force)
    }

    /// Attaches component `value` to `entity`. No-op if `T` is already
    /// attached.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) {
        self.entities
            .add_component(&mut self.registry, &mut self.queries, entity, value);
    }

    /// Detaches component `T` from `entity`. Queries reindex immediately;
    /// without `force` the instance stays readable via
    /// [`get_removed_component`](World::get_removed_component) until frame
    /// end. No-op if `T` is not attached.
    pub fn remove_component<T: Component>(&mut self, entity: Entity, force: bool) {
        let Some(tid) = self.registry.type_id::<T>() else {
            return;
        };
        self.entities.remove_component_by_id(
            &mut self.registry,
            &mut self.queries,
            entity,
            tid,
            force,
        );
    }

    /// Detaches every component of `entity`, in reverse attach order.
    pub fn remove_all_components(&mut self, entity: Entity, force: bool) {
        self.entities
            .remove_all_components(&mut self.registry, &mut self.queries, entity, force);
    }

    /// Read-only view of `entity`'s `T` component.
    #[must_use]
    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        let tid = self.registry.type_id::<T>()?;
        let record = self.entities.record(entity)?;
        let slot = *record.instances.get(&tid)?;
        Some(self.registry.slot::<T>(tid, slot))
    }

    /// Mutable view of `entity`'s `T` component.
    ///
    /// Obtaining the borrow fires a change event on every reactive query
    /// whose membership includes `entity` — before this call returns.
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let tid = self.registry.type_id::<T>()?;
        let slot = {
            let record = self.entities.record(entity)?;
            let slot = *record.instances.get(&tid)?;
            self.queries.notify_changed(entity, tid, record);
            slot
        };
        Some(self.registry.slot_mut::<T>(tid, slot))
    }

    /// The staged-for-removal `T` instance of `entity`, readable until the
    /// frame's deferred removals commit.
    #[must_use]
    pub fn get_removed_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        let tid = self.registry.type_id::<T>()?;
        let slot = self.entities.pending_slot(entity, tid)?;
        Some(self.registry.slot::<T>(tid, slot))
    }

    /// Returns `true` if `entity` has `T` attached.
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        let Some(tid) = self.registry.type_id::<T>() else {
            return false;
        };
        self.entities
            .record(entity)
            .is_some_and(|record| record.instances.contains_key(&tid))
    }

    /// Returns `true` if `entity` has every listed type attached.
    #[must_use]
    pub fn has_all_components(&self, entity: Entity, types: &[ComponentTypeId]) -> bool {
        self.entities.record(entity).is_some_and(|record| {
            types.iter().all(|tid| record.instances.contains_key(tid))
        })
    }

    /// Returns `true` if `entity` has at least one listed type attached.
    #[must_use]
    pub fn has_any_components(&self, entity: Entity, types: &[ComponentTypeId]) -> bool {
        self.entities.record(entity).is_some_and(|record| {
            types.iter().any(|tid| record.instances.contains_key(tid))
        })
    }

    /// The component types attached to `entity`, in attach order.
    #[must_use]
    pub fn attached_components(&self, entity: Entity) -> Option<&[ComponentTypeId]> {
        self.entities
            .record(entity)
            .map(|record| record.attached.as_slice())
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Resolves a spec to its (deduplicated) query.
    ///
    /// # Errors
    ///
    /// [`WorldError::EmptyQuery`] if the spec names no required component.
    pub fn query_components(&mut self, spec: QuerySpec) -> Result<QueryId, WorldError> {
        self.queries
            .get_or_create(&spec, &mut self.registry, &mut self.entities)
    }

    /// The entities currently matching a query.
    #[must_use]
    pub fn query_entities(&self, id: QueryId) -> &[Entity] {
        self.queries.query(id).entities()
    }

    // ── Frame execution ─────────────────────────────────────────────────

    /// Runs one frame: all systems in priority order, then deferred-removal
    /// commit. No-op while stopped.
    pub fn execute(&mut self, delta: f32, time: f32) {
        if !self.enabled {
            return;
        }
        let mut scheduler = std::mem::take(&mut self.scheduler);
        scheduler.execute(self, delta, time);
        // Pick up systems registered from inside a system's execute.
        scheduler.absorb(std::mem::take(&mut self.scheduler));
        self.scheduler = scheduler;
        self.entities.commit_deferred(&mut self.registry);
    }

    /// Resumes frame execution.
    pub fn play(&mut self) {
        self.enabled = true;
    }

    /// Stops frame execution; subsequent [`execute`](World::execute) calls
    /// return without work.
    pub fn stop(&mut self) {
        self.enabled = false;
    }

    /// Returns `true` if the world is executing frames.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // ── Custom events ───────────────────────────────────────────────────

    /// Dispatches a named world event to every subscribed buffer.
    pub fn emit_event(&mut self, name: &str, data: Value) {
        self.events.dispatch(name, data);
    }

    /// Subscribes a buffer to a named world event.
    pub fn add_event_listener(&mut self, name: &str) -> weft_core::ListenerId {
        self.events.add_listener(name)
    }

    /// Unsubscribes a world-event buffer.
    pub fn remove_event_listener(&mut self, id: weft_core::ListenerId) -> bool {
        self.events.remove_listener(id)
    }

    /// Takes everything buffered for a world-event subscription.
    pub fn take_events(&mut self, id: weft_core::ListenerId) -> Vec<Value> {
        self.events.drain(id)
    }

    // ── Diagnostics ─────────────────────────────────────────────────────

    /// Snapshot of entity, query, pool, system, and dispatcher counters.
    #[must_use]
    pub fn stats(&self) -> WorldStats {
        WorldStats {
            entities: self.entities.len(),
            entity_pool: self.entities.pool_stats(),
            queries: self
                .queries
                .iter()
                .map(|query| {
                    (
                        query.key().to_string(),
                        QueryStats {
                            num_components: query.num_components(),
                            num_entities: query.entities().len(),
                        },
                    )
                })
                .collect(),
            pools: self
                .registry
                .pool_stats()
                .map(|(name, stats)| (name.to_string(), stats))
                .collect(),
            systems: self.scheduler.stats(),
            events: EventStats {
                world: self.events.counters(),
                lifecycle: self.entities.dispatcher.counters(),
            },
        }
    }

    /// Resets the world-level and lifecycle dispatcher counters.
    pub fn reset_event_counters(&mut self) {
        self.events.reset_counters();
        self.entities.dispatcher.reset_counters();
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-query diagnostics row.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QueryStats {
    /// Number of required component types.
    pub num_components: usize,
    /// Number of matched entities.
    pub num_entities: usize,
}

/// Dispatcher counter snapshot.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EventStats {
    /// World-level custom event dispatcher.
    pub world: DispatcherCounters,
    /// Entity lifecycle dispatcher.
    pub lifecycle: DispatcherCounters,
}

/// Full diagnostics snapshot returned by [`World::stats`].
#[derive(Debug, Serialize)]
pub struct WorldStats {
    /// Number of live entities.
    pub entities: usize,
    /// Entity record pool occupancy.
    pub entity_pool: PoolStats,
    /// Per-query stats, keyed by normalized signature.
    pub queries: BTreeMap<String, QueryStats>,
    /// Per-component-type pool occupancy, keyed by type name.
    pub pools: BTreeMap<String, PoolStats>,
    /// Per-system stats in run order.
    pub systems: Vec<SystemStats>,
    /// Dispatcher counters.
    pub events: EventStats,
}

impl WorldStats {
    /// Renders the snapshot as a JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
