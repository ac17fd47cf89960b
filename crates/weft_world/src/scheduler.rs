//! System scheduling and per-frame execution.
//!
//! Systems run in `(priority, registration order)` order, lower priority
//! first. Each frame, a system runs only if it is enabled, initialized, and
//! every binding it marked mandatory currently matches at least one entity.
//! Whether or not it ran, its event buffers are cleared after its turn, so
//! each turn sees exactly the events accumulated since the previous one —
//! and events a system fires during its own turn are discarded with them.

use std::any::TypeId;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use weft_core::{ComponentTypeId, EventDispatcher, ListenerId};

use crate::entity_store::EntityStore;
use crate::error::WorldError;
use crate::events::{COMPONENT_CHANGED, ENTITY_ADDED, ENTITY_REMOVED};
use crate::query::{QueryEngine, QueryId};
use crate::registry::ComponentRegistry;
use crate::system::{
    AnySystem, ChangedFilter, QueryEventSet, System, SystemAttrs, SystemContext, SystemEvents,
};
use crate::world::World;

struct ResolvedQuery {
    name: &'static str,
    query: QueryId,
    mandatory: bool,
    added: Option<ListenerId>,
    removed: Option<ListenerId>,
    changed: Option<(ListenerId, Option<Vec<ComponentTypeId>>)>,
}

struct ResolvedEvent {
    name: &'static str,
    listener: ListenerId,
}

struct SystemEntry {
    system: Box<dyn AnySystem>,
    type_id: TypeId,
    name: &'static str,
    priority: i32,
    order: u32,
    enabled: bool,
    initialized: bool,
    execute_time: Duration,
    queries: Vec<ResolvedQuery>,
    events: Vec<ResolvedEvent>,
}

/// Per-system diagnostics row.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    /// The system's Rust type name.
    pub name: String,
    /// Execution priority.
    pub priority: i32,
    /// Whether the system is currently enabled.
    pub enabled: bool,
    /// Wall-clock duration of the most recent execute, in milliseconds.
    pub execute_time_ms: f64,
}

/// Ordered collection of systems with per-frame execution.
#[derive(Default)]
pub struct Scheduler {
    entries: Vec<SystemEntry>,
    next_order: u32,
}

impl Scheduler {
    /// Number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no systems are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers a system: resolves its declared bindings, subscribes its
    /// event buffers, and re-sorts the run order.
    pub(crate) fn register<S: System>(
        &mut self,
        mut system: S,
        attrs: SystemAttrs,
        registry: &mut ComponentRegistry,
        entities: &mut EntityStore,
        queries: &mut QueryEngine,
        world_events: &mut EventDispatcher<Value>,
    ) -> Result<(), WorldError> {
        let init = system.init();

        let mut resolved_queries = Vec::with_capacity(init.queries.len());
        for binding in init.queries {
            let query = queries.get_or_create(&binding.spec, registry, entities)?;
            let added = binding
                .added
                .then(|| queries.subscribe(query, ENTITY_ADDED));
            let removed = binding
                .removed
                .then(|| queries.subscribe(query, ENTITY_REMOVED));
            let changed = binding.changed.map(|filter| {
                queries.mark_reactive(query);
                let listener = queries.subscribe(query, COMPONENT_CHANGED);
                let allow = match filter {
                    ChangedFilter::Any => None,
                    ChangedFilter::Components(registrars) => Some(
                        registrars
                            .into_iter()
                            .map(|register| register(registry))
                            .collect(),
                    ),
                };
                (listener, allow)
            });
            resolved_queries.push(ResolvedQuery {
                name: binding.name,
                query,
                mandatory: binding.mandatory,
                added,
                removed,
                changed,
            });
        }

        let resolved_events = init
            .events
            .into_iter()
            .map(|binding| ResolvedEvent {
                name: binding.name,
                listener: world_events.add_listener(&binding.event),
            })
            .collect();

        let order = self.next_order;
        self.next_order += 1;
        let name = std::any::type_name::<S>();
        info!(system = name, priority = attrs.priority, "system registered");

        self.entries.push(SystemEntry {
            system: Box::new(system),
            type_id: TypeId::of::<S>(),
            name,
            priority: attrs.priority,
            order,
            enabled: true,
            initialized: true,
            execute_time: Duration::ZERO,
            queries: resolved_queries,
            events: resolved_events,
        });
        self.entries.sort_by_key(|entry| (entry.priority, entry.order));
        Ok(())
    }

    /// Runs one frame over all systems in sorted order.
    pub(crate) fn execute(&mut self, world: &mut World, delta: f32, time: f32) {
        for entry in &mut self.entries {
            let runnable =
                entry.enabled && entry.initialized && Self::can_execute(entry, world);
            if !runnable {
                Self::discard_events(entry, world);
                continue;
            }

            let events = Self::drain_events(entry, world);
            let bindings: Vec<(&'static str, QueryId)> = entry
                .queries
                .iter()
                .map(|binding| (binding.name, binding.query))
                .collect();
            let mut ctx = SystemContext {
                world: &mut *world,
                delta,
                time,
                events,
                bindings: &bindings,
            };
            let started = Instant::now();
            entry.system.execute(&mut ctx);
            entry.execute_time = started.elapsed();

            Self::discard_events(entry, world);
        }
    }

    /// Returns the first registered system of type `S`.
    #[must_use]
    pub fn get<S: System>(&self) -> Option<&S> {
        self.entries
            .iter()
            .find(|entry| entry.type_id == TypeId::of::<S>())
            .and_then(|entry| entry.system.as_any().downcast_ref())
    }

    /// Returns the first registered system of type `S`, mutably.
    pub fn get_mut<S: System>(&mut self) -> Option<&mut S> {
        self.entries
            .iter_mut()
            .find(|entry| entry.type_id == TypeId::of::<S>())
            .and_then(|entry| entry.system.as_any_mut().downcast_mut())
    }

    /// Iterates systems in run order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn System> {
        self.entries.iter().map(|entry| &*entry.system as &dyn System)
    }

    /// Enables or disables the first system of type `S`.
    ///
    /// Returns `false` if no such system is registered.
    pub fn set_enabled<S: System>(&mut self, enabled: bool) -> bool {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.type_id == TypeId::of::<S>())
        {
            entry.enabled = enabled;
            true
        } else {
            false
        }
    }

    /// Unregisters the first system of type `S`, dropping its event
    /// subscriptions.
    pub(crate) fn remove<S: System>(
        &mut self,
        queries: &mut QueryEngine,
        world_events: &mut EventDispatcher<Value>,
    ) -> bool {
        let Some(pos) = self
            .entries
            .iter()
            .position(|entry| entry.type_id == TypeId::of::<S>())
        else {
            return false;
        };
        let entry = self.entries.remove(pos);
        for binding in &entry.queries {
            let dispatcher = &mut queries.query_mut(binding.query).dispatcher;
            for listener in [binding.added, binding.removed, binding.changed.as_ref().map(|(id, _)| *id)]
                .into_iter()
                .flatten()
            {
                dispatcher.remove_listener(listener);
            }
        }
        for binding in &entry.events {
            world_events.remove_listener(binding.listener);
        }
        true
    }

    /// Appends the systems of `other`, renumbering their registration order
    /// after this scheduler's, and re-sorts.
    pub(crate) fn absorb(&mut self, other: Scheduler) {
        for mut entry in other.entries {
            entry.order = self.next_order;
            self.next_order += 1;
            self.entries.push(entry);
        }
        self.entries.sort_by_key(|entry| (entry.priority, entry.order));
    }

    /// Diagnostics rows in run order.
    pub(crate) fn stats(&self) -> Vec<SystemStats> {
        self.entries
            .iter()
            .map(|entry| SystemStats {
                name: entry.name.to_string(),
                priority: entry.priority,
                enabled: entry.enabled,
                execute_time_ms: entry.execute_time.as_secs_f64() * 1_000.0,
            })
            .collect()
    }

    fn can_execute(entry: &SystemEntry, world: &World) -> bool {
        entry
            .queries
            .iter()
            .all(|binding| !binding.mandatory || !world.queries.query(binding.query).entities().is_empty())
    }

    fn drain_events(entry: &SystemEntry, world: &mut World) -> SystemEvents {
        let mut events = SystemEvents::default();
        for binding in &entry.queries {
            let mut set = QueryEventSet::default();
            let dispatcher = &mut world.queries.query_mut(binding.query).dispatcher;
            if let Some(listener) = binding.added {
                set.added = dispatcher
                    .drain(listener)
                    .into_iter()
                    .map(|event| event.entity)
                    .collect();
            }
            if let Some(listener) = binding.removed {
                set.removed = dispatcher
                    .drain(listener)
                    .into_iter()
                    .map(|event| event.entity)
                    .collect();
            }
            if let Some((listener, allow)) = &binding.changed {
                set.changed = dispatcher
                    .drain(*listener)
                    .into_iter()
                    .filter_map(|event| event.component.map(|tid| (event.entity, tid)))
                    .filter(|(_, tid)| allow.as_ref().is_none_or(|list| list.contains(tid)))
                    .collect();
            }
            events.queries.insert(binding.name, set);
        }
        for binding in &entry.events {
            events
                .world
                .insert(binding.name, world.events.drain(binding.listener));
        }
        events
    }

    fn discard_events(entry: &SystemEntry, world: &mut World) {
        for binding in &entry.queries {
            let dispatcher = &mut world.queries.query_mut(binding.query).dispatcher;
            for listener in [binding.added, binding.removed, binding.changed.as_ref().map(|(id, _)| *id)]
                .into_iter()
                .flatten()
            {
                dispatcher.clear(listener);
            }
        }
        for binding in &entry.events {
            world.events.clear(binding.listener);
        }
    }
}
