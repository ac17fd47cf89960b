//! The [`System`] trait and its declarative bindings.
//!
//! A system declares, up front, which queries it runs over and which events
//! it wants buffered — the scheduler resolves those declarations once at
//! registration and from then on hands the system a [`SystemContext`] each
//! frame with the world, the frame timing, and the events accumulated since
//! the system's last turn.

use std::any::Any;
use std::collections::HashMap;

use serde_json::Value;

use weft_core::{Component, ComponentTypeId, Entity};

use crate::query::{QueryId, QuerySpec, Registrar};
use crate::registry::ComponentRegistry;
use crate::world::World;

/// Registration attributes for a system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAttrs {
    /// Execution priority. Lower runs first; ties break by registration
    /// order.
    pub priority: i32,
}

/// A piece of behaviour run once per frame over the entities its queries
/// match.
pub trait System: Send + 'static {
    /// Declares the system's query and event bindings.
    ///
    /// Called once at registration. The default declares nothing.
    fn init(&mut self) -> SystemInit {
        SystemInit::new()
    }

    /// Runs the system for one frame.
    fn execute(&mut self, ctx: &mut SystemContext<'_>);
}

/// Object-safe downcast support layered over [`System`].
pub(crate) trait AnySystem: System {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<S: System> AnySystem for S {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Which change events a query binding buffers.
pub(crate) enum ChangedFilter {
    /// Every change on member entities.
    Any,
    /// Only changes to the listed component types.
    Components(Vec<Registrar>),
}

/// One named query binding declared by a system.
pub struct QueryBinding {
    pub(crate) name: &'static str,
    pub(crate) spec: QuerySpec,
    pub(crate) mandatory: bool,
    pub(crate) added: bool,
    pub(crate) removed: bool,
    pub(crate) changed: Option<ChangedFilter>,
}

impl QueryBinding {
    /// Binds `spec` under `name` in the owning system.
    #[must_use]
    pub fn new(name: &'static str, spec: QuerySpec) -> Self {
        Self {
            name,
            spec,
            mandatory: false,
            added: false,
            removed: false,
            changed: None,
        }
    }

    /// Gates the system: it is skipped for any frame in which this query
    /// matches no entities.
    #[must_use]
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Buffers entities entering the query's matched set.
    #[must_use]
    pub fn on_added(mut self) -> Self {
        self.added = true;
        self
    }

    /// Buffers entities leaving the query's matched set.
    #[must_use]
    pub fn on_removed(mut self) -> Self {
        self.removed = true;
        self
    }

    /// Buffers every change on member entities. Marks the query reactive.
    #[must_use]
    pub fn on_changed(mut self) -> Self {
        self.changed = Some(ChangedFilter::Any);
        self
    }

    /// Buffers changes to component `T` on member entities. Marks the query
    /// reactive. May be chained to allow several types.
    #[must_use]
    pub fn on_component_changed<T: Component>(mut self) -> Self {
        let registrar: Registrar = ComponentRegistry::register::<T>;
        match &mut self.changed {
            Some(ChangedFilter::Components(list)) => list.push(registrar),
            Some(ChangedFilter::Any) => {}
            None => self.changed = Some(ChangedFilter::Components(vec![registrar])),
        }
        self
    }
}

/// One named world-event binding declared by a system.
pub(crate) struct EventBinding {
    pub(crate) name: &'static str,
    pub(crate) event: String,
}

/// The full binding declaration a system returns from [`System::init`].
#[derive(Default)]
pub struct SystemInit {
    pub(crate) queries: Vec<QueryBinding>,
    pub(crate) events: Vec<EventBinding>,
}

impl SystemInit {
    /// An empty declaration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a query binding.
    #[must_use]
    pub fn query(mut self, binding: QueryBinding) -> Self {
        self.queries.push(binding);
        self
    }

    /// Buffers world events dispatched under `event`, exposed under `name`.
    #[must_use]
    pub fn event(mut self, name: &'static str, event: impl Into<String>) -> Self {
        self.events.push(EventBinding {
            name,
            event: event.into(),
        });
        self
    }
}

/// Events drained for one query binding since the system's last turn.
#[derive(Default)]
pub(crate) struct QueryEventSet {
    pub(crate) added: Vec<Entity>,
    pub(crate) removed: Vec<Entity>,
    pub(crate) changed: Vec<(Entity, ComponentTypeId)>,
}

/// Snapshot of everything buffered for one system this frame.
#[derive(Default)]
pub(crate) struct SystemEvents {
    pub(crate) queries: HashMap<&'static str, QueryEventSet>,
    pub(crate) world: HashMap<&'static str, Vec<Value>>,
}

/// Per-frame context handed to [`System::execute`].
pub struct SystemContext<'w> {
    /// The world, for entity and component operations.
    pub world: &'w mut World,
    /// Seconds since the previous frame.
    pub delta: f32,
    /// Seconds since the world started executing.
    pub time: f32,
    pub(crate) events: SystemEvents,
    pub(crate) bindings: &'w [(&'static str, QueryId)],
}

impl SystemContext<'_> {
    /// Snapshot of the entities matching the named query binding.
    ///
    /// A snapshot, not a live view: mutating the world while iterating it is
    /// safe and does not disturb the iteration.
    #[must_use]
    pub fn entities(&self, binding: &str) -> Vec<Entity> {
        self.query_id(binding)
            .map(|id| self.world.query_entities(id).to_vec())
            .unwrap_or_default()
    }

    /// Entities that entered the named query since this system's last turn.
    #[must_use]
    pub fn added(&self, binding: &str) -> &[Entity] {
        self.events
            .queries
            .get(binding)
            .map(|set| set.added.as_slice())
            .unwrap_or(&[])
    }

    /// Entities that left the named query since this system's last turn.
    #[must_use]
    pub fn removed(&self, binding: &str) -> &[Entity] {
        self.events
            .queries
            .get(binding)
            .map(|set| set.removed.as_slice())
            .unwrap_or(&[])
    }

    /// Component changes on the named query's members since this system's
    /// last turn.
    #[must_use]
    pub fn changed(&self, binding: &str) -> &[(Entity, ComponentTypeId)] {
        self.events
            .queries
            .get(binding)
            .map(|set| set.changed.as_slice())
            .unwrap_or(&[])
    }

    /// World events buffered under the named event binding.
    #[must_use]
    pub fn events(&self, binding: &str) -> &[Value] {
        self.events
            .world
            .get(binding)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn query_id(&self, binding: &str) -> Option<QueryId> {
        self.bindings
            .iter()
            .find(|(name, _)| *name == binding)
            .map(|(_, id)| *id)
    }
}
