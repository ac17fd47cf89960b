//! Event names and payloads for entity lifecycle and query membership.
//!
//! Two dispatcher families carry [`EntityEvent`] payloads: the entity
//! store's lifecycle dispatcher (creation, removal, attach, detach) and each
//! query's membership dispatcher (entity entered, entity left, component
//! changed). World-level custom events carry `serde_json::Value` payloads
//! instead and are named by the emitter.

use weft_core::{ComponentTypeId, Entity};

/// Fired by the entity store when an entity is created.
pub const ENTITY_CREATED: &str = "entity_created";
/// Fired by the entity store when an entity's removal begins, and by a
/// query when an entity leaves its matched set.
pub const ENTITY_REMOVED: &str = "entity_removed";
/// Fired by the entity store when a component is attached.
pub const COMPONENT_ADDED: &str = "component_added";
/// Fired by the entity store when a component is logically detached
/// (staged or forced).
pub const COMPONENT_REMOVED: &str = "component_removed";
/// Fired by a query when an entity enters its matched set.
pub const ENTITY_ADDED: &str = "entity_added";
/// Fired by a reactive query when a member entity's component is borrowed
/// mutably.
pub const COMPONENT_CHANGED: &str = "component_changed";

/// Payload for lifecycle and query membership events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityEvent {
    /// The entity the event concerns.
    pub entity: Entity,
    /// The component type involved, when the event is component-scoped.
    pub component: Option<ComponentTypeId>,
}

impl EntityEvent {
    /// An event about the entity as a whole.
    #[must_use]
    pub fn entity(entity: Entity) -> Self {
        Self {
            entity,
            component: None,
        }
    }

    /// An event about one component of the entity.
    #[must_use]
    pub fn component(entity: Entity, component: ComponentTypeId) -> Self {
        Self {
            entity,
            component: Some(component),
        }
    }
}
