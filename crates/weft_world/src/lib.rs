//! # weft_world
//!
//! The weft ECS runtime: a [`World`] aggregate owning the component
//! registry, entity store, query engine, and scheduler.
//!
//! State lives in components attached to entities; behaviour lives in
//! systems iterating the entities their queries match. Queries update
//! incrementally on every attach/detach, membership changes fire events the
//! moment the index mutates, and removals are two-phase by default — the
//! index updates immediately, memory reclamation waits for frame end.
//!
//! ```rust
//! use weft_core::Component;
//! use weft_world::{QuerySpec, World};
//!
//! #[derive(Debug, Clone, Default)]
//! struct Position { x: f32, y: f32 }
//! impl Component for Position {
//!     fn type_name() -> &'static str { "Position" }
//! }
//!
//! let mut world = World::new();
//! let entity = world.create_entity();
//! world.add_component(entity, Position { x: 1.0, y: 2.0 });
//!
//! let query = world.query_components(QuerySpec::new().with::<Position>()).unwrap();
//! assert_eq!(world.query_entities(query), &[entity]);
//! ```

pub mod entity_store;
pub mod error;
pub mod events;
pub mod query;
pub mod registry;
pub mod scheduler;
pub mod system;
pub mod world;

pub use entity_store::EntityStore;
pub use error::WorldError;
pub use events::EntityEvent;
pub use query::{Query, QueryEngine, QueryId, QuerySignature, QuerySpec};
pub use registry::{ComponentInfo, ComponentRegistry};
pub use scheduler::{Scheduler, SystemStats};
pub use system::{QueryBinding, System, SystemAttrs, SystemContext, SystemInit};
pub use world::{EventStats, QueryStats, World, WorldOptions, WorldStats};

#[cfg(test)]
mod tests;
