//! Runtime error types.

use weft_core::Entity;

/// Errors surfaced by world operations.
///
/// Only programming-contract violations surface as errors; idempotent
/// mis-states (re-adding an attached component, removing an absent one,
/// re-registering a type) are silent no-ops.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// The entity is not (or is no longer) managed by this world.
    #[error("entity {0} is not managed by this world")]
    EntityNotFound(Entity),

    /// A query was built without any required component type.
    #[error("query requires at least one non-negated component type")]
    EmptyQuery,
}
