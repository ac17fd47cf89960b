//! Entity identifiers.
//!
//! An [`Entity`] is a lightweight `u64` handle with no inherent data.
//! Components are attached to entities to give them meaning.

/// A unique entity identifier.
///
/// Ids are allocated by the world that owns the entity and are **unique over
/// time** within that world: when an entity record is released back to the
/// pool and later recycled, the recycled record is handed out under a fresh
/// id. A stale `Entity` value therefore never aliases a newer entity, and
/// lookups with it simply miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(pub u64);

impl Entity {
    /// Create an entity handle from a raw `u64` identifier.
    ///
    /// Useful in tests and tooling; real handles come from
    /// `World::create_entity`.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_raw_roundtrip() {
        let e = Entity::from_raw(42);
        assert_eq!(e.id(), 42);
        assert_eq!(e, Entity(42));
    }

    #[test]
    fn test_entity_display() {
        assert_eq!(Entity::from_raw(7).to_string(), "Entity(7)");
    }

    #[test]
    fn test_entity_ordering_follows_id() {
        assert!(Entity(1) < Entity(2));
        assert!(Entity(2) < Entity(10));
    }
}
