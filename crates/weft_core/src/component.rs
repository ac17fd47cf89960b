//! Core [`Component`] trait and component type identity.
//!
//! Every piece of data stored in the ECS implements [`Component`]. A
//! component is a plain data record owned by exactly one entity at a time;
//! behaviour lives in systems, never on the component itself.
//!
//! ## Type identity
//!
//! Component types are identified at runtime by a [`ComponentTypeId`] — a
//! compact integer assigned by the world's component registry the first time
//! the type is registered. All per-entity component maps and all query
//! signatures are keyed by these ids, so lookups hash a `u32` rather than a
//! type name.

/// A compact identifier for a registered component type.
///
/// Ids are assigned sequentially by the component registry and are only
/// meaningful within the world whose registry assigned them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub u32);

impl ComponentTypeId {
    /// Returns the raw index value.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ComponentType({})", self.0)
    }
}

/// The core component trait.
///
/// Components must be `Clone` (so attach-with-values can copy the caller's
/// record into a pooled slot) and `Default` (the pool-clean state).
///
/// Tag components are unit structs: they carry no attributes and their
/// [`reset`](Component::reset) is effectively a no-op.
///
/// # Pooling
///
/// Instances are recycled through a per-type free-list pool. [`reset`]
/// restores a recycled instance to its pool-clean state and defaults to
/// reassigning `Self::default()`; override it when only part of the record
/// needs touching. Types whose instances cannot be meaningfully recycled
/// (e.g. records wrapping external handles) opt out by setting
/// [`POOLED`](Component::POOLED) to `false`; such types get a fresh
/// instance per attach and released instances are discarded.
///
/// # Examples
///
/// ```rust
/// use weft_core::Component;
///
/// #[derive(Debug, Clone, Default, PartialEq)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {
///     fn type_name() -> &'static str { "Health" }
/// }
///
/// #[derive(Debug, Clone, Copy, Default)]
/// struct Frozen; // a tag component
///
/// impl Component for Frozen {
///     fn type_name() -> &'static str { "Frozen" }
/// }
/// ```
pub trait Component: Clone + Default + Send + Sync + 'static {
    /// Whether instances of this type are recycled through the pool.
    const POOLED: bool = true;

    /// A human-readable name for this component type.
    ///
    /// The lower-cased form of this name participates in query signature
    /// keys and diagnostics output.
    fn type_name() -> &'static str;

    /// Restores this instance to its pool-clean state.
    fn reset(&mut self) {
        *self = Self::default();
    }

    /// Copies attribute values from a source record onto this instance.
    ///
    /// Called when a component is attached with initial values. The default
    /// clone-assigns the whole record; override for partial-copy semantics.
    fn copy_from(&mut self, source: &Self) {
        self.clone_from(source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Health {
        current: f32,
        max: f32,
    }

    impl Component for Health {
        fn type_name() -> &'static str {
            "Health"
        }
    }

    #[derive(Debug, Clone, Copy, Default)]
    struct Frozen;

    impl Component for Frozen {
        fn type_name() -> &'static str {
            "Frozen"
        }
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut h = Health {
            current: 10.0,
            max: 100.0,
        };
        h.reset();
        assert_eq!(h, Health::default());
    }

    #[test]
    fn test_copy_from_clones_source() {
        let src = Health {
            current: 30.0,
            max: 50.0,
        };
        let mut dst = Health::default();
        dst.copy_from(&src);
        assert_eq!(dst, src);
    }

    #[test]
    fn test_tag_component_is_pooled_by_default() {
        assert!(Frozen::POOLED);
        let mut tag = Frozen;
        tag.reset(); // no-op, must not panic
    }

    #[test]
    fn test_type_id_display() {
        assert_eq!(ComponentTypeId(3).to_string(), "ComponentType(3)");
        assert_eq!(ComponentTypeId(3).index(), 3);
    }
}
