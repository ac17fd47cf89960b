//! # weft_schema
//!
//! Attribute-schema helper for weft components.
//!
//! A [`ComponentSchema`] describes a component as a set of named, typed
//! attributes with defaults, and synthesizes the pool contract over JSON
//! attribute maps: `reset` (restore defaults), `copy` (take values from a
//! source map), and `clear` (zero everything out). Attribute kinds are
//! inferred from the default value where possible, and custom kinds plug in
//! through a [`CustomKind`] descriptor.
//!
//! The helper is a convenience layer over the core: a component type embeds
//! an attribute map and delegates its `reset` / `copy_from` to the schema.

pub mod schema;
pub mod types;

pub use schema::{AttributeDef, ComponentSchema, SchemaError};
pub use types::{AttributeKind, CustomKind};
