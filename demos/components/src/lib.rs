//! Example component definitions for the weft ECS runtime.
//!
//! These demonstrate the three component flavours: plain data records,
//! tag components (unit structs), and a schema-backed record whose pool
//! contract is synthesized by [`weft_schema`].

use std::sync::LazyLock;

use serde_json::{Map, Value, json};

use weft_core::Component;
use weft_schema::ComponentSchema;

/// A 2D position component.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    /// Horizontal position in world units.
    pub x: f32,
    /// Vertical position in world units.
    pub y: f32,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Component for Position {
    fn type_name() -> &'static str {
        "Position"
    }
}

/// A 2D velocity component.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity {
    /// Horizontal speed in world units per second.
    pub dx: f32,
    /// Vertical speed in world units per second.
    pub dy: f32,
}

impl Velocity {
    /// Create a new velocity.
    #[must_use]
    pub fn new(dx: f32, dy: f32) -> Self {
        Self { dx, dy }
    }
}

impl Component for Velocity {
    fn type_name() -> &'static str {
        "Velocity"
    }
}

/// Remaining time before an entity expires.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Lifetime {
    /// Seconds left.
    pub remaining: f32,
}

impl Lifetime {
    /// A lifetime of `seconds`.
    #[must_use]
    pub fn seconds(seconds: f32) -> Self {
        Self { remaining: seconds }
    }

    /// Returns `true` once the lifetime has run out.
    #[must_use]
    pub fn expired(&self) -> bool {
        self.remaining <= 0.0
    }
}

impl Component for Lifetime {
    fn type_name() -> &'static str {
        "Lifetime"
    }
}

/// Tag excluding an entity from movement.
#[derive(Debug, Clone, Copy, Default)]
pub struct Frozen;

impl Component for Frozen {
    fn type_name() -> &'static str {
        "Frozen"
    }
}

static SPARK_SCHEMA: LazyLock<ComponentSchema> = LazyLock::new(|| {
    ComponentSchema::new("spark")
        .attribute("intensity", json!(1.0))
        .attribute("hue", json!("white"))
        .attribute("trail", json!([]))
});

/// The schema backing [`Spark`].
#[must_use]
pub fn spark_schema() -> &'static ComponentSchema {
    &SPARK_SCHEMA
}

/// A schema-backed visual effect component.
///
/// Attributes live in a JSON map; `reset` and `copy_from` delegate to the
/// schema's synthesized behaviours.
#[derive(Debug, Clone)]
pub struct Spark {
    /// Attribute values, keyed by attribute name.
    pub values: Map<String, Value>,
}

impl Default for Spark {
    fn default() -> Self {
        Self {
            values: SPARK_SCHEMA.defaults(),
        }
    }
}

impl Component for Spark {
    fn type_name() -> &'static str {
        "Spark"
    }

    fn reset(&mut self) {
        SPARK_SCHEMA.reset(&mut self.values);
    }

    fn copy_from(&mut self, source: &Self) {
        SPARK_SCHEMA.copy(&mut self.values, &source.values);
    }
}
