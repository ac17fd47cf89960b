//! Component schemas: attribute declarations plus the synthesized pool
//! contract (`reset` / `copy` / `clear`) and value validation.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::types::AttributeKind;

/// Errors from validating a candidate value against a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The candidate names an attribute the schema does not declare.
    #[error("component '{component}' has no attribute '{attribute}'")]
    UnknownAttribute {
        /// The schema's component name.
        component: String,
        /// The offending attribute name.
        attribute: String,
    },

    /// The candidate is not a JSON object (and the component is not a tag).
    #[error("expected an object for component '{0}'")]
    ExpectedObject(String),

    /// An attribute value does not fit its declared kind.
    #[error("attribute '{attribute}' of '{component}' expects {expected}")]
    KindMismatch {
        /// The schema's component name.
        component: String,
        /// The offending attribute name.
        attribute: String,
        /// The declared kind's name.
        expected: &'static str,
    },
}

/// One declared attribute: name, kind, and default value.
#[derive(Debug, Clone)]
pub struct AttributeDef {
    /// Attribute name.
    pub name: String,
    /// Attribute kind.
    pub kind: AttributeKind,
    /// Default value, installed by `reset` and `defaults`.
    pub default: Value,
}

/// A component described as a set of typed attributes with defaults.
///
/// An empty schema describes a tag component.
///
/// ```rust
/// use serde_json::json;
/// use weft_schema::ComponentSchema;
///
/// let schema = ComponentSchema::new("particle")
///     .attribute("x", json!(0.0))
///     .attribute("y", json!(0.0))
///     .attribute("tags", json!([]));
///
/// let mut values = schema.defaults();
/// values.insert("x".into(), json!(4.5));
/// schema.reset(&mut values);
/// assert_eq!(values["x"], json!(0.0));
/// ```
#[derive(Debug, Clone)]
pub struct ComponentSchema {
    name: String,
    attributes: Vec<AttributeDef>,
}

impl ComponentSchema {
    /// Creates an empty schema for the named component.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Declares an attribute, inferring its kind from the default value.
    ///
    /// When no built-in kind fits the default, the attribute is kept as an
    /// opaque clone-the-default kind and a warning is logged.
    #[must_use]
    pub fn attribute(self, name: impl Into<String>, default: Value) -> Self {
        let name = name.into();
        let kind = AttributeKind::infer(&default).unwrap_or_else(|| {
            warn!(
                component = self.name,
                attribute = name,
                "could not infer attribute kind from default; treating values as opaque"
            );
            AttributeKind::opaque()
        });
        self.attribute_of(name, kind, default)
    }

    /// Declares an attribute with an explicit kind.
    #[must_use]
    pub fn attribute_of(
        mut self,
        name: impl Into<String>,
        kind: AttributeKind,
        default: Value,
    ) -> Self {
        self.attributes.push(AttributeDef {
            name: name.into(),
            kind,
            default,
        });
        self
    }

    /// The component name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared attributes, in declaration order.
    #[must_use]
    pub fn attributes(&self) -> &[AttributeDef] {
        &self.attributes
    }

    /// Returns `true` if the schema declares no attributes.
    #[must_use]
    pub fn is_tag(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Builds a fresh attribute map holding every default.
    #[must_use]
    pub fn defaults(&self) -> Map<String, Value> {
        let mut values = Map::new();
        for attr in &self.attributes {
            let value = match &attr.kind {
                AttributeKind::Custom(custom) => (custom.create)(&attr.default),
                _ => attr.default.clone(),
            };
            values.insert(attr.name.clone(), value);
        }
        values
    }

    /// Restores every attribute to its default.
    pub fn reset(&self, values: &mut Map<String, Value>) {
        for attr in &self.attributes {
            match &attr.kind {
                AttributeKind::Custom(custom) => {
                    (custom.reset)(values, &attr.name, &attr.default);
                }
                _ => {
                    values.insert(attr.name.clone(), attr.default.clone());
                }
            }
        }
    }

    /// Copies every attribute present in `source` onto `target`.
    pub fn copy(&self, target: &mut Map<String, Value>, source: &Map<String, Value>) {
        for attr in &self.attributes {
            if !source.contains_key(&attr.name) {
                continue;
            }
            if let AttributeKind::Custom(custom) = &attr.kind
                && let Some(copy) = custom.copy
            {
                copy(target, source, &attr.name);
            } else {
                target.insert(attr.name.clone(), source[&attr.name].clone());
            }
        }
    }

    /// Clears every attribute to its kind's empty value.
    pub fn clear(&self, values: &mut Map<String, Value>) {
        for attr in &self.attributes {
            match &attr.kind {
                AttributeKind::Custom(custom) => (custom.clear)(values, &attr.name),
                kind => {
                    values.insert(attr.name.clone(), kind.empty());
                }
            }
        }
    }

    /// Validates a candidate value for this component.
    ///
    /// Objects may omit attributes (defaults fill the gaps) but must not
    /// name undeclared ones, and every present value must fit its declared
    /// kind. Tag components additionally accept `null`.
    ///
    /// # Errors
    ///
    /// See [`SchemaError`].
    pub fn validate(&self, value: &Value) -> Result<(), SchemaError> {
        if self.is_tag() && value.is_null() {
            return Ok(());
        }
        let Some(object) = value.as_object() else {
            return Err(SchemaError::ExpectedObject(self.name.clone()));
        };
        for key in object.keys() {
            if !self.attributes.iter().any(|attr| attr.name == *key) {
                return Err(SchemaError::UnknownAttribute {
                    component: self.name.clone(),
                    attribute: key.clone(),
                });
            }
        }
        for attr in &self.attributes {
            if let Some(candidate) = object.get(&attr.name)
                && !attr.kind.accepts(candidate)
            {
                return Err(SchemaError::KindMismatch {
                    component: self.name.clone(),
                    attribute: attr.name.clone(),
                    expected: attr.kind.name(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CustomKind;
    use serde_json::json;

    fn particle() -> ComponentSchema {
        ComponentSchema::new("particle")
            .attribute("x", json!(0.0))
            .attribute("visible", json!(true))
            .attribute("label", json!("spark"))
            .attribute("trail", json!([]))
    }

    #[test]
    fn test_defaults_hold_every_attribute() {
        let values = particle().defaults();
        assert_eq!(values["x"], json!(0.0));
        assert_eq!(values["visible"], json!(true));
        assert_eq!(values["label"], json!("spark"));
        assert_eq!(values["trail"], json!([]));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let schema = particle();
        let mut values = schema.defaults();
        values.insert("x".into(), json!(9.5));
        values.insert("label".into(), json!("ember"));
        schema.reset(&mut values);
        assert_eq!(values["x"], json!(0.0));
        assert_eq!(values["label"], json!("spark"));
    }

    #[test]
    fn test_copy_takes_only_present_attributes() {
        let schema = particle();
        let mut target = schema.defaults();
        let mut source = Map::new();
        source.insert("x".into(), json!(7.0));
        schema.copy(&mut target, &source);
        assert_eq!(target["x"], json!(7.0));
        assert_eq!(target["label"], json!("spark"));
    }

    #[test]
    fn test_clear_zeroes_by_kind() {
        let schema = particle();
        let mut values = schema.defaults();
        schema.clear(&mut values);
        assert_eq!(values["x"], json!(0));
        assert_eq!(values["visible"], json!(false));
        assert_eq!(values["label"], json!(""));
        assert_eq!(values["trail"], json!([]));
    }

    #[test]
    fn test_validate_accepts_partial_objects() {
        let schema = particle();
        assert!(schema.validate(&json!({ "x": 2.0 })).is_ok());
        assert!(schema.validate(&json!({})).is_ok());
    }

    #[test]
    fn test_validate_rejects_unknown_attribute() {
        let err = particle().validate(&json!({ "spin": 1 })).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownAttribute { .. }));
    }

    #[test]
    fn test_validate_rejects_kind_mismatch() {
        let err = particle().validate(&json!({ "x": "fast" })).unwrap_err();
        assert!(matches!(err, SchemaError::KindMismatch { .. }));
    }

    #[test]
    fn test_tag_schema_accepts_null_and_empty_object() {
        let tag = ComponentSchema::new("frozen");
        assert!(tag.is_tag());
        assert!(tag.validate(&Value::Null).is_ok());
        assert!(tag.validate(&json!({})).is_ok());
        assert!(tag.validate(&json!(1)).is_err());
    }

    #[test]
    fn test_custom_kind_behaviours() {
        // A set-like kind stored as a sorted array.
        let sorted_set = CustomKind {
            name: "sorted_set",
            is_simple: false,
            create: Value::clone,
            reset: |values, key, default| {
                values.insert(key.to_string(), default.clone());
            },
            clear: |values, key| {
                values.insert(key.to_string(), json!([]));
            },
            copy: Some(|target, source, key| {
                let mut items = source[key].as_array().cloned().unwrap_or_default();
                items.sort_by_key(|v| v.as_i64().unwrap_or(0));
                target.insert(key.to_string(), Value::Array(items));
            }),
        };
        let schema = ComponentSchema::new("membership").attribute_of(
            "ids",
            AttributeKind::Custom(sorted_set),
            json!([]),
        );

        let mut target = schema.defaults();
        let mut source = Map::new();
        source.insert("ids".into(), json!([3, 1, 2]));
        schema.copy(&mut target, &source);
        assert_eq!(target["ids"], json!([1, 2, 3]));

        schema.clear(&mut target);
        assert_eq!(target["ids"], json!([]));
    }

    #[test]
    fn test_uninferable_default_falls_back_to_opaque() {
        let schema = ComponentSchema::new("blob").attribute("payload", json!({ "a": 1 }));
        let mut values = schema.defaults();
        values.insert("payload".into(), json!({ "b": 2 }));
        schema.reset(&mut values);
        assert_eq!(values["payload"], json!({ "a": 1 }));
        schema.clear(&mut values);
        assert_eq!(values["payload"], Value::Null);
    }
}
