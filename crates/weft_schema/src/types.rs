//! Attribute kinds and custom-kind descriptors.

use serde_json::{Map, Value};

/// The behaviours a custom attribute kind supplies.
///
/// Each function operates on the attribute map of one component instance,
/// addressed by attribute name.
#[derive(Debug, Clone, Copy)]
pub struct CustomKind {
    /// Kind name, for diagnostics.
    pub name: &'static str,
    /// Whether values are plain (safe to share by clone, no identity).
    pub is_simple: bool,
    /// Builds a fresh value from the declared default.
    pub create: fn(&Value) -> Value,
    /// Restores the attribute to its default.
    pub reset: fn(&mut Map<String, Value>, &str, &Value),
    /// Clears the attribute to the kind's empty value.
    pub clear: fn(&mut Map<String, Value>, &str),
    /// Copies the attribute from a source map. `None` falls back to a plain
    /// value clone.
    pub copy: Option<fn(&mut Map<String, Value>, &Map<String, Value>, &str)>,
}

/// The kind of one schema attribute.
#[derive(Debug, Clone, Copy)]
pub enum AttributeKind {
    /// A JSON number, cleared to `0`.
    Number,
    /// A JSON boolean, cleared to `false`.
    Boolean,
    /// A JSON string, cleared to `""`.
    String,
    /// A JSON array, cleared to `[]`.
    Array,
    /// A consumer-defined kind.
    Custom(CustomKind),
}

impl AttributeKind {
    /// Kind name, for diagnostics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Array => "array",
            Self::Custom(custom) => custom.name,
        }
    }

    /// Infers the kind from a default value. `None` when the value fits no
    /// built-in kind.
    #[must_use]
    pub fn infer(default: &Value) -> Option<Self> {
        match default {
            Value::Number(_) => Some(Self::Number),
            Value::Bool(_) => Some(Self::Boolean),
            Value::String(_) => Some(Self::String),
            Value::Array(_) => Some(Self::Array),
            _ => None,
        }
    }

    /// Returns `true` if `value` is acceptable for this kind.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::String => value.is_string(),
            Self::Array => value.is_array(),
            Self::Custom(_) => true,
        }
    }

    /// The kind's empty value.
    #[must_use]
    pub fn empty(&self) -> Value {
        match self {
            Self::Number => Value::from(0),
            Self::Boolean => Value::from(false),
            Self::String => Value::from(""),
            Self::Array => Value::Array(Vec::new()),
            Self::Custom(_) => Value::Null,
        }
    }

    /// Fallback kind for defaults no built-in kind fits: every operation
    /// clones the declared default or nulls the slot.
    #[must_use]
    pub(crate) fn opaque() -> Self {
        Self::Custom(CustomKind {
            name: "opaque",
            is_simple: false,
            create: Value::clone,
            reset: |values, key, default| {
                values.insert(key.to_string(), default.clone());
            },
            clear: |values, key| {
                values.insert(key.to_string(), Value::Null);
            },
            copy: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_infer_builtin_kinds() {
        assert_eq!(AttributeKind::infer(&json!(1.5)).unwrap().name(), "number");
        assert_eq!(AttributeKind::infer(&json!(true)).unwrap().name(), "boolean");
        assert_eq!(AttributeKind::infer(&json!("hi")).unwrap().name(), "string");
        assert_eq!(AttributeKind::infer(&json!([1, 2])).unwrap().name(), "array");
        assert!(AttributeKind::infer(&Value::Null).is_none());
        assert!(AttributeKind::infer(&json!({ "x": 1 })).is_none());
    }

    #[test]
    fn test_accepts_matches_kind() {
        assert!(AttributeKind::Number.accepts(&json!(3)));
        assert!(!AttributeKind::Number.accepts(&json!("3")));
        assert!(AttributeKind::Array.accepts(&json!([])));
        assert!(!AttributeKind::Boolean.accepts(&Value::Null));
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(AttributeKind::Number.empty(), json!(0));
        assert_eq!(AttributeKind::Boolean.empty(), json!(false));
        assert_eq!(AttributeKind::String.empty(), json!(""));
        assert_eq!(AttributeKind::Array.empty(), json!([]));
    }
}
