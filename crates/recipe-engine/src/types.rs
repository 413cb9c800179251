//! Core value types for recipe schemas
//!
//! These types describe the semantic type of an input field and the
//! constraints a value must satisfy.

use serde::{Deserialize, Serialize};

/// Name of an input field
pub type InputName = String;

/// Name of an output field
pub type OutputName = String;

/// Identifier of a delegated task template
pub type TemplateId = String;

/// The semantic type of an input field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Whole number
    Integer,
    /// Boolean flag
    Boolean,
    /// Floating point number
    Number,
    /// Free-form text
    String,
    /// Path to a file
    File,
}

impl InputKind {
    /// Check whether a JSON value has the shape this kind expects
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        match self {
            InputKind::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value
                        .as_f64()
                        .map(|v| v.is_finite() && v.fract() == 0.0)
                        .unwrap_or(false)
            }
            InputKind::Boolean => value.is_boolean(),
            InputKind::Number => value.as_f64().map(f64::is_finite).unwrap_or(false),
            InputKind::String | InputKind::File => value.is_string(),
        }
    }

    /// Whether values of this kind can be range-checked
    pub fn is_numeric(&self) -> bool {
        matches!(self, InputKind::Integer | InputKind::Number)
    }

    /// JSON-Schema type name for this kind
    pub fn json_type(&self) -> &'static str {
        match self {
            InputKind::Integer => "integer",
            InputKind::Boolean => "boolean",
            InputKind::Number => "number",
            InputKind::String | InputKind::File => "string",
        }
    }
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            InputKind::Integer => "integer",
            InputKind::Boolean => "boolean",
            InputKind::Number => "number",
            InputKind::String => "string",
            InputKind::File => "file",
        };
        f.write_str(name)
    }
}

/// Validation constraints attached to an input field
///
/// Bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSpec {
    /// Smallest accepted value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// Largest accepted value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// Enumerated allow-list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<serde_json::Value>>,
    /// Regular expression a string value must fully match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Registered format a string value must satisfy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl ValueSpec {
    /// True when no constraint is declared
    pub fn is_empty(&self) -> bool {
        self.minimum.is_none()
            && self.maximum.is_none()
            && self.allowed.is_none()
            && self.pattern.is_none()
            && self.format.is_none()
    }

    /// Check whether a number lies within the declared bounds
    pub fn contains(&self, value: f64) -> bool {
        let above_min = self.minimum.map_or(true, |min| value >= min);
        let below_max = self.maximum.map_or(true, |max| value <= max);
        above_min && below_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_accepts_integral_values_only() {
        assert!(InputKind::Integer.accepts(&json!(360)));
        assert!(InputKind::Integer.accepts(&json!(-4)));
        assert!(InputKind::Integer.accepts(&json!(12.0)));
        assert!(!InputKind::Integer.accepts(&json!(12.5)));
        assert!(!InputKind::Integer.accepts(&json!("12")));
    }

    #[test]
    fn test_number_accepts_ints_and_floats() {
        assert!(InputKind::Number.accepts(&json!(16)));
        assert!(InputKind::Number.accepts(&json!(0.2)));
        assert!(!InputKind::Number.accepts(&json!(true)));
    }

    #[test]
    fn test_file_and_string_accept_text() {
        assert!(InputKind::File.accepts(&json!("weather.epw")));
        assert!(InputKind::String.accepts(&json!("1/1 to 12/31")));
        assert!(!InputKind::File.accepts(&json!(null)));
    }

    #[test]
    fn test_value_spec_bounds_are_inclusive() {
        let spec = ValueSpec {
            minimum: Some(2.0),
            maximum: Some(26.0),
            ..Default::default()
        };
        assert!(spec.contains(2.0));
        assert!(spec.contains(26.0));
        assert!(!spec.contains(1.9));
        assert!(!spec.contains(26.1));
    }

    #[test]
    fn test_value_spec_serialization_skips_unset() {
        let spec = ValueSpec {
            maximum: Some(360.0),
            ..Default::default()
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json, json!({"maximum": 360.0}));
    }
}
