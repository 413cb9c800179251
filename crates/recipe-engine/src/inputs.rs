//! Caller-provided input values
//!
//! `InputValues` is what a host collects (from a JSON file, a form, a CLI);
//! `ResolvedInputs` is what validation hands to the runner, with defaults
//! applied.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RecipeError, Result};

/// Input values keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputValues {
    values: BTreeMap<String, serde_json::Value>,
}

impl InputValues {
    /// Create an empty set of values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, returning self for chaining
    pub fn with(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a value
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Get a value; `null` counts as absent
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    /// Names of every provided value
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    /// Parse values from a JSON object
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Object(map) => Ok(Self {
                values: map.into_iter().collect(),
            }),
            other => Err(RecipeError::Serialization(serde::de::Error::custom(format!(
                "input values must be a JSON object, got {}",
                other
            )))),
        }
    }

    /// Load values from a JSON file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        Self::from_json(value)
    }
}

/// Input values after validation, with defaults applied
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedInputs {
    values: BTreeMap<String, serde_json::Value>,
}

impl ResolvedInputs {
    pub(crate) fn insert(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.values.insert(name.into(), value);
    }

    /// Get a resolved value; absent optional fields return `None`
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.values.get(name)
    }

    /// Whether a value was resolved for this field
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of resolved values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when nothing was resolved
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over resolved values
    pub fn iter(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}
