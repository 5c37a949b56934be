//! Extra arguments passed alongside the threaded value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Positional and named arguments handed unchanged to every stage of a run.
///
/// A failed run keeps a copy of these in its failure envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallArgs {
    /// Positional arguments.
    #[serde(default)]
    pub positional: Vec<serde_json::Value>,
    /// Named arguments.
    #[serde(default)]
    pub named: BTreeMap<String, serde_json::Value>,
}

impl CallArgs {
    /// Creates an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn with_arg(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a named argument.
    #[must_use]
    pub fn with_named(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.named.insert(key.into(), value.into());
        self
    }

    /// Gets a positional argument.
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&serde_json::Value> {
        self.positional.get(index)
    }

    /// Gets a named argument.
    #[must_use]
    pub fn named(&self, key: &str) -> Option<&serde_json::Value> {
        self.named.get(key)
    }

    /// Returns true if there are no arguments at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}
