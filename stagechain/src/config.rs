//! Serializable descriptor configuration.
//!
//! Descriptors can be declared in code or loaded from JSON:
//!
//! ```json
//! {
//!   "policy": "ancestor_chain",
//!   "body_operations": ["pipelineA", "pipelineB"],
//!   "fallback_operations": ["part"],
//!   "depth_correction": 0
//! }
//! ```

use crate::core::SequencePolicy;
use crate::errors::StagechainError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a [`PipelineDescriptor`](crate::pipeline::PipelineDescriptor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineDescriptorConfig {
    /// How instances obtain their stage sequence.
    #[serde(default)]
    pub policy: SequencePolicy,
    /// Names of the chained body operations.
    pub body_operations: Vec<String>,
    /// Names of the fallback operations (ancestor-chain policy only).
    #[serde(default)]
    pub fallback_operations: Vec<String>,
    /// Number of most-general chain entries to exclude.
    #[serde(default = "default_depth_correction")]
    pub depth_correction: usize,
}

/// Configuration for a [`StageDescriptor`](crate::stages::StageDescriptor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDescriptorConfig {
    /// Names of the fallback operations.
    pub fallback_operations: Vec<String>,
    /// Number of most-general chain entries to exclude.
    #[serde(default = "default_depth_correction")]
    pub depth_correction: usize,
}

const fn default_depth_correction() -> usize {
    0
}

impl PipelineDescriptorConfig {
    /// Creates an ancestor-chain configuration.
    #[must_use]
    pub fn ancestor_chain(
        body_operations: impl IntoIterator<Item = impl Into<String>>,
        fallback_operations: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            policy: SequencePolicy::AncestorChain,
            body_operations: body_operations.into_iter().map(Into::into).collect(),
            fallback_operations: fallback_operations.into_iter().map(Into::into).collect(),
            depth_correction: default_depth_correction(),
        }
    }

    /// Creates an explicit-list configuration.
    #[must_use]
    pub fn explicit_list(body_operations: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            policy: SequencePolicy::ExplicitList,
            body_operations: body_operations.into_iter().map(Into::into).collect(),
            fallback_operations: Vec::new(),
            depth_correction: default_depth_correction(),
        }
    }

    /// Sets the depth correction.
    #[must_use]
    pub fn with_depth_correction(mut self, depth_correction: usize) -> Self {
        self.depth_correction = depth_correction;
        self
    }

    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StagechainError::Config`] if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, StagechainError> {
        serde_json::from_str(json).map_err(|e| StagechainError::Config(e.to_string()))
    }

    /// Reads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, or a config error if it
    /// cannot be parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StagechainError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serializes the configuration to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StagechainError::Config`] if serialization fails.
    pub fn to_json(&self) -> Result<String, StagechainError> {
        serde_json::to_string_pretty(self).map_err(|e| StagechainError::Config(e.to_string()))
    }
}

impl StageDescriptorConfig {
    /// Creates a configuration for the given fallback operations.
    #[must_use]
    pub fn new(fallback_operations: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            fallback_operations: fallback_operations.into_iter().map(Into::into).collect(),
            depth_correction: default_depth_correction(),
        }
    }

    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`StagechainError::Config`] if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, StagechainError> {
        serde_json::from_str(json).map_err(|e| StagechainError::Config(e.to_string()))
    }

    /// Reads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read, or a config error if it
    /// cannot be parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StagechainError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults_applied() {
        let config = PipelineDescriptorConfig::from_json(r#"{"body_operations": ["run"]}"#).unwrap();

        assert_eq!(config.policy, SequencePolicy::AncestorChain);
        assert!(config.fallback_operations.is_empty());
        assert_eq!(config.depth_correction, 0);
    }

    #[test]
    fn test_explicit_policy_parsed() {
        let config = PipelineDescriptorConfig::from_json(
            r#"{"policy": "explicit_list", "body_operations": ["run"], "depth_correction": 1}"#,
        )
        .unwrap();

        assert_eq!(config.policy, SequencePolicy::ExplicitList);
        assert_eq!(config.depth_correction, 1);
    }

    #[test]
    fn test_malformed_json() {
        let err = PipelineDescriptorConfig::from_json("{").unwrap_err();
        assert!(matches!(err, StagechainError::Config(_)));

        let err = StageDescriptorConfig::from_json(r#"{"depth_correction": 1}"#).unwrap_err();
        assert!(err.to_string().contains("fallback_operations"));
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let config = PipelineDescriptorConfig::ancestor_chain(["pipelineA"], ["part"])
            .with_depth_correction(2);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_json().unwrap().as_bytes()).unwrap();

        let loaded = PipelineDescriptorConfig::from_path(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_stage_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"fallback_operations": ["part", "flush"]}}"#).unwrap();

        let loaded = StageDescriptorConfig::from_path(file.path()).unwrap();
        assert_eq!(loaded, StageDescriptorConfig::new(["part", "flush"]));
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineDescriptorConfig::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, StagechainError::Io(_)));
    }
}
