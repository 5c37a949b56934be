//! Error types for stage chains.
//!
//! Declaration problems are reported eagerly as [`DeclarationError`]; failures
//! raised by a stage while a chain runs are wrapped in a
//! [`PipelineInterruptedError`] that keeps the original error as its source.

use crate::core::{CallArgs, KindId, SequencePolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error as StdError;
use thiserror::Error;

/// Boxed error returned by stage and body implementations.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The main error type for stagechain operations.
#[derive(Debug, Error)]
pub enum StagechainError {
    /// A kind or descriptor declaration was rejected.
    #[error("{0}")]
    Declaration(#[from] DeclarationError),

    /// A stage failed while a body operation was running.
    #[error("{0}")]
    Interrupted(#[from] PipelineInterruptedError),

    /// The requested body operation is not declared on the descriptor.
    #[error("Unknown body operation '{operation}' on pipeline '{pipeline}'")]
    UnknownOperation {
        /// The pipeline kind name.
        pipeline: String,
        /// The requested operation.
        operation: String,
    },

    /// The body operation is declared but no kind in the lineage implements it.
    #[error("Body operation '{operation}' has no implementation in the lineage of '{pipeline}'")]
    MissingBody {
        /// The pipeline kind name.
        pipeline: String,
        /// The requested operation.
        operation: String,
    },

    /// A pipeline was constructed with no stages.
    #[error("Pipeline '{pipeline}' cannot run an empty stage sequence")]
    EmptyStageSequence {
        /// The pipeline kind name.
        pipeline: String,
    },

    /// A pipeline was constructed in a way its kind's policy does not allow.
    #[error("Pipeline '{pipeline}' uses the {expected} policy, not {actual}")]
    PolicyMismatch {
        /// The pipeline kind name.
        pipeline: String,
        /// The policy the kind was declared with.
        expected: SequencePolicy,
        /// The policy implied by the constructor that was called.
        actual: SequencePolicy,
    },

    /// Configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Logging could not be initialized.
    #[error("Logging error: {0}")]
    Logging(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Diagnostic metadata attached to declaration errors.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DiagnosticInfo {
    /// Error code (e.g., "DECL-004-MULTI_PARENT").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl DiagnosticInfo {
    /// Creates new diagnostic info; the fix hint defaults to the known suggestion for `code`.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        let code = code.into();
        let fix_hint = DeclarationSuggestions::get(&code).map(str::to_string);
        Self {
            code,
            summary: summary.into(),
            fix_hint,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("code".to_string(), serde_json::json!(self.code));
        map.insert("summary".to_string(), serde_json::json!(self.summary));
        if let Some(ref hint) = self.fix_hint {
            map.insert("fix_hint".to_string(), serde_json::json!(hint));
        }
        if !self.context.is_empty() {
            map.insert("context".to_string(), serde_json::json!(self.context));
        }
        map
    }
}

/// Error raised when a descriptor or kind declaration is invalid.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DeclarationError {
    /// The error message.
    pub message: String,
    /// The kinds involved in the error.
    pub kinds: Vec<String>,
    /// Optional diagnostic info.
    pub error_info: Option<DiagnosticInfo>,
}

impl DeclarationError {
    /// Creates a new declaration error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kinds: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the kinds involved.
    #[must_use]
    pub fn with_kinds(mut self, kinds: Vec<String>) -> Self {
        self.kinds = kinds;
        self
    }

    /// Sets the diagnostic info.
    #[must_use]
    pub fn with_error_info(mut self, info: DiagnosticInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the diagnostic code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }

    pub(crate) fn empty_operations(role: &str, code: &str) -> Self {
        Self::new(format!("{role} operation names must be non-empty"))
            .with_error_info(DiagnosticInfo::new(code, format!("No {role} operations declared")))
    }

    pub(crate) fn overlapping_operations(names: Vec<String>) -> Self {
        Self::new(format!(
            "Body operations must not intersect fallback operations: {}",
            names.join(", ")
        ))
        .with_error_info(
            DiagnosticInfo::new("DECL-003-OVERLAP", "Body and fallback operation names overlap")
                .with_context_entry("names", names.join(",")),
        )
    }

    pub(crate) fn invalid_name(name: &str) -> Self {
        Self::new(format!("'{name}' is not a valid operation or kind name")).with_error_info(
            DiagnosticInfo::new("DECL-006-INVALID_NAME", "Invalid name")
                .with_context_entry("name", name),
        )
    }

    pub(crate) fn multiple_parents(kind: &str, parents: Vec<String>) -> Self {
        let mut kinds = vec![kind.to_string()];
        kinds.extend(parents.iter().cloned());
        Self::new(format!(
            "Kind '{kind}' declares {} parents ({}); only single specialization is supported",
            parents.len(),
            parents.join(", ")
        ))
        .with_kinds(kinds)
        .with_error_info(DiagnosticInfo::new(
            "DECL-004-MULTI_PARENT",
            "Multiple parents are not supported",
        ))
    }

    pub(crate) fn foreign_lineage(kind: &str, parent: &str) -> Self {
        Self::new(format!(
            "Kind '{kind}' cannot specialize '{parent}': it was declared by another descriptor"
        ))
        .with_kinds(vec![kind.to_string(), parent.to_string()])
        .with_error_info(DiagnosticInfo::new(
            "DECL-005-FOREIGN_LINEAGE",
            "Parent belongs to a different descriptor",
        ))
    }

    pub(crate) fn undeclared_body(kind: &str, operation: &str) -> Self {
        Self::new(format!(
            "Kind '{kind}' implements '{operation}', which is not a declared body operation"
        ))
        .with_kinds(vec![kind.to_string()])
        .with_error_info(
            DiagnosticInfo::new("DECL-007-UNDECLARED_BODY", "Undeclared body operation")
                .with_context_entry("operation", operation),
        )
    }

    pub(crate) fn duplicate_operation(kind: &str, operation: &str) -> Self {
        Self::new(format!("Kind '{kind}' defines '{operation}' more than once"))
            .with_kinds(vec![kind.to_string()])
            .with_error_info(
                DiagnosticInfo::new("DECL-008-DUPLICATE", "Duplicate operation definition")
                    .with_context_entry("operation", operation),
            )
    }

    pub(crate) fn policy_violation(kind: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(format!("Kind '{kind}': {message}"))
            .with_kinds(vec![kind.to_string()])
            .with_error_info(DiagnosticInfo::new("DECL-009-POLICY", message))
    }

    pub(crate) fn descriptor_policy_violation(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(format!("Descriptor configuration: {message}"))
            .with_error_info(DiagnosticInfo::new("DECL-009-POLICY", message))
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("message".to_string(), serde_json::json!(self.message));
        map.insert("kinds".to_string(), serde_json::json!(self.kinds));
        if let Some(ref info) = self.error_info {
            let info_map: serde_json::Map<String, serde_json::Value> =
                info.to_dict().into_iter().collect();
            map.insert("error_info".to_string(), serde_json::Value::Object(info_map));
        }
        map
    }
}

/// Identifies the stage at which a chain was interrupted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRef {
    /// The stage kind's id.
    pub id: KindId,
    /// The stage kind's name.
    pub name: String,
    /// Zero-based position in the stage sequence.
    pub position: usize,
}

/// The failure envelope: a stage failed and the rest of the chain was skipped.
#[derive(Debug, Error)]
#[error(
    "Pipeline '{pipeline}' interrupted in '{operation}' at stage '{}' (position {}): {source}",
    .stage.name,
    .stage.position
)]
pub struct PipelineInterruptedError {
    /// The pipeline kind name.
    pub pipeline: String,
    /// The body operation that was running.
    pub operation: String,
    /// The extra arguments of the top-level invocation.
    pub args: CallArgs,
    /// The stage whose implementation failed.
    pub stage: StageRef,
    #[source]
    source: BoxError,
}

impl PipelineInterruptedError {
    /// Creates a new failure envelope around `source`.
    #[must_use]
    pub fn new(
        pipeline: impl Into<String>,
        operation: impl Into<String>,
        args: CallArgs,
        stage: StageRef,
        source: BoxError,
    ) -> Self {
        Self {
            pipeline: pipeline.into(),
            operation: operation.into(),
            args,
            stage,
            source,
        }
    }

    /// Returns the original error raised by the stage.
    #[must_use]
    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.source.as_ref()
    }

    /// True if the original error is of type `E`.
    #[must_use]
    pub fn cause_is<E: StdError + 'static>(&self) -> bool {
        self.source.is::<E>()
    }

    /// Downcasts the original error to `E`.
    #[must_use]
    pub fn downcast_cause<E: StdError + 'static>(&self) -> Option<&E> {
        self.source.downcast_ref::<E>()
    }

    /// Consumes the envelope and returns the original error.
    #[must_use]
    pub fn into_cause(self) -> BoxError {
        self.source
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("pipeline".to_string(), serde_json::json!(self.pipeline));
        map.insert("operation".to_string(), serde_json::json!(self.operation));
        map.insert("args".to_string(), serde_json::json!(self.args));
        map.insert("stage".to_string(), serde_json::json!(self.stage));
        map.insert("cause".to_string(), serde_json::json!(self.source.to_string()));
        map
    }
}

/// Raised when a stage has no implementation for a requested operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Stage '{stage}' has no implementation for operation '{operation}'")]
pub struct MissingOperationError {
    /// The stage kind name.
    pub stage: String,
    /// The missing operation.
    pub operation: String,
}

impl MissingOperationError {
    /// Creates a new missing operation error.
    #[must_use]
    pub fn new(stage: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            operation: operation.into(),
        }
    }
}

/// Provides default suggestions for declaration error codes.
pub struct DeclarationSuggestions;

impl DeclarationSuggestions {
    /// Gets a suggestion for a given error code.
    #[must_use]
    pub fn get(code: &str) -> Option<&'static str> {
        match code {
            "DECL-001-EMPTY_BODY" => Some("Declare at least one body operation on the pipeline descriptor."),
            "DECL-002-EMPTY_FALLBACK" => Some(
                "Declare at least one fallback operation. A passthrough operation on the root \
                 kind is a good candidate.",
            ),
            "DECL-003-OVERLAP" => Some(
                "A name is either chained across stages or resolved as a fallback, not both. \
                 Rename one of them.",
            ),
            "DECL-004-MULTI_PARENT" => Some(
                "Specialize exactly one parent kind. Merge the parents into a linear chain instead.",
            ),
            "DECL-005-FOREIGN_LINEAGE" => Some(
                "Declare the parent and the child with the same descriptor.",
            ),
            "DECL-006-INVALID_NAME" => Some(
                "Names start with a letter or underscore and contain only letters, digits, \
                 '_', '.', ':' or '-'.",
            ),
            "DECL-007-UNDECLARED_BODY" => Some(
                "Add the name to the descriptor's body operations, or register it as a stage \
                 operation.",
            ),
            "DECL-008-DUPLICATE" => Some("Define each operation once per kind."),
            "DECL-009-POLICY" => Some(
                "Explicit-list pipelines take their stage operations from stage kinds declared \
                 with a StageDescriptor.",
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("disk on fire: {0}")]
    struct DiskOnFire(u32);

    fn envelope() -> PipelineInterruptedError {
        PipelineInterruptedError::new(
            "Errored",
            "pipelineA",
            CallArgs::new().with_arg(7),
            StageRef {
                id: KindId::new(),
                name: "Errored".to_string(),
                position: 2,
            },
            Box::new(DiskOnFire(3)),
        )
    }

    #[test]
    fn test_diagnostic_info_defaults_fix_hint() {
        let info = DiagnosticInfo::new("DECL-004-MULTI_PARENT", "Multiple parents")
            .with_context_entry("kind", "Leaf");

        assert_eq!(info.code, "DECL-004-MULTI_PARENT");
        assert!(info.fix_hint.is_some());
        assert_eq!(info.context.get("kind"), Some(&"Leaf".to_string()));
    }

    #[test]
    fn test_declaration_error_to_dict() {
        let err = DeclarationError::multiple_parents("Leaf", vec!["A".into(), "B".into()]);
        let dict = err.to_dict();

        assert_eq!(err.code(), Some("DECL-004-MULTI_PARENT"));
        assert_eq!(dict.get("kinds").unwrap(), &serde_json::json!(["Leaf", "A", "B"]));
        assert!(dict.contains_key("error_info"));
    }

    #[test]
    fn test_envelope_keeps_cause() {
        let err = envelope();

        assert!(err.cause_is::<DiskOnFire>());
        assert_eq!(err.downcast_cause::<DiskOnFire>().unwrap().0, 3);
        assert_eq!(err.source().unwrap().to_string(), "disk on fire: 3");
        assert!(err.to_string().contains("at stage 'Errored' (position 2)"));
    }

    #[test]
    fn test_envelope_into_cause() {
        let cause = envelope().into_cause();
        assert!(cause.downcast_ref::<DiskOnFire>().is_some());
    }

    #[test]
    fn test_umbrella_conversion() {
        let err: StagechainError = envelope().into();
        assert!(matches!(err, StagechainError::Interrupted(_)));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_suggestions() {
        assert!(DeclarationSuggestions::get("DECL-003-OVERLAP").is_some());
        assert!(DeclarationSuggestions::get("UNKNOWN").is_none());
    }
}
