//! Declared pipeline kinds.

use crate::core::{CallArgs, KindId, OperationSet, SequencePolicy};
use crate::errors::{BoxError, StagechainError};
use crate::stages::StageKind;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

/// A body operation: called once per stage with that stage, the pipeline
/// state, the accumulated value and the extra arguments.
pub type BodyFn<S, V> =
    Arc<dyn Fn(&StageKind<S, V>, &mut S, V, &CallArgs) -> Result<V, BoxError> + Send + Sync>;

/// The implementation a pipeline kind uses for one body operation.
pub struct ResolvedBody<S, V> {
    origin: String,
    origin_id: KindId,
    func: BodyFn<S, V>,
}

impl<S, V> ResolvedBody<S, V> {
    pub(crate) fn new(origin: &str, origin_id: KindId, func: BodyFn<S, V>) -> Self {
        Self {
            origin: origin.to_string(),
            origin_id,
            func,
        }
    }

    /// Name of the pipeline kind that defined the body.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Id of the pipeline kind that defined the body.
    #[must_use]
    pub const fn origin_id(&self) -> KindId {
        self.origin_id
    }

    /// Runs the body for a single stage.
    pub fn call(
        &self,
        stage: &StageKind<S, V>,
        state: &mut S,
        value: V,
        args: &CallArgs,
    ) -> Result<V, BoxError> {
        (self.func)(stage, state, value, args)
    }
}

impl<S, V> Clone for ResolvedBody<S, V> {
    fn clone(&self) -> Self {
        Self {
            origin: self.origin.clone(),
            origin_id: self.origin_id,
            func: Arc::clone(&self.func),
        }
    }
}

impl<S, V> Debug for ResolvedBody<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedBody")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// A declared pipeline kind.
///
/// Body operations resolve to the nearest kind in the lineage that defines
/// them. Under the ancestor-chain policy the kind is also a stage, and its
/// stage sequence is computed here, once.
pub struct PipelineKind<S, V> {
    pub(crate) id: KindId,
    pub(crate) name: String,
    pub(crate) family: KindId,
    pub(crate) policy: SequencePolicy,
    pub(crate) parent: Option<Arc<PipelineKind<S, V>>>,
    pub(crate) ancestors: Vec<Arc<PipelineKind<S, V>>>,
    pub(crate) body_operations: OperationSet,
    pub(crate) bodies: HashMap<String, ResolvedBody<S, V>>,
    pub(crate) stage: Option<Arc<StageKind<S, V>>>,
    pub(crate) sequence: Vec<Arc<StageKind<S, V>>>,
}

impl<S, V> PipelineKind<S, V> {
    /// Returns the kind's id.
    #[must_use]
    pub const fn id(&self) -> KindId {
        self.id
    }

    /// Returns the kind's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Id of the descriptor that declared this kind.
    #[must_use]
    pub const fn family(&self) -> KindId {
        self.family
    }

    /// Returns the sequence policy.
    #[must_use]
    pub const fn policy(&self) -> SequencePolicy {
        self.policy
    }

    /// Returns the direct parent, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<Self>> {
        self.parent.as_ref()
    }

    /// The specialization chain, most general first, not including `self`.
    #[must_use]
    pub fn ancestors(&self) -> &[Arc<Self>] {
        &self.ancestors
    }

    /// The declared body operation names.
    #[must_use]
    pub const fn body_operations(&self) -> &OperationSet {
        &self.body_operations
    }

    /// Looks up a resolved body.
    #[must_use]
    pub fn body(&self, operation: &str) -> Option<&ResolvedBody<S, V>> {
        self.bodies.get(operation)
    }

    /// The kind's own stage record (ancestor-chain policy only).
    #[must_use]
    pub fn stage(&self) -> Option<&Arc<StageKind<S, V>>> {
        self.stage.as_ref()
    }

    /// The precomputed stage sequence (ancestor-chain policy only; empty otherwise).
    #[must_use]
    pub fn sequence(&self) -> &[Arc<StageKind<S, V>>] {
        &self.sequence
    }

    /// Finds the body to run for `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`StagechainError::UnknownOperation`] if the name is not a
    /// declared body operation, or [`StagechainError::MissingBody`] if no kind
    /// in the lineage implements it.
    pub fn resolve_body(&self, operation: &str) -> Result<&ResolvedBody<S, V>, StagechainError> {
        if !self.body_operations.contains(operation) {
            return Err(StagechainError::UnknownOperation {
                pipeline: self.name.clone(),
                operation: operation.to_string(),
            });
        }
        self.bodies
            .get(operation)
            .ok_or_else(|| StagechainError::MissingBody {
                pipeline: self.name.clone(),
                operation: operation.to_string(),
            })
    }
}

impl<S, V> Debug for PipelineKind<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sequence: Vec<&str> = self.sequence.iter().map(|s| s.name()).collect();
        let bodies: HashMap<&str, &str> = self
            .bodies
            .iter()
            .map(|(name, body)| (name.as_str(), body.origin.as_str()))
            .collect();
        f.debug_struct("PipelineKind")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("policy", &self.policy)
            .field("bodies", &bodies)
            .field("sequence", &sequence)
            .finish_non_exhaustive()
    }
}
