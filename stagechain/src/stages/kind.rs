//! Declared stage kinds and their resolved operation tables.

use crate::core::{CallArgs, KindId};
use crate::errors::{BoxError, MissingOperationError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

/// A stage operation: receives the pipeline state, the current value and the
/// extra arguments, and returns the next value.
pub type OperationFn<S, V> =
    Arc<dyn Fn(&mut S, V, &CallArgs) -> Result<V, BoxError> + Send + Sync>;

/// How a stage kind obtained an entry of its operation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Defined by the kind itself.
    Own,
    /// Taken from the nearest ancestor that has it.
    Inherited,
    /// Bound at declaration to the most general ancestor's implementation.
    Fallback,
}

/// One entry of a stage kind's operation table.
pub struct ResolvedOperation<S, V> {
    origin: String,
    origin_id: KindId,
    resolution: Resolution,
    func: OperationFn<S, V>,
}

impl<S, V> ResolvedOperation<S, V> {
    pub(crate) fn own(origin: &str, origin_id: KindId, func: OperationFn<S, V>) -> Self {
        Self {
            origin: origin.to_string(),
            origin_id,
            resolution: Resolution::Own,
            func,
        }
    }

    /// Same implementation, reached through a different resolution path.
    pub(crate) fn rebound(&self, resolution: Resolution) -> Self {
        Self {
            origin: self.origin.clone(),
            origin_id: self.origin_id,
            resolution,
            func: Arc::clone(&self.func),
        }
    }

    /// Name of the kind that defined the implementation.
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Id of the kind that defined the implementation.
    #[must_use]
    pub const fn origin_id(&self) -> KindId {
        self.origin_id
    }

    /// How the entry was obtained.
    #[must_use]
    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Runs the implementation.
    pub fn call(&self, state: &mut S, value: V, args: &CallArgs) -> Result<V, BoxError> {
        (self.func)(state, value, args)
    }
}

impl<S, V> Clone for ResolvedOperation<S, V> {
    fn clone(&self) -> Self {
        self.rebound(self.resolution)
    }
}

impl<S, V> Debug for ResolvedOperation<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedOperation")
            .field("origin", &self.origin)
            .field("resolution", &self.resolution)
            .finish_non_exhaustive()
    }
}

/// A declared stage kind.
///
/// Kinds are immutable once declared and shared through `Arc` by every
/// pipeline that runs them. The operation table is final: lookups never walk
/// the specialization chain at call time.
pub struct StageKind<S, V> {
    pub(crate) id: KindId,
    pub(crate) name: String,
    pub(crate) family: KindId,
    pub(crate) parent: Option<Arc<StageKind<S, V>>>,
    pub(crate) ancestors: Vec<Arc<StageKind<S, V>>>,
    pub(crate) operations: HashMap<String, ResolvedOperation<S, V>>,
}

impl<S, V> StageKind<S, V> {
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

    /// Returns the direct parent, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<Self>> {
        self.parent.as_ref()
    }

    /// The specialization chain, most general ancestor first, not including `self`.
    #[must_use]
    pub fn ancestors(&self) -> &[Arc<Self>] {
        &self.ancestors
    }

    /// True if `other` appears in this kind's specialization chain.
    #[must_use]
    pub fn specializes(&self, other: &Self) -> bool {
        self.ancestors.iter().any(|a| a.id == other.id)
    }

    /// Looks up a resolved operation.
    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&ResolvedOperation<S, V>> {
        self.operations.get(name)
    }

    /// True if the kind defines `name` itself.
    #[must_use]
    pub fn defines(&self, name: &str) -> bool {
        self.operations
            .get(name)
            .is_some_and(|op| op.resolution == Resolution::Own)
    }

    /// Names of every resolved operation, sorted.
    #[must_use]
    pub fn operation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Calls a resolved operation on this stage.
    ///
    /// # Errors
    ///
    /// Returns the implementation's error, or a boxed [`MissingOperationError`]
    /// if the table has no entry for `operation`.
    pub fn call(
        &self,
        operation: &str,
        state: &mut S,
        value: V,
        args: &CallArgs,
    ) -> Result<V, BoxError> {
        match self.operations.get(operation) {
            Some(op) => op.call(state, value, args),
            None => Err(Box::new(MissingOperationError::new(&self.name, operation))),
        }
    }
}

impl<S, V> Debug for StageKind<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ancestors: Vec<&str> = self.ancestors.iter().map(|a| a.name.as_str()).collect();
        let operations: HashMap<&str, &str> = self
            .operations
            .iter()
            .map(|(name, op)| (name.as_str(), op.origin.as_str()))
            .collect();
        f.debug_struct("StageKind")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("ancestors", &ancestors)
            .field("operations", &operations)
            .finish_non_exhaustive()
    }
}
