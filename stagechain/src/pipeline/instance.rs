//! Pipeline instances and chained invocation.

use super::kind::PipelineKind;
use crate::core::{CallArgs, SequencePolicy};
use crate::errors::{PipelineInterruptedError, StageRef, StagechainError};
use crate::events::{
    stamped, EventSink, NoOpEventSink, PIPELINE_COMPLETED, PIPELINE_INTERRUPTED,
    PIPELINE_STARTED, STAGE_COMPLETED,
};
use crate::stages::StageKind;
use serde_json::json;
use std::fmt::{self, Debug};
use std::sync::Arc;
use tracing::{debug, debug_span, warn};

/// Result of a completed chained invocation.
#[derive(Debug)]
pub struct ChainOutcome<S, V> {
    /// Value returned by the last stage.
    pub value: V,
    /// The last stage in the sequence.
    pub last_stage: Arc<StageKind<S, V>>,
    /// Number of stages the body ran on.
    pub stages_run: usize,
}

impl<S, V> ChainOutcome<S, V> {
    /// Splits the outcome into the final value and the last stage.
    pub fn into_parts(self) -> (V, Arc<StageKind<S, V>>) {
        (self.value, self.last_stage)
    }
}

/// A runnable pipeline: a kind, a fixed stage sequence and the state the
/// stages work on.
pub struct Pipeline<S, V> {
    kind: Arc<PipelineKind<S, V>>,
    stages: Vec<Arc<StageKind<S, V>>>,
    state: S,
    sink: Arc<dyn EventSink>,
}

impl<S, V> Pipeline<S, V> {
    /// Creates an instance of an ancestor-chain kind, using the sequence
    /// computed when the kind was declared.
    ///
    /// # Errors
    ///
    /// Returns [`StagechainError::PolicyMismatch`] for explicit-list kinds.
    pub fn new(kind: &Arc<PipelineKind<S, V>>, state: S) -> Result<Self, StagechainError> {
        Self::check_policy(kind, SequencePolicy::AncestorChain)?;
        Self::assemble(kind, kind.sequence.clone(), state)
    }

    /// Creates an instance of an explicit-list kind with the given stages,
    /// used in the order supplied.
    ///
    /// # Errors
    ///
    /// Returns [`StagechainError::PolicyMismatch`] for ancestor-chain kinds
    /// and [`StagechainError::EmptyStageSequence`] if `stages` is empty.
    pub fn with_stages(
        kind: &Arc<PipelineKind<S, V>>,
        state: S,
        stages: impl IntoIterator<Item = Arc<StageKind<S, V>>>,
    ) -> Result<Self, StagechainError> {
        Self::check_policy(kind, SequencePolicy::ExplicitList)?;
        Self::assemble(kind, stages.into_iter().collect(), state)
    }

    fn check_policy(
        kind: &PipelineKind<S, V>,
        actual: SequencePolicy,
    ) -> Result<(), StagechainError> {
        if kind.policy == actual {
            Ok(())
        } else {
            Err(StagechainError::PolicyMismatch {
                pipeline: kind.name.clone(),
                expected: kind.policy,
                actual,
            })
        }
    }

    fn assemble(
        kind: &Arc<PipelineKind<S, V>>,
        stages: Vec<Arc<StageKind<S, V>>>,
        state: S,
    ) -> Result<Self, StagechainError> {
        if stages.is_empty() {
            return Err(StagechainError::EmptyStageSequence {
                pipeline: kind.name.clone(),
            });
        }
        Ok(Self {
            kind: Arc::clone(kind),
            stages,
            state,
            sink: Arc::new(NoOpEventSink),
        })
    }

    /// Sets the sink that receives lifecycle events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the pipeline kind.
    #[must_use]
    pub const fn kind(&self) -> &Arc<PipelineKind<S, V>> {
        &self.kind
    }

    /// Returns the pipeline kind's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.kind.name
    }

    /// Returns the stage sequence.
    #[must_use]
    pub fn stages(&self) -> &[Arc<StageKind<S, V>>] {
        &self.stages
    }

    /// Returns the stage names, in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Returns the state.
    #[must_use]
    pub const fn state(&self) -> &S {
        &self.state
    }

    /// Returns the state mutably.
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Consumes the pipeline, returning its state.
    pub fn into_state(self) -> S {
        self.state
    }

    /// Runs `operation` across every stage with no extra arguments.
    ///
    /// # Errors
    ///
    /// See [`invoke_with`](Self::invoke_with).
    pub fn invoke(
        &mut self,
        operation: &str,
        initial: V,
    ) -> Result<ChainOutcome<S, V>, StagechainError> {
        self.invoke_with(operation, initial, CallArgs::new())
    }

    /// Runs `operation` across every stage, threading each stage's result
    /// into the next.
    ///
    /// # Errors
    ///
    /// Returns [`StagechainError::UnknownOperation`] or
    /// [`StagechainError::MissingBody`] before any stage runs, and
    /// [`StagechainError::Interrupted`] when a stage fails. Stages after the
    /// failing one are not run.
    pub fn invoke_with(
        &mut self,
        operation: &str,
        initial: V,
        args: CallArgs,
    ) -> Result<ChainOutcome<S, V>, StagechainError> {
        let body = self.kind.resolve_body(operation)?.clone();
        let pipeline = self.kind.name.as_str();

        let span = debug_span!(
            "pipeline.invoke",
            pipeline = %pipeline,
            operation = %operation,
            stages = self.stages.len()
        );
        let _entered = span.enter();

        self.sink.emit(
            PIPELINE_STARTED,
            Some(stamped(json!({
                "pipeline": pipeline,
                "operation": operation,
                "body_origin": body.origin(),
                "stages": self.stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
                "args": &args,
            }))),
        );

        let mut current = initial;
        for (position, stage) in self.stages.iter().enumerate() {
            current = match body.call(stage, &mut self.state, current, &args) {
                Ok(next) => next,
                Err(source) => {
                    warn!(
                        stage = %stage.name(),
                        position,
                        error = %source,
                        "Stage failed, abandoning invocation"
                    );
                    self.sink.emit(
                        PIPELINE_INTERRUPTED,
                        Some(stamped(json!({
                            "pipeline": pipeline,
                            "operation": operation,
                            "stage": stage.name(),
                            "position": position,
                            "error": source.to_string(),
                        }))),
                    );
                    let stage = StageRef {
                        id: stage.id(),
                        name: stage.name().to_string(),
                        position,
                    };
                    return Err(
                        PipelineInterruptedError::new(pipeline, operation, args, stage, source)
                            .into(),
                    );
                }
            };
            debug!(stage = %stage.name(), position, "Stage completed");
            self.sink.emit(
                STAGE_COMPLETED,
                Some(stamped(json!({
                    "pipeline": pipeline,
                    "operation": operation,
                    "stage": stage.name(),
                    "position": position,
                }))),
            );
        }

        let last_stage = self
            .stages
            .last()
            .cloned()
            .ok_or_else(|| StagechainError::EmptyStageSequence {
                pipeline: pipeline.to_string(),
            })?;

        self.sink.emit(
            PIPELINE_COMPLETED,
            Some(stamped(json!({
                "pipeline": pipeline,
                "operation": operation,
                "last_stage": last_stage.name(),
                "stages_run": self.stages.len(),
            }))),
        );

        Ok(ChainOutcome {
            value: current,
            last_stage,
            stages_run: self.stages.len(),
        })
    }
}

impl<S: Debug, V> Debug for Pipeline<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("kind", &self.kind.name)
            .field("stages", &self.stage_names())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
