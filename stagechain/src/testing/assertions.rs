//! Test assertions for pipeline runs.

use crate::errors::{PipelineInterruptedError, StagechainError};
use crate::pipeline::Pipeline;
use crate::stages::StageKind;
use std::error::Error as StdError;

/// Asserts that `error` is a failure envelope naming `stage`, and returns it.
pub fn assert_interrupted_at<'e, S, V>(
    error: &'e StagechainError,
    stage: &StageKind<S, V>,
) -> &'e PipelineInterruptedError {
    let StagechainError::Interrupted(envelope) = error else {
        panic!("Expected an interrupted pipeline, got: {error:?}");
    };
    assert_eq!(
        envelope.stage.id,
        stage.id(),
        "Expected interruption at stage '{}', got '{}' (position {})",
        stage.name(),
        envelope.stage.name,
        envelope.stage.position
    );
    envelope
}

/// Asserts that the envelope's cause is an `E`, and returns it.
pub fn assert_cause_is<E: StdError + 'static>(envelope: &PipelineInterruptedError) -> &E {
    let Some(cause) = envelope.downcast_cause::<E>() else {
        panic!(
            "Expected cause of type {}, got: {}",
            std::any::type_name::<E>(),
            envelope.cause()
        );
    };
    cause
}

/// Asserts the pipeline's stage names, in order.
pub fn assert_stage_order<S, V>(pipeline: &Pipeline<S, V>, expected: &[&str]) {
    assert_eq!(
        pipeline.stage_names(),
        expected,
        "Unexpected stage order for pipeline '{}'",
        pipeline.name()
    );
}
