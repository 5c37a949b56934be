//! Testing utilities for stagechain pipelines.
//!
//! This module provides:
//! - A [`Journal`] state type that records every stage call
//! - Recording and failing stage operations
//! - Assertions for failure envelopes

mod assertions;
mod journal;

pub use assertions::{assert_cause_is, assert_interrupted_at, assert_stage_order};
pub use journal::{
    chaining_body, failing_operation, recording_operation, Journal, JournalEntry, StageFailure,
    ValueOverflow,
};
