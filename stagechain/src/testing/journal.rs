//! A recording pipeline state and stage operations that write to it.

use crate::core::CallArgs;
use crate::errors::BoxError;
use crate::stages::StageKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One recorded stage call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// The stage operation that ran.
    pub operation: String,
    /// The pipeline kind the journal belongs to.
    pub pipeline: String,
    /// The kind whose implementation ran.
    pub defined_in: String,
    /// The value the operation returned.
    pub value: i64,
}

impl JournalEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(
        operation: impl Into<String>,
        pipeline: impl Into<String>,
        defined_in: impl Into<String>,
        value: i64,
    ) -> Self {
        Self {
            operation: operation.into(),
            pipeline: pipeline.into(),
            defined_in: defined_in.into(),
            value,
        }
    }
}

/// Pipeline state that keeps an ordered record of stage calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Journal {
    pipeline: String,
    entries: Vec<JournalEntry>,
}

impl Journal {
    /// Creates an empty journal for the named pipeline kind.
    #[must_use]
    pub fn new(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            entries: Vec::new(),
        }
    }

    /// Returns the pipeline kind name.
    #[must_use]
    pub fn pipeline(&self) -> &str {
        &self.pipeline
    }

    /// Appends an entry for this journal's pipeline.
    pub fn record(&mut self, operation: &str, defined_in: &str, value: i64) {
        let entry = JournalEntry::new(operation, self.pipeline.as_str(), defined_in, value);
        self.entries.push(entry);
    }

    /// Returns the recorded entries, in call order.
    #[must_use]
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Returns the recorded values, in call order.
    #[must_use]
    pub fn values(&self) -> Vec<i64> {
        self.entries.iter().map(|e| e.value).collect()
    }

    /// Returns the kinds whose implementations ran, in call order.
    #[must_use]
    pub fn defined_in(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.defined_in.as_str()).collect()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clears all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// The error raised by [`failing_operation`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed in {defined_in} (pipeline {pipeline}) at {value}")]
pub struct StageFailure {
    /// The stage operation that failed.
    pub operation: String,
    /// The pipeline kind the journal belongs to.
    pub pipeline: String,
    /// The kind whose implementation failed.
    pub defined_in: String,
    /// The value the operation would have returned.
    pub value: i64,
}

/// The error raised when a journal operation's result would overflow `i64`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} in {defined_in} overflowed at {value}")]
pub struct ValueOverflow {
    /// The stage operation that overflowed.
    pub operation: String,
    /// The kind whose implementation ran.
    pub defined_in: String,
    /// The value the operation received.
    pub value: i64,
}

fn next_value(operation: &str, defined_in: &str, value: i64) -> Result<i64, BoxError> {
    value.checked_add(1).ok_or_else(|| {
        Box::new(ValueOverflow {
            operation: operation.to_string(),
            defined_in: defined_in.to_string(),
            value,
        }) as BoxError
    })
}

/// A stage operation that records `(operation, pipeline, defined_in, value + 1)`
/// and returns `value + 1`. Fails with [`ValueOverflow`] at `i64::MAX`.
pub fn recording_operation(
    operation: impl Into<String>,
    defined_in: impl Into<String>,
) -> impl Fn(&mut Journal, i64, &CallArgs) -> Result<i64, BoxError> + Send + Sync + 'static {
    let operation = operation.into();
    let defined_in = defined_in.into();
    move |journal, value, _| {
        let next = next_value(&operation, &defined_in, value)?;
        journal.record(&operation, &defined_in, next);
        Ok(next)
    }
}

/// A stage operation that always fails with a [`StageFailure`] (or
/// [`ValueOverflow`] at `i64::MAX`) and records nothing.
pub fn failing_operation(
    operation: impl Into<String>,
    defined_in: impl Into<String>,
) -> impl Fn(&mut Journal, i64, &CallArgs) -> Result<i64, BoxError> + Send + Sync + 'static {
    let operation = operation.into();
    let defined_in = defined_in.into();
    move |journal, value, _| {
        let next = next_value(&operation, &defined_in, value)?;
        Err(Box::new(StageFailure {
            operation: operation.clone(),
            pipeline: journal.pipeline().to_string(),
            defined_in: defined_in.clone(),
            value: next,
        }) as BoxError)
    }
}

/// A body that runs the stage's `operation` and returns its result.
pub fn chaining_body(
    operation: impl Into<String>,
) -> impl Fn(&StageKind<Journal, i64>, &mut Journal, i64, &CallArgs) -> Result<i64, BoxError>
       + Send
       + Sync
       + 'static {
    let operation = operation.into();
    move |stage, journal, value, args| stage.call(&operation, journal, value, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::StageDescriptor;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_recording_operation() {
        let op = recording_operation("part", "Base");
        let mut journal = Journal::new("Simple");

        assert_eq!(op(&mut journal, 0, &CallArgs::new()).unwrap(), 1);
        assert_eq!(op(&mut journal, 1, &CallArgs::new()).unwrap(), 2);

        assert_eq!(
            journal.entries(),
            &[
                JournalEntry::new("part", "Simple", "Base", 1),
                JournalEntry::new("part", "Simple", "Base", 2),
            ]
        );
        assert_eq!(journal.values(), vec![1, 2]);

        journal.clear();
        assert!(journal.is_empty());
    }

    #[test]
    fn test_failing_operation() {
        let op = failing_operation("part", "Errored");
        let mut journal = Journal::new("Errored");

        let err = op(&mut journal, 1, &CallArgs::new()).unwrap_err();
        let failure = err.downcast_ref::<StageFailure>().unwrap();
        assert_eq!(failure.value, 2);
        assert_eq!(failure.pipeline, "Errored");
        assert_eq!(err.to_string(), "part failed in Errored (pipeline Errored) at 2");
        assert!(journal.is_empty());
    }

    #[test]
    fn test_operations_report_overflow() {
        let mut journal = Journal::new("Base");

        let err = recording_operation("part", "Base")(&mut journal, i64::MAX, &CallArgs::new())
            .unwrap_err();
        let overflow = err.downcast_ref::<ValueOverflow>().unwrap();
        assert_eq!(overflow.value, i64::MAX);
        assert_eq!(overflow.defined_in, "Base");
        assert!(journal.is_empty());

        let err = failing_operation("part", "Errored")(&mut journal, i64::MAX, &CallArgs::new())
            .unwrap_err();
        assert!(err.downcast_ref::<ValueOverflow>().is_some());
        assert!(journal.is_empty());
    }

    #[test]
    fn test_chaining_body_delegates() {
        let stages = StageDescriptor::new(["part"]).unwrap();
        let base = stages
            .declare("Base")
            .operation("part", recording_operation("part", "Base"))
            .build()
            .unwrap();

        let body = chaining_body("part");
        let mut journal = Journal::new("Base");
        assert_eq!(body(&*base, &mut journal, 4, &CallArgs::new()).unwrap(), 5);
        assert_eq!(journal.defined_in(), vec!["Base"]);
    }
}
