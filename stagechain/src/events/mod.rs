//! Lifecycle events for pipeline runs.
//!
//! A [`Pipeline`](crate::pipeline::Pipeline) reports what it does to an
//! [`EventSink`]. Payloads are JSON objects stamped with an RFC 3339 time.

mod sink;

#[cfg(test)]
pub(crate) use sink::MockEventSink;
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use chrono::{SecondsFormat, Utc};

/// Emitted before the first stage runs.
pub const PIPELINE_STARTED: &str = "pipeline.started";
/// Emitted after each stage returns successfully.
pub const STAGE_COMPLETED: &str = "stage.completed";
/// Emitted after the last stage returns successfully.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
/// Emitted when a stage fails and the run is abandoned.
pub const PIPELINE_INTERRUPTED: &str = "pipeline.interrupted";

/// Adds a `timestamp` field to an event payload object.
#[must_use]
pub fn stamped(mut payload: serde_json::Value) -> serde_json::Value {
    if let serde_json::Value::Object(ref mut map) = payload {
        map.insert(
            "timestamp".to_string(),
            serde_json::json!(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
    }
    payload
}
