//! # Stagechain
//!
//! Linear stage pipelines assembled from specialization chains.
//!
//! A pipeline kind is declared with a fixed set of *body operations*. Invoking
//! a body runs it once per stage, in order, threading each stage's result into
//! the next. Stages may leave *fallback operations* undefined; those resolve,
//! once and at declaration, to the most general kind in their chain.
//!
//! - **Ancestor-chain pipelines**: a kind's stages are its own ancestors
//!   followed by itself
//! - **Explicit-list pipelines**: stages are supplied when an instance is built
//! - **Failure envelopes**: a failing stage stops the run and is reported with
//!   its position, the call arguments and the original error
//! - **Event-driven observability**: lifecycle events and `tracing` spans
//!
//! ## Quick Start
//!
//! ```rust
//! use stagechain::prelude::*;
//!
//! let descriptor = PipelineDescriptor::<Vec<i64>, i64>::ancestor_chain(["run"], ["part"])?;
//!
//! let base = descriptor
//!     .declare("Base")
//!     .body("run", |stage, state, value, args| stage.call("part", state, value, args))
//!     .operation("part", |seen, value, _| {
//!         seen.push(value + 1);
//!         Ok(value + 1)
//!     })
//!     .build()?;
//! let leaf = descriptor.declare("Leaf").specializes(&base).build()?;
//!
//! let mut pipeline = Pipeline::new(&leaf, Vec::new())?;
//! let outcome = pipeline.invoke("run", 0)?;
//!
//! assert_eq!(outcome.value, 2);
//! assert_eq!(outcome.last_stage.name(), "Leaf");
//! # Ok::<(), stagechain::errors::StagechainError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{PipelineDescriptorConfig, StageDescriptorConfig};
    pub use crate::core::{CallArgs, KindId, SequencePolicy};
    pub use crate::errors::{
        BoxError, DeclarationError, MissingOperationError, PipelineInterruptedError,
        StageRef, StagechainError,
    };
    pub use crate::events::{
        CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink,
    };
    pub use crate::observability::{init_logging, LogFormat, LoggingConfig};
    pub use crate::pipeline::{ChainOutcome, Pipeline, PipelineDescriptor, PipelineKind};
    pub use crate::stages::{Resolution, StageDescriptor, StageKind};
}
