//! Pipeline declaration and chained invocation.
//!
//! This module provides:
//! - Pipeline descriptors and kind builders
//! - Declared pipeline kinds with resolved body tables
//! - Runnable pipeline instances

mod descriptor;
mod instance;
mod kind;


pub use descriptor::{PipelineDescriptor, PipelineKindBuilder};
pub use instance::{ChainOutcome, Pipeline};
pub use kind::{BodyFn, PipelineKind, ResolvedBody};
