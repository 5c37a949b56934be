//! Core domain model types for stagechain.
//!
//! This module contains the small value types shared by stages and pipelines:
//! - Kind identifiers
//! - Validated operation name sets
//! - Extra call arguments threaded to every stage
//! - The stage sequence policy

mod args;
mod ids;
mod names;
mod policy;

pub use args::CallArgs;
pub use ids::KindId;
pub use names::{validate_name, OperationSet};
pub use policy::SequencePolicy;
