//! Stage kinds and the descriptors that declare them.
//!
//! A stage kind is an explicit record: its own operations, the operations it
//! inherits from its single parent, and, for every fallback operation it does
//! not define, the implementation of the most general ancestor in its chain.
//! All of it is resolved once, when the kind is declared.

mod descriptor;
mod kind;
pub(crate) mod lineage;

pub use descriptor::{StageDescriptor, StageKindBuilder};
pub use kind::{OperationFn, Resolution, ResolvedOperation, StageKind};
