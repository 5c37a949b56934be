//! Stage sequence policy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a pipeline instance obtains its ordered stage sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencePolicy {
    /// The pipeline kind's own specialization chain, most general ancestor first,
    /// the kind itself last.
    #[default]
    AncestorChain,
    /// An ordered list of stage kinds handed to the pipeline at construction.
    ExplicitList,
}

impl fmt::Display for SequencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AncestorChain => write!(f, "ancestor_chain"),
            Self::ExplicitList => write!(f, "explicit_list"),
        }
    }
}
