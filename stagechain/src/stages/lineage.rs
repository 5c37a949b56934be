//! Specialization chain helpers shared by stage and pipeline declarations.

use super::kind::{Resolution, ResolvedOperation, StageKind};
use crate::core::OperationSet;
use crate::errors::DeclarationError;
use std::collections::HashMap;

/// Accepts zero or one declared parent.
pub(crate) fn single_parent<T>(
    kind: &str,
    mut parents: Vec<T>,
    name_of: impl Fn(&T) -> String,
) -> Result<Option<T>, DeclarationError> {
    if parents.len() > 1 {
        return Err(DeclarationError::multiple_parents(
            kind,
            parents.iter().map(name_of).collect(),
        ));
    }
    Ok(parents.pop())
}

/// Drops `depth_correction` entries from the most general end of `chain`.
pub(crate) fn corrected<T>(chain: &[T], depth_correction: usize) -> &[T] {
    &chain[depth_correction.min(chain.len())..]
}

/// Builds the operation table of a new kind.
///
/// Starts from the parent's table, then binds every fallback name the kind
/// leaves undefined to `root`'s entry, then overlays the kind's own entries.
/// When `root` lacks a fallback the name is left unresolved.
pub(crate) fn resolve_operations<S, V>(
    parent: Option<&StageKind<S, V>>,
    root: Option<&StageKind<S, V>>,
    fallbacks: &OperationSet,
    own: HashMap<String, ResolvedOperation<S, V>>,
) -> HashMap<String, ResolvedOperation<S, V>> {
    let mut table: HashMap<String, ResolvedOperation<S, V>> = parent
        .map(|p| {
            p.operations
                .iter()
                .map(|(name, op)| (name.clone(), op.rebound(Resolution::Inherited)))
                .collect()
        })
        .unwrap_or_default();

    if let Some(root) = root {
        for name in fallbacks {
            if own.contains_key(name) {
                continue;
            }
            match root.operations.get(name) {
                Some(op) => {
                    table.insert(name.clone(), op.rebound(Resolution::Fallback));
                }
                None => {
                    table.remove(name);
                }
            }
        }
    }

    table.extend(own);
    table
}

/// Parent plus the parent's own chain, most general first.
pub(crate) fn extend_chain<T: Clone>(parent_chain: &[T], parent: &T) -> Vec<T> {
    let mut chain = parent_chain.to_vec();
    chain.push(parent.clone());
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_parent() {
        let none: Vec<&str> = vec![];
        assert_eq!(single_parent("K", none, |p| (*p).to_string()).unwrap(), None);
        assert_eq!(single_parent("K", vec!["A"], |p| (*p).to_string()).unwrap(), Some("A"));

        let err = single_parent("K", vec!["A", "B"], |p| (*p).to_string()).unwrap_err();
        assert_eq!(err.code(), Some("DECL-004-MULTI_PARENT"));
        assert_eq!(err.kinds, vec!["K", "A", "B"]);
    }

    #[test]
    fn test_corrected_saturates() {
        let chain = [1, 2, 3];
        assert_eq!(corrected(&chain, 0), &[1, 2, 3]);
        assert_eq!(corrected(&chain, 1), &[2, 3]);
        assert_eq!(corrected(&chain, 5), &[] as &[i32]);
    }

    #[test]
    fn test_extend_chain() {
        assert_eq!(extend_chain(&["root"], &"mid"), vec!["root", "mid"]);
    }
}
