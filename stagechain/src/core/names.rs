//! Validated operation name sets.

use crate::errors::DeclarationError;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.:-]*$").expect("name pattern compiles"));

/// Checks that `name` is usable as an operation or kind name.
///
/// # Errors
///
/// Returns `DECL-006-INVALID_NAME` for empty names or names with unexpected characters.
pub fn validate_name(name: &str) -> Result<(), DeclarationError> {
    if NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(DeclarationError::invalid_name(name))
    }
}

/// A non-empty, ordered set of validated operation names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OperationSet {
    names: BTreeSet<String>,
}

impl OperationSet {
    /// Builds the set of body operation names.
    ///
    /// # Errors
    ///
    /// Returns `DECL-001-EMPTY_BODY` for an empty set, or `DECL-006-INVALID_NAME`.
    pub fn body(names: impl IntoIterator<Item = impl Into<String>>) -> Result<Self, DeclarationError> {
        Self::parse(names, "Body", "DECL-001-EMPTY_BODY")
    }

    /// Builds the set of fallback operation names.
    ///
    /// # Errors
    ///
    /// Returns `DECL-002-EMPTY_FALLBACK` for an empty set, or `DECL-006-INVALID_NAME`.
    pub fn fallback(
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, DeclarationError> {
        Self::parse(names, "Fallback", "DECL-002-EMPTY_FALLBACK")
    }

    fn parse(
        names: impl IntoIterator<Item = impl Into<String>>,
        role: &str,
        empty_code: &str,
    ) -> Result<Self, DeclarationError> {
        let names: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(DeclarationError::empty_operations(role, empty_code));
        }
        for name in &names {
            validate_name(name)?;
        }
        Ok(Self { names })
    }

    /// Returns true if `name` is in the set.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Returns the number of names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Rejects any name shared with `other`.
    ///
    /// # Errors
    ///
    /// Returns `DECL-003-OVERLAP` listing the shared names.
    pub fn ensure_disjoint(&self, other: &Self) -> Result<(), DeclarationError> {
        let shared: Vec<String> = self.names.intersection(&other.names).cloned().collect();
        if shared.is_empty() {
            Ok(())
        } else {
            Err(DeclarationError::overlapping_operations(shared))
        }
    }
}

impl<'a> IntoIterator for &'a OperationSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_name("pipelineA").is_ok());
        assert!(validate_name("_part").is_ok());
        assert!(validate_name("codec.decode").is_ok());
        assert!(validate_name("stage:v2-final").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "1part", "has space", "semi;colon"] {
            let err = validate_name(name).unwrap_err();
            assert_eq!(err.code(), Some("DECL-006-INVALID_NAME"), "{name}");
        }
    }

    #[test]
    fn test_empty_sets_are_rejected() {
        let body = OperationSet::body(Vec::<String>::new()).unwrap_err();
        assert_eq!(body.code(), Some("DECL-001-EMPTY_BODY"));

        let fallback = OperationSet::fallback(Vec::<String>::new()).unwrap_err();
        assert_eq!(fallback.code(), Some("DECL-002-EMPTY_FALLBACK"));
    }

    #[test]
    fn test_duplicates_collapse() {
        let set = OperationSet::body(["b", "a", "b"]).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_overlap_is_rejected() {
        let body = OperationSet::body(["pipelineA", "part"]).unwrap();
        let fallback = OperationSet::fallback(["part", "nonpart"]).unwrap();

        let err = body.ensure_disjoint(&fallback).unwrap_err();
        assert_eq!(err.code(), Some("DECL-003-OVERLAP"));
        assert!(err.message.contains("part"));
    }
}
