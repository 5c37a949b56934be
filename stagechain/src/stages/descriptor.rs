//! Stage descriptors: templates for declaring stage kinds.

use super::kind::{OperationFn, ResolvedOperation, StageKind};
use super::lineage::{corrected, extend_chain, resolve_operations, single_parent};
use crate::config::StageDescriptorConfig;
use crate::core::{validate_name, CallArgs, KindId, OperationSet};
use crate::errors::{BoxError, DeclarationError};
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Template for declaring stage kinds that share a set of fallback operations.
///
/// Every kind declared through the same descriptor belongs to one family;
/// a kind may only specialize a parent from its own family.
pub struct StageDescriptor<S, V> {
    id: KindId,
    fallback_operations: OperationSet,
    depth_correction: usize,
    _marker: PhantomData<fn() -> (S, V)>,
}

impl<S, V> StageDescriptor<S, V> {
    /// Creates a descriptor for the given fallback operation names.
    ///
    /// # Errors
    ///
    /// Returns an error if the set is empty or contains an invalid name.
    pub fn new(
        fallback_operations: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, DeclarationError> {
        Ok(Self::from_parts(
            KindId::new(),
            OperationSet::fallback(fallback_operations)?,
            0,
        ))
    }

    /// Creates a descriptor from its configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured fallback set is invalid.
    pub fn from_config(config: &StageDescriptorConfig) -> Result<Self, DeclarationError> {
        Ok(Self::new(config.fallback_operations.iter().cloned())?
            .with_depth_correction(config.depth_correction))
    }

    pub(crate) fn from_parts(
        id: KindId,
        fallback_operations: OperationSet,
        depth_correction: usize,
    ) -> Self {
        Self {
            id,
            fallback_operations,
            depth_correction,
            _marker: PhantomData,
        }
    }

    /// Excludes this many most-general ancestors when choosing a fallback root.
    #[must_use]
    pub fn with_depth_correction(mut self, depth_correction: usize) -> Self {
        self.depth_correction = depth_correction;
        self
    }

    /// Returns the descriptor id shared by every kind it declares.
    #[must_use]
    pub const fn id(&self) -> KindId {
        self.id
    }

    /// Returns the fallback operation names.
    #[must_use]
    pub const fn fallback_operations(&self) -> &OperationSet {
        &self.fallback_operations
    }

    /// Returns the depth correction.
    #[must_use]
    pub const fn depth_correction(&self) -> usize {
        self.depth_correction
    }

    /// Starts declaring a stage kind.
    pub fn declare(&self, name: impl Into<String>) -> StageKindBuilder<'_, S, V> {
        StageKindBuilder {
            descriptor: self,
            id: KindId::new(),
            name: name.into(),
            parents: Vec::new(),
            operations: Vec::new(),
        }
    }
}

impl<S, V> Debug for StageDescriptor<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageDescriptor")
            .field("id", &self.id)
            .field("fallback_operations", &self.fallback_operations)
            .field("depth_correction", &self.depth_correction)
            .finish()
    }
}

/// Builder for a single stage kind.
///
/// Problems are collected and reported by [`StageKindBuilder::build`].
#[must_use]
pub struct StageKindBuilder<'d, S, V> {
    descriptor: &'d StageDescriptor<S, V>,
    id: KindId,
    name: String,
    parents: Vec<Arc<StageKind<S, V>>>,
    operations: Vec<(String, OperationFn<S, V>)>,
}

impl<S, V> StageKindBuilder<'_, S, V> {
    /// Declares `parent` as the kind being specialized.
    ///
    /// Calling this more than once makes [`build`](Self::build) fail.
    pub fn specializes(mut self, parent: &Arc<StageKind<S, V>>) -> Self {
        self.parents.push(Arc::clone(parent));
        self
    }

    /// Defines an operation on this kind.
    pub fn operation<F>(self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut S, V, &CallArgs) -> Result<V, BoxError> + Send + Sync + 'static,
    {
        self.operation_fn(name.into(), Arc::new(func))
    }

    pub(crate) fn operation_fn(mut self, name: String, func: OperationFn<S, V>) -> Self {
        self.operations.push((name, func));
        self
    }

    pub(crate) fn with_id(mut self, id: KindId) -> Self {
        self.id = id;
        self
    }

    /// Declares the kind, resolving its fallback operations.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid names, duplicate operations, more than one
    /// parent, or a parent declared by another descriptor.
    pub fn build(self) -> Result<Arc<StageKind<S, V>>, DeclarationError> {
        let Self {
            descriptor,
            id,
            name,
            parents,
            operations,
        } = self;

        validate_name(&name)?;
        let parent = single_parent(&name, parents, |p| p.name.clone())?;
        if let Some(ref parent) = parent {
            if parent.family != descriptor.id {
                return Err(DeclarationError::foreign_lineage(&name, &parent.name));
            }
        }

        let mut own = HashMap::with_capacity(operations.len());
        for (op_name, func) in operations {
            validate_name(&op_name)?;
            if own.contains_key(&op_name) {
                return Err(DeclarationError::duplicate_operation(&name, &op_name));
            }
            let resolved = ResolvedOperation::own(&name, id, func);
            own.insert(op_name, resolved);
        }

        let ancestors = parent
            .as_ref()
            .map_or_else(Vec::new, |p| extend_chain(&p.ancestors, p));
        let root = corrected(&ancestors, descriptor.depth_correction).first();
        let operations = resolve_operations(
            parent.as_deref(),
            root.map(|r| &**r),
            &descriptor.fallback_operations,
            own,
        );

        debug!(
            stage = %name,
            parent = parent.as_ref().map(|p| p.name.as_str()),
            fallback_root = root.map(|r| r.name.as_str()),
            operations = operations.len(),
            "Declared stage kind"
        );

        Ok(Arc::new(StageKind {
            id,
            name,
            family: descriptor.id,
            parent,
            ancestors,
            operations,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MissingOperationError;
    use crate::stages::Resolution;

    type Trail = Vec<String>;

    fn tagging(
        tag: &'static str,
    ) -> impl Fn(&mut Trail, i64, &CallArgs) -> Result<i64, BoxError> + Send + Sync + 'static {
        move |trail, value, _| {
            trail.push(tag.to_string());
            Ok(value + 1)
        }
    }

    fn descriptor() -> StageDescriptor<Trail, i64> {
        StageDescriptor::new(["part"]).unwrap()
    }

    fn run(kind: &StageKind<Trail, i64>, op: &str) -> (Trail, i64) {
        let mut trail = Vec::new();
        let value = kind.call(op, &mut trail, 0, &CallArgs::new()).unwrap();
        (trail, value)
    }

    #[test]
    fn test_root_kind_uses_own_operations() {
        let d = descriptor();
        let root = d
            .declare("Root")
            .operation("part", tagging("Root"))
            .build()
            .unwrap();

        assert!(root.ancestors().is_empty());
        assert!(root.defines("part"));
        assert_eq!(run(&root, "part"), (vec!["Root".to_string()], 1));
    }

    #[test]
    fn test_fallback_skips_intermediate_override() {
        let d = descriptor();
        let root = d.declare("Root").operation("part", tagging("Root")).build().unwrap();
        let mid = d
            .declare("Mid")
            .specializes(&root)
            .operation("part", tagging("Mid"))
            .build()
            .unwrap();
        let leaf = d.declare("Leaf").specializes(&mid).build().unwrap();

        let part = leaf.operation("part").unwrap();
        assert_eq!(part.origin(), "Root");
        assert_eq!(part.origin_id(), root.id());
        assert_eq!(part.resolution(), Resolution::Fallback);
        assert_eq!(run(&leaf, "part").0, vec!["Root".to_string()]);
        assert_eq!(run(&mid, "part").0, vec!["Mid".to_string()]);
    }

    #[test]
    fn test_non_fallback_uses_nearest_ancestor() {
        let d = descriptor();
        let root = d
            .declare("Root")
            .operation("part", tagging("Root"))
            .operation("nonpart", tagging("Root"))
            .build()
            .unwrap();
        let mid = d
            .declare("Mid")
            .specializes(&root)
            .operation("nonpart", tagging("Mid"))
            .build()
            .unwrap();
        let leaf = d.declare("Leaf").specializes(&mid).build().unwrap();

        let nonpart = leaf.operation("nonpart").unwrap();
        assert_eq!(nonpart.origin(), "Mid");
        assert_eq!(nonpart.resolution(), Resolution::Inherited);
        assert_eq!(leaf.operation_names(), vec!["nonpart", "part"]);
    }

    #[test]
    fn test_ancestors_are_most_general_first() {
        let d = descriptor();
        let a = d.declare("A").operation("part", tagging("A")).build().unwrap();
        let b = d.declare("B").specializes(&a).build().unwrap();
        let c = d.declare("C").specializes(&b).build().unwrap();

        let names: Vec<&str> = c.ancestors().iter().map(|k| k.name()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(c.specializes(&a));
        assert!(!a.specializes(&c));
        assert_eq!(c.parent().unwrap().id(), b.id());
    }

    #[test]
    fn test_depth_correction_moves_fallback_root() {
        let d = descriptor().with_depth_correction(1);
        let layer = d.declare("Layer").operation("part", tagging("Layer")).build().unwrap();
        let base = d
            .declare("Base")
            .specializes(&layer)
            .operation("part", tagging("Base"))
            .build()
            .unwrap();
        let mid = d
            .declare("Mid")
            .specializes(&base)
            .operation("part", tagging("Mid"))
            .build()
            .unwrap();
        let leaf = d.declare("Leaf").specializes(&mid).build().unwrap();

        assert_eq!(leaf.operation("part").unwrap().origin(), "Base");
    }

    #[test]
    fn test_root_without_fallback_leaves_it_unresolved() {
        let d = descriptor();
        let root = d.declare("Root").build().unwrap();
        let mid = d
            .declare("Mid")
            .specializes(&root)
            .operation("part", tagging("Mid"))
            .build()
            .unwrap();
        let leaf = d.declare("Leaf").specializes(&mid).build().unwrap();

        assert!(leaf.operation("part").is_none());
        let err = leaf.call("part", &mut Vec::new(), 0, &CallArgs::new()).unwrap_err();
        let missing = err.downcast_ref::<MissingOperationError>().unwrap();
        assert_eq!(missing, &MissingOperationError::new("Leaf", "part"));
    }

    #[test]
    fn test_multiple_parents_rejected() {
        let d = descriptor();
        let a = d.declare("A").build().unwrap();
        let b = d.declare("B").build().unwrap();

        let err = d
            .declare("C")
            .specializes(&a)
            .specializes(&b)
            .build()
            .unwrap_err();
        assert_eq!(err.code(), Some("DECL-004-MULTI_PARENT"));
    }

    #[test]
    fn test_foreign_parent_rejected() {
        let one = descriptor();
        let other = descriptor();
        let a = one.declare("A").build().unwrap();

        let err = other.declare("B").specializes(&a).build().unwrap_err();
        assert_eq!(err.code(), Some("DECL-005-FOREIGN_LINEAGE"));
    }

    #[test]
    fn test_duplicate_operation_rejected() {
        let err = descriptor()
            .declare("A")
            .operation("part", tagging("A"))
            .operation("part", tagging("A"))
            .build()
            .unwrap_err();
        assert_eq!(err.code(), Some("DECL-008-DUPLICATE"));
    }

    #[test]
    fn test_invalid_kind_name_rejected() {
        let err = descriptor().declare("not a name").build().unwrap_err();
        assert_eq!(err.code(), Some("DECL-006-INVALID_NAME"));
    }

    #[test]
    fn test_from_config() {
        let config = StageDescriptorConfig {
            fallback_operations: vec!["part".into()],
            depth_correction: 2,
        };
        let d: StageDescriptor<Trail, i64> = StageDescriptor::from_config(&config).unwrap();
        assert!(d.fallback_operations().contains("part"));
        assert_eq!(d.depth_correction(), 2);
    }
}
