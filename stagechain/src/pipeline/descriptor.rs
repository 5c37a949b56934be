//! Pipeline descriptors: templates for declaring pipeline kinds.

use super::kind::{BodyFn, PipelineKind, ResolvedBody};
use crate::config::PipelineDescriptorConfig;
use crate::core::{validate_name, CallArgs, KindId, OperationSet, SequencePolicy};
use crate::errors::{BoxError, DeclarationError};
use crate::stages::lineage::{corrected, extend_chain, single_parent};
use crate::stages::{OperationFn, StageDescriptor, StageKind};
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;
use tracing::debug;

/// Template for declaring pipeline kinds.
///
/// The descriptor fixes the body operation names and the sequence policy.
/// Under [`SequencePolicy::AncestorChain`] it also carries the stage
/// descriptor that gives each pipeline kind its own stage record; the two
/// share one family id.
pub struct PipelineDescriptor<S, V> {
    id: KindId,
    policy: SequencePolicy,
    body_operations: OperationSet,
    stages: Option<StageDescriptor<S, V>>,
}

impl<S, V> PipelineDescriptor<S, V> {
    /// Creates a descriptor whose kinds run their own specialization chain.
    ///
    /// # Errors
    ///
    /// Returns an error if either set is empty, a name is invalid, or the
    /// two sets overlap.
    pub fn ancestor_chain(
        body_operations: impl IntoIterator<Item = impl Into<String>>,
        fallback_operations: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, DeclarationError> {
        let body_operations = OperationSet::body(body_operations)?;
        let fallback_operations = OperationSet::fallback(fallback_operations)?;
        body_operations.ensure_disjoint(&fallback_operations)?;

        let id = KindId::new();
        Ok(Self {
            id,
            policy: SequencePolicy::AncestorChain,
            body_operations,
            stages: Some(StageDescriptor::from_parts(id, fallback_operations, 0)),
        })
    }

    /// Creates a descriptor whose instances are given their stages explicitly.
    ///
    /// # Errors
    ///
    /// Returns an error if the set is empty or a name is invalid.
    pub fn explicit_list(
        body_operations: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, DeclarationError> {
        Ok(Self {
            id: KindId::new(),
            policy: SequencePolicy::ExplicitList,
            body_operations: OperationSet::body(body_operations)?,
            stages: None,
        })
    }

    /// Creates a descriptor from its configuration.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid sets, or for an explicit-list
    /// configuration that names fallback operations or a depth correction.
    pub fn from_config(config: &PipelineDescriptorConfig) -> Result<Self, DeclarationError> {
        match config.policy {
            SequencePolicy::AncestorChain => Ok(Self::ancestor_chain(
                config.body_operations.iter().cloned(),
                config.fallback_operations.iter().cloned(),
            )?
            .with_depth_correction(config.depth_correction)),
            SequencePolicy::ExplicitList => {
                if !config.fallback_operations.is_empty() {
                    return Err(DeclarationError::descriptor_policy_violation(
                        "explicit-list descriptors take fallback operations from a stage descriptor",
                    ));
                }
                if config.depth_correction != 0 {
                    return Err(DeclarationError::descriptor_policy_violation(
                        "explicit-list descriptors have no specialization chain to correct",
                    ));
                }
                Self::explicit_list(config.body_operations.iter().cloned())
            }
        }
    }

    /// Excludes this many most-general ancestors from stage sequences and
    /// fallback roots. Has no effect under the explicit-list policy.
    #[must_use]
    pub fn with_depth_correction(mut self, depth_correction: usize) -> Self {
        self.stages = self
            .stages
            .take()
            .map(|stages| stages.with_depth_correction(depth_correction));
        self
    }

    /// Returns the family id shared by every kind this descriptor declares.
    #[must_use]
    pub const fn id(&self) -> KindId {
        self.id
    }

    /// Returns the sequence policy.
    #[must_use]
    pub const fn policy(&self) -> SequencePolicy {
        self.policy
    }

    /// Returns the body operation names.
    #[must_use]
    pub const fn body_operations(&self) -> &OperationSet {
        &self.body_operations
    }

    /// Returns the fallback operation names (ancestor-chain policy only).
    #[must_use]
    pub fn fallback_operations(&self) -> Option<&OperationSet> {
        self.stages.as_ref().map(StageDescriptor::fallback_operations)
    }

    /// Returns the depth correction.
    #[must_use]
    pub fn depth_correction(&self) -> usize {
        self.stages
            .as_ref()
            .map_or(0, StageDescriptor::depth_correction)
    }

    /// Starts declaring a pipeline kind.
    pub fn declare(&self, name: impl Into<String>) -> PipelineKindBuilder<'_, S, V> {
        PipelineKindBuilder {
            descriptor: self,
            name: name.into(),
            parents: Vec::new(),
            bodies: Vec::new(),
            operations: Vec::new(),
        }
    }
}

impl<S, V> Debug for PipelineDescriptor<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineDescriptor")
            .field("id", &self.id)
            .field("policy", &self.policy)
            .field("body_operations", &self.body_operations)
            .field("stages", &self.stages)
            .finish()
    }
}

/// Builder for a single pipeline kind.
#[must_use]
pub struct PipelineKindBuilder<'d, S, V> {
    descriptor: &'d PipelineDescriptor<S, V>,
    name: String,
    parents: Vec<Arc<PipelineKind<S, V>>>,
    bodies: Vec<(String, BodyFn<S, V>)>,
    operations: Vec<(String, OperationFn<S, V>)>,
}

impl<S, V> PipelineKindBuilder<'_, S, V> {
    /// Declares `parent` as the kind being specialized.
    pub fn specializes(mut self, parent: &Arc<PipelineKind<S, V>>) -> Self {
        self.parents.push(Arc::clone(parent));
        self
    }

    /// Implements a body operation.
    ///
    /// The body is called once per stage and usually delegates to
    /// [`StageKind::call`].
    pub fn body<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&StageKind<S, V>, &mut S, V, &CallArgs) -> Result<V, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.bodies.push((name.into(), Arc::new(func)));
        self
    }

    /// Defines a stage operation on the kind's own stage record.
    ///
    /// Only valid under the ancestor-chain policy.
    pub fn operation<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut S, V, &CallArgs) -> Result<V, BoxError> + Send + Sync + 'static,
    {
        self.operations.push((name.into(), Arc::new(func)));
        self
    }

    /// Declares the kind.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid names, more than one parent, a parent from
    /// another descriptor, bodies for undeclared operations, duplicate or
    /// colliding definitions, or stage operations under the explicit-list
    /// policy.
    pub fn build(self) -> Result<Arc<PipelineKind<S, V>>, DeclarationError> {
        let Self {
            descriptor,
            name,
            parents,
            bodies,
            operations,
        } = self;

        validate_name(&name)?;
        let parent = single_parent(&name, parents, |p| p.name.clone())?;
        if let Some(ref parent) = parent {
            if parent.family != descriptor.id {
                return Err(DeclarationError::foreign_lineage(&name, &parent.name));
            }
        }

        let id = KindId::new();
        let mut own_bodies: HashMap<String, ResolvedBody<S, V>> = HashMap::new();
        for (op_name, func) in bodies {
            if !descriptor.body_operations.contains(&op_name) {
                return Err(DeclarationError::undeclared_body(&name, &op_name));
            }
            if own_bodies.contains_key(&op_name) {
                return Err(DeclarationError::duplicate_operation(&name, &op_name));
            }
            own_bodies.insert(op_name, ResolvedBody::new(&name, id, func));
        }

        if let Some(op_name) = operations
            .iter()
            .map(|(op_name, _)| op_name)
            .find(|op_name| descriptor.body_operations.contains(op_name))
        {
            return Err(DeclarationError::duplicate_operation(&name, op_name));
        }

        let (stage, sequence) = match descriptor.stages {
            Some(ref stages) => {
                let mut builder = stages.declare(name.clone()).with_id(id);
                if let Some(parent_stage) = parent.as_ref().and_then(|p| p.stage.as_ref()) {
                    builder = builder.specializes(parent_stage);
                }
                for (op_name, func) in operations {
                    builder = builder.operation_fn(op_name, func);
                }
                let stage = builder.build()?;
                let mut sequence =
                    corrected(stage.ancestors(), stages.depth_correction()).to_vec();
                sequence.push(Arc::clone(&stage));
                (Some(stage), sequence)
            }
            None => {
                if !operations.is_empty() {
                    return Err(DeclarationError::policy_violation(
                        &name,
                        "explicit-list pipeline kinds cannot define stage operations",
                    ));
                }
                (None, Vec::new())
            }
        };

        let mut resolved: HashMap<String, ResolvedBody<S, V>> = parent
            .as_ref()
            .map(|p| p.bodies.clone())
            .unwrap_or_default();
        resolved.extend(own_bodies);

        let ancestors = parent
            .as_ref()
            .map_or_else(Vec::new, |p| extend_chain(&p.ancestors, p));

        debug!(
            pipeline = %name,
            parent = parent.as_ref().map(|p| p.name.as_str()),
            policy = %descriptor.policy,
            bodies = resolved.len(),
            stages = sequence.len(),
            "Declared pipeline kind"
        );

        Ok(Arc::new(PipelineKind {
            id,
            name,
            family: descriptor.id,
            policy: descriptor.policy,
            parent,
            ancestors,
            body_operations: descriptor.body_operations.clone(),
            bodies: resolved,
            stage,
            sequence,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::Resolution;

    type Descriptor = PipelineDescriptor<Vec<String>, i64>;

    fn step(
        tag: &'static str,
    ) -> impl Fn(&mut Vec<String>, i64, &CallArgs) -> Result<i64, BoxError> + Send + Sync {
        move |log, value, _| {
            log.push(tag.to_string());
            Ok(value + 1)
        }
    }

    fn chain(
        stage: &StageKind<Vec<String>, i64>,
        log: &mut Vec<String>,
        value: i64,
        args: &CallArgs,
    ) -> Result<i64, BoxError> {
        stage.call("part", log, value, args)
    }

    fn descriptor() -> Descriptor {
        PipelineDescriptor::ancestor_chain(["run"], ["part"]).unwrap()
    }

    #[test]
    fn test_empty_sets_rejected() {
        let empty: [&str; 0] = [];
        let err = Descriptor::ancestor_chain(empty, ["part"]).unwrap_err();
        assert_eq!(err.code(), Some("DECL-001-EMPTY_BODY"));

        let err = Descriptor::ancestor_chain(["run"], empty).unwrap_err();
        assert_eq!(err.code(), Some("DECL-002-EMPTY_FALLBACK"));

        let err = Descriptor::explicit_list(empty).unwrap_err();
        assert_eq!(err.code(), Some("DECL-001-EMPTY_BODY"));
    }

    #[test]
    fn test_overlapping_sets_rejected() {
        let err = Descriptor::ancestor_chain(["run", "part"], ["part"]).unwrap_err();
        assert_eq!(err.code(), Some("DECL-003-OVERLAP"));
    }

    #[test]
    fn test_sequence_is_ancestor_chain_plus_self() {
        let d = descriptor();
        let base = d.declare("Base").body("run", chain).build().unwrap();
        let simple = d.declare("Simple").specializes(&base).build().unwrap();
        let leaf = d.declare("Leaf").specializes(&simple).build().unwrap();

        let names: Vec<&str> = leaf.sequence().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["Base", "Simple", "Leaf"]);
        assert_eq!(leaf.stage().unwrap().id(), leaf.id());
        assert_eq!(leaf.ancestors().len(), 2);
    }

    #[test]
    fn test_depth_correction_trims_sequence() {
        let d = descriptor().with_depth_correction(1);
        assert_eq!(d.depth_correction(), 1);

        let layer = d.declare("Layer").body("run", chain).build().unwrap();
        let base = d
            .declare("Base")
            .specializes(&layer)
            .operation("part", step("Base"))
            .build()
            .unwrap();
        let leaf = d.declare("Leaf").specializes(&base).build().unwrap();

        let names: Vec<&str> = leaf.sequence().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["Base", "Leaf"]);
        assert_eq!(layer.sequence().len(), 1);

        let part = leaf.stage().unwrap().operation("part").unwrap();
        assert_eq!(part.origin(), "Base");
        assert_eq!(part.resolution(), Resolution::Fallback);
    }

    #[test]
    fn test_body_resolves_to_nearest_definer() {
        let d = descriptor();
        let base = d.declare("Base").body("run", chain).build().unwrap();
        let simple = d.declare("Simple").specializes(&base).build().unwrap();
        let custom = d
            .declare("Custom")
            .specializes(&simple)
            .body("run", |_, _, value, _| Ok(value * 10))
            .build()
            .unwrap();

        assert_eq!(simple.body("run").unwrap().origin(), "Base");
        assert_eq!(custom.body("run").unwrap().origin(), "Custom");
        assert_eq!(custom.body("run").unwrap().origin_id(), custom.id());
    }

    #[test]
    fn test_resolve_body_errors() {
        let d = descriptor();
        let bare = d.declare("Bare").build().unwrap();

        assert!(matches!(
            bare.resolve_body("run"),
            Err(crate::errors::StagechainError::MissingBody { .. })
        ));
        assert!(matches!(
            bare.resolve_body("nope"),
            Err(crate::errors::StagechainError::UnknownOperation { .. })
        ));
    }

    #[test]
    fn test_undeclared_body_rejected() {
        let err = descriptor()
            .declare("Base")
            .body("walk", chain)
            .build()
            .unwrap_err();
        assert_eq!(err.code(), Some("DECL-007-UNDECLARED_BODY"));
    }

    #[test]
    fn test_duplicate_and_colliding_definitions_rejected() {
        let d = descriptor();
        let err = d
            .declare("Base")
            .body("run", chain)
            .body("run", chain)
            .build()
            .unwrap_err();
        assert_eq!(err.code(), Some("DECL-008-DUPLICATE"));

        let err = d
            .declare("Base")
            .operation("run", step("Base"))
            .build()
            .unwrap_err();
        assert_eq!(err.code(), Some("DECL-008-DUPLICATE"));
    }

    #[test]
    fn test_lineage_checks() {
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

        let other = descriptor();
        let err = other.declare("D").specializes(&a).build().unwrap_err();
        assert_eq!(err.code(), Some("DECL-005-FOREIGN_LINEAGE"));

        let err = d.declare("not a name").build().unwrap_err();
        assert_eq!(err.code(), Some("DECL-006-INVALID_NAME"));
    }

    #[test]
    fn test_explicit_list_kinds() {
        let d = Descriptor::explicit_list(["run"]).unwrap();
        assert_eq!(d.policy(), SequencePolicy::ExplicitList);
        assert!(d.fallback_operations().is_none());

        let kind = d.declare("Runner").body("run", chain).build().unwrap();
        assert!(kind.stage().is_none());
        assert!(kind.sequence().is_empty());

        let err = d
            .declare("Runner")
            .operation("part", step("Runner"))
            .build()
            .unwrap_err();
        assert_eq!(err.code(), Some("DECL-009-POLICY"));
    }

    #[test]
    fn test_from_config() {
        let config = PipelineDescriptorConfig::ancestor_chain(["run"], ["part"])
            .with_depth_correction(2);
        let d = Descriptor::from_config(&config).unwrap();
        assert_eq!(d.policy(), SequencePolicy::AncestorChain);
        assert_eq!(d.depth_correction(), 2);
        assert!(d.fallback_operations().unwrap().contains("part"));

        let mut config = PipelineDescriptorConfig::explicit_list(["run"]);
        assert!(Descriptor::from_config(&config).is_ok());

        config.fallback_operations = vec!["part".to_string()];
        let err = Descriptor::from_config(&config).unwrap_err();
        assert_eq!(err.code(), Some("DECL-009-POLICY"));

        let config = PipelineDescriptorConfig::explicit_list(["run"]).with_depth_correction(1);
        let err = Descriptor::from_config(&config).unwrap_err();
        assert_eq!(err.code(), Some("DECL-009-POLICY"));
    }
}
