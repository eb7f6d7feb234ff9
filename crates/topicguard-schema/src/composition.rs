//! `ref`, `any-of` and `all-of` across registered schemas.
//!
//! Inside a schema tree an unresolved id never aborts validation: a `ref`
//! reports `unresolved-reference`, an `any-of` alternative simply does not
//! match, and an `all-of` conjunct fails. Only [`SchemaRef::check`], the
//! direct entry point, surfaces [`SchemaError::SchemaNotFound`].

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::registry::Snapshot;
use crate::spec::{
    describe_composition, CompositionKind, SchemaDefinition, SchemaId, SpecNode, Target,
};
use crate::validator::{validate, CompositionFailure, ErrorKind, Walker};

/// Looks up registered schemas by id.
pub trait Resolve {
    fn resolve(&self, id: &SchemaId) -> Option<Arc<SchemaDefinition>>;

    /// A fixed set of schemas to resolve against for the whole of one check.
    ///
    /// Resolvers whose contents can change between lookups return `Some`.
    fn pinned(&self) -> Option<Arc<Snapshot>> {
        None
    }
}

impl Resolve for HashMap<SchemaId, Arc<SchemaDefinition>> {
    fn resolve(&self, id: &SchemaId) -> Option<Arc<SchemaDefinition>> {
        self.get(id).cloned()
    }
}

enum Resolved<'t> {
    Registered(Arc<SchemaDefinition>),
    Inline(&'t SpecNode),
}

impl Resolved<'_> {
    fn spec(&self) -> &SpecNode {
        match self {
            Resolved::Registered(definition) => definition.spec(),
            Resolved::Inline(node) => node,
        }
    }
}

fn resolve_target<'t, R: Resolve + ?Sized>(
    resolver: &R,
    target: &'t Target,
) -> Option<Resolved<'t>> {
    match target {
        Target::Id(id) => {
            let resolved = resolver.resolve(id).map(Resolved::Registered);
            if resolved.is_none() {
                debug!(schema = %id, "composition target is not registered");
            }
            resolved
        }
        Target::Inline(node) => Some(Resolved::Inline(node)),
    }
}

fn target_matches<R: Resolve + ?Sized>(resolver: &R, target: &Target, value: &Value) -> bool {
    resolve_target(resolver, target)
        .is_some_and(|resolved| validate(value, resolved.spec(), resolver))
}

/// True iff at least one target resolves and validates. No targets never match.
pub fn any_of<R: Resolve + ?Sized>(resolver: &R, targets: &[Target], value: &Value) -> bool {
    match resolver.pinned() {
        Some(snapshot) => any_target(snapshot.as_ref(), targets, value),
        None => any_target(resolver, targets, value),
    }
}

/// True iff every target resolves and validates. No targets always match.
pub fn all_of<R: Resolve + ?Sized>(resolver: &R, targets: &[Target], value: &Value) -> bool {
    match resolver.pinned() {
        Some(snapshot) => every_target(snapshot.as_ref(), targets, value),
        None => every_target(resolver, targets, value),
    }
}

fn any_target<R: Resolve + ?Sized>(resolver: &R, targets: &[Target], value: &Value) -> bool {
    targets
        .iter()
        .any(|target| target_matches(resolver, target, value))
}

fn every_target<R: Resolve + ?Sized>(resolver: &R, targets: &[Target], value: &Value) -> bool {
    targets
        .iter()
        .all(|target| target_matches(resolver, target, value))
}

/// A matcher bound to one registered schema id.
pub struct SchemaRef<'r, R: ?Sized> {
    id: SchemaId,
    resolver: &'r R,
}

impl<'r, R: Resolve + ?Sized> SchemaRef<'r, R> {
    pub fn new(id: impl Into<SchemaId>, resolver: &'r R) -> Self {
        Self {
            id: id.into(),
            resolver,
        }
    }

    pub fn id(&self) -> &SchemaId {
        &self.id
    }

    /// Validates `value` against the referenced schema.
    ///
    /// Fails with [`SchemaError::SchemaNotFound`] when the id is not registered.
    pub fn check(&self, value: &Value) -> Result<bool> {
        match self.resolver.pinned() {
            Some(snapshot) => check_ref(&self.id, snapshot.as_ref(), value),
            None => check_ref(&self.id, self.resolver, value),
        }
    }
}

fn check_ref<R: Resolve + ?Sized>(id: &SchemaId, resolver: &R, value: &Value) -> Result<bool> {
    let definition = resolver
        .resolve(id)
        .ok_or_else(|| SchemaError::SchemaNotFound(id.clone()))?;
    Ok(validate(value, definition.spec(), resolver))
}

impl<R: Resolve + ?Sized> Walker<'_, R> {
    pub(crate) fn check_composition(
        &mut self,
        kind: CompositionKind,
        targets: &[Target],
        value: &Value,
        path: &str,
    ) {
        match kind {
            CompositionKind::Ref => {
                for target in targets {
                    if self.stopped() {
                        return;
                    }
                    match resolve_target(self.resolver, target) {
                        Some(resolved) => self.check(value, resolved.spec(), path),
                        None => self.push(
                            path,
                            ErrorKind::CompositionFailed(CompositionFailure::UnresolvedReference),
                            Some(value),
                            describe_composition(kind, std::slice::from_ref(target)),
                        ),
                    }
                }
            }
            CompositionKind::AnyOf => {
                if !any_target(self.resolver, targets, value) {
                    self.push(
                        path,
                        ErrorKind::CompositionFailed(CompositionFailure::NoAlternativeMatched),
                        Some(value),
                        describe_composition(kind, targets),
                    );
                }
            }
            CompositionKind::AllOf => {
                for target in targets {
                    if self.stopped() {
                        return;
                    }
                    if !target_matches(self.resolver, target, value) {
                        self.push(
                            path,
                            ErrorKind::CompositionFailed(CompositionFailure::ConjunctFailed),
                            Some(value),
                            target.describe(),
                        );
                    }
                }
            }
        }
    }
}
