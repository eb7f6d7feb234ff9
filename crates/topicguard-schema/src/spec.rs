//! The schema tree.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::predicate::Matcher;

/// Registry key for a schema: a plain name (`"orders"`) or a namespaced one
/// (`"orders/default"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaId(String);

impl SchemaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before the first `/`, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.0.split_once('/').map(|(ns, _)| ns)
    }

    /// The part after the first `/`, or the whole id when not namespaced.
    pub fn name(&self) -> &str {
        self.0.split_once('/').map_or(self.0.as_str(), |(_, name)| name)
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SchemaId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SchemaId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SchemaId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&SchemaId> for SchemaId {
    fn from(id: &SchemaId) -> Self {
        id.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionKind {
    Ref,
    AnyOf,
    AllOf,
}

impl CompositionKind {
    pub fn name(self) -> &'static str {
        match self {
            CompositionKind::Ref => "ref",
            CompositionKind::AnyOf => "any-of",
            CompositionKind::AllOf => "all-of",
        }
    }
}

/// One operand of a composition: a registered schema or an anonymous spec.
#[derive(Debug, Clone)]
pub enum Target {
    Id(SchemaId),
    Inline(SpecNode),
}

impl Target {
    pub fn describe(&self) -> String {
        match self {
            Target::Id(id) => id.to_string(),
            Target::Inline(node) => node.describe(),
        }
    }
}

impl From<SchemaId> for Target {
    fn from(id: SchemaId) -> Self {
        Target::Id(id)
    }
}

impl From<&str> for Target {
    fn from(id: &str) -> Self {
        Target::Id(id.into())
    }
}

impl From<String> for Target {
    fn from(id: String) -> Self {
        Target::Id(id.into())
    }
}

impl From<SpecNode> for Target {
    fn from(node: SpecNode) -> Self {
        Target::Inline(node)
    }
}

/// One node of a schema's structural description.
#[derive(Clone)]
pub enum SpecNode {
    /// Leaf matcher applied to the field value.
    Predicate(Arc<dyn Matcher>),
    /// Declared fields, in declaration order.
    Map(Vec<(String, SpecNode)>),
    /// Spec every item of a list must satisfy.
    Collection(Box<SpecNode>),
    /// Reference to, or combination of, other schemas.
    Composition {
        kind: CompositionKind,
        targets: Vec<Target>,
    },
}

impl SpecNode {
    pub fn predicate(matcher: impl Matcher + 'static) -> Self {
        SpecNode::Predicate(Arc::new(matcher))
    }

    /// Builds a nested map; a repeated field name replaces the earlier entry in place.
    pub fn map<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, SpecNode)>,
        K: Into<String>,
    {
        let mut entries: Vec<(String, SpecNode)> = Vec::new();
        for (name, node) in fields {
            let name = name.into();
            match entries.iter_mut().find(|(existing, _)| *existing == name) {
                Some(slot) => slot.1 = node,
                None => entries.push((name, node)),
            }
        }
        SpecNode::Map(entries)
    }

    pub fn collection(element: SpecNode) -> Self {
        SpecNode::Collection(Box::new(element))
    }

    pub fn reference(id: impl Into<SchemaId>) -> Self {
        SpecNode::Composition {
            kind: CompositionKind::Ref,
            targets: vec![Target::Id(id.into())],
        }
    }

    pub fn any_of<I, T>(targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Target>,
    {
        SpecNode::Composition {
            kind: CompositionKind::AnyOf,
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }

    pub fn all_of<I, T>(targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Target>,
    {
        SpecNode::Composition {
            kind: CompositionKind::AllOf,
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }

    /// Short description used as `expected` in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            SpecNode::Predicate(matcher) => matcher.describe(),
            SpecNode::Map(_) => "map".to_string(),
            SpecNode::Collection(element) => format!("list of {}", element.describe()),
            SpecNode::Composition { kind, targets } => describe_composition(*kind, targets),
        }
    }

    /// Every schema id this tree refers to, in first-seen order, without duplicates.
    pub fn referenced_ids(&self) -> Vec<SchemaId> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, ids: &mut Vec<SchemaId>) {
        match self {
            SpecNode::Predicate(_) => {}
            SpecNode::Map(fields) => {
                for (_, node) in fields {
                    node.collect_ids(ids);
                }
            }
            SpecNode::Collection(element) => element.collect_ids(ids),
            SpecNode::Composition { targets, .. } => {
                for target in targets {
                    match target {
                        Target::Id(id) if !ids.contains(id) => ids.push(id.clone()),
                        Target::Id(_) => {}
                        Target::Inline(node) => node.collect_ids(ids),
                    }
                }
            }
        }
    }
}

pub(crate) fn describe_composition(kind: CompositionKind, targets: &[Target]) -> String {
    let targets: Vec<String> = targets.iter().map(Target::describe).collect();
    format!("{}({})", kind.name(), targets.join(", "))
}

impl fmt::Debug for SpecNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecNode::Predicate(matcher) => write!(f, "Predicate({})", matcher.describe()),
            SpecNode::Map(fields) => {
                let mut map = f.debug_map();
                for (name, node) in fields {
                    map.entry(name, node);
                }
                map.finish()
            }
            SpecNode::Collection(element) => f.debug_list().entry(element).finish(),
            SpecNode::Composition { kind, targets } => f
                .debug_struct("Composition")
                .field("kind", kind)
                .field("targets", targets)
                .finish(),
        }
    }
}

/// A registered schema. Immutable once stored; re-registration replaces it.
#[derive(Debug, Clone)]
pub struct SchemaDefinition {
    id: SchemaId,
    spec: SpecNode,
}

impl SchemaDefinition {
    pub fn new(id: SchemaId, spec: SpecNode) -> Self {
        Self { id, spec }
    }

    pub fn id(&self) -> &SchemaId {
        &self.id
    }

    pub fn spec(&self) -> &SpecNode {
        &self.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{int, string};

    #[test]
    fn schema_id_namespace_and_name() {
        let namespaced = SchemaId::from("orders/default");
        assert_eq!(namespaced.namespace(), Some("orders"));
        assert_eq!(namespaced.name(), "default");

        let plain = SchemaId::from("orders");
        assert_eq!(plain.namespace(), None);
        assert_eq!(plain.name(), "orders");
    }

    #[test]
    fn map_keeps_declaration_order_and_replaces_duplicates() {
        let node = SpecNode::map([
            ("id", SpecNode::predicate(int())),
            ("name", SpecNode::predicate(int())),
            ("name", SpecNode::predicate(string())),
        ]);
        let SpecNode::Map(fields) = node else {
            panic!("expected map node");
        };
        let names: Vec<&str> = fields.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["id", "name"]);
        assert_eq!(fields[1].1.describe(), "string");
    }

    #[test]
    fn describe_composition_lists_targets() {
        let node = SpecNode::any_of([
            Target::from("a"),
            Target::from(SpecNode::predicate(int())),
        ]);
        assert_eq!(node.describe(), "any-of(a, int)");
        assert_eq!(SpecNode::reference("b").describe(), "ref(b)");
        assert_eq!(
            SpecNode::collection(SpecNode::predicate(string())).describe(),
            "list of string"
        );
    }

    #[test]
    fn referenced_ids_walks_the_tree() {
        let node = SpecNode::map([
            ("customer", SpecNode::reference("customers")),
            (
                "items",
                SpecNode::collection(SpecNode::map([(
                    "product",
                    SpecNode::any_of([
                        Target::from("products/book"),
                        Target::from(SpecNode::reference("customers")),
                    ]),
                )])),
            ),
            ("id", SpecNode::predicate(int())),
        ]);
        let ids: Vec<String> = node
            .referenced_ids()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(ids, vec!["customers", "products/book"]);
    }

    #[test]
    fn schema_id_serializes_as_string() {
        let id = SchemaId::from("orders/default");
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            r#""orders/default""#
        );
    }
}
