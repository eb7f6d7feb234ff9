//! JSON schema documents.
//!
//! A document pairs an id with a spec written in a small JSON notation:
//!
//! ```json
//! {
//!   "id": "orders/default",
//!   "spec": {
//!     "id": "int",
//!     "status": { "$one-of": ["new", "paid"] },
//!     "customer": { "$ref": "customers" },
//!     "items": [{ "sku": "string", "qty": "int" }]
//!   }
//! }
//! ```
//!
//! Strings name value types, single-key objects whose key starts with `$`
//! are predicates or compositions, one-element arrays are collections, and
//! any other object is a nested map.
//!
//! Inside `$ref`, `$any-of` and `$all-of` a string is a schema id, never a
//! type name. Type names such as `"int"` are rejected there so that
//! `{"$any-of": ["int", "string"]}` fails to compile instead of silently
//! referring to unregistered schemas.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SchemaError};
use crate::predicate::{max_count, min_count, one_of, MapOf, Matcher, TypeOf, ValueType};
use crate::spec::{CompositionKind, SchemaId, SpecNode, Target};

/// A schema as stored on disk: `{"id": ..., "spec": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub id: SchemaId,
    pub spec: Value,
}

impl SchemaDocument {
    pub fn deserialize_value(value: &Value) -> Result<Self> {
        Ok(Self::deserialize(value)?)
    }

    pub fn compile(&self) -> Result<SpecNode> {
        compile(&self.spec)
    }
}

/// Compiles the JSON notation into a [`SpecNode`] tree.
pub fn compile(spec: &Value) -> Result<SpecNode> {
    compile_at(spec, "")
}

fn compile_at(spec: &Value, path: &str) -> Result<SpecNode> {
    match spec {
        Value::String(name) => ValueType::parse(name)
            .map(|kind| SpecNode::predicate(TypeOf(kind)))
            .ok_or_else(|| invalid(path, format!("unknown type {name:?}"))),
        Value::Array(items) => match items.as_slice() {
            [element] => Ok(SpecNode::collection(compile_at(
                element,
                &format!("{path}[]"),
            )?)),
            _ => Err(invalid(
                path,
                format!(
                    "a collection spec needs exactly one element, found {}",
                    items.len()
                ),
            )),
        },
        Value::Object(map) => match directive(map, path)? {
            Some((name, arg)) => compile_directive(name, arg, path),
            None => {
                let mut fields = Vec::with_capacity(map.len());
                for (name, child) in map {
                    fields.push((name.clone(), compile_at(child, &field_path(path, name))?));
                }
                Ok(SpecNode::map(fields))
            }
        },
        other => Err(invalid(path, format!("unsupported spec value {other}"))),
    }
}

fn directive<'a>(map: &'a Map<String, Value>, path: &str) -> Result<Option<(&'a str, &'a Value)>> {
    let directives = map.keys().filter(|key| key.starts_with('$')).count();
    if directives == 0 {
        return Ok(None);
    }
    if map.len() > 1 {
        return Err(invalid(path, "a `$` directive must be the only key of its object"));
    }
    Ok(map.iter().next().map(|(name, arg)| (name.as_str(), arg)))
}

fn compile_directive(name: &str, arg: &Value, path: &str) -> Result<SpecNode> {
    match name {
        "$one-of" => {
            let values = arg
                .as_array()
                .ok_or_else(|| invalid(path, "$one-of takes an array of values"))?;
            Ok(SpecNode::predicate(one_of(values.iter().cloned())))
        }
        "$min-count" => Ok(SpecNode::predicate(min_count(count_arg(name, arg, path)?))),
        "$max-count" => Ok(SpecNode::predicate(max_count(count_arg(name, arg, path)?))),
        "$map-of" => match arg.as_array().map(Vec::as_slice) {
            Some([key, value]) => Ok(SpecNode::predicate(MapOf::new(
                compile_matcher(key, path)?,
                compile_matcher(value, path)?,
            ))),
            _ => Err(invalid(path, "$map-of takes [key-spec, value-spec]")),
        },
        "$ref" => {
            let id = arg
                .as_str()
                .ok_or_else(|| invalid(path, "$ref takes a schema id"))?;
            Ok(SpecNode::reference(schema_id(name, id, path)?))
        }
        "$any-of" => compile_composition(CompositionKind::AnyOf, name, arg, path),
        "$all-of" => compile_composition(CompositionKind::AllOf, name, arg, path),
        other => Err(invalid(path, format!("unknown directive {other}"))),
    }
}

fn compile_composition(
    kind: CompositionKind,
    name: &str,
    arg: &Value,
    path: &str,
) -> Result<SpecNode> {
    let items = arg
        .as_array()
        .ok_or_else(|| invalid(path, format!("{name} takes an array of targets")))?;
    let mut targets = Vec::with_capacity(items.len());
    for item in items {
        let target = match item {
            Value::String(id) => Target::Id(schema_id(name, id, path)?),
            inline => Target::Inline(compile_at(inline, path)?),
        };
        targets.push(target);
    }
    Ok(SpecNode::Composition { kind, targets })
}

fn schema_id(name: &str, id: &str, path: &str) -> Result<SchemaId> {
    if ValueType::parse(id).is_some() {
        return Err(invalid(
            path,
            format!("{name} target {id:?} is a type name, not a schema id"),
        ));
    }
    Ok(SchemaId::from(id))
}

fn count_arg(name: &str, arg: &Value, path: &str) -> Result<usize> {
    arg.as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| invalid(path, format!("{name} takes a non-negative integer")))
}

fn compile_matcher(spec: &Value, path: &str) -> Result<Arc<dyn Matcher>> {
    match compile_at(spec, path)? {
        SpecNode::Predicate(matcher) => Ok(matcher),
        other => Err(invalid(
            path,
            format!("$map-of needs predicate specs, found {}", other.describe()),
        )),
    }
}

fn field_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn invalid(path: &str, reason: impl Into<String>) -> SchemaError {
    let reason = reason.into();
    if path.is_empty() {
        SchemaError::InvalidSpec(reason)
    } else {
        SchemaError::InvalidSpec(format!("{path}: {reason}"))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::registry::SchemaRegistry;
    use crate::validator::{explain, validate, ErrorKind};

    fn compiled(spec: Value) -> SpecNode {
        compile(&spec).expect("spec should compile")
    }

    fn invalid_reason(spec: Value) -> String {
        match compile(&spec) {
            Err(SchemaError::InvalidSpec(reason)) => reason,
            other => panic!("expected InvalidSpec, got {other:?}"),
        }
    }

    #[test]
    fn compiles_the_documented_example() {
        let registry = SchemaRegistry::new();
        registry.register("customers", compiled(json!({"id": "int"})));
        let spec = compiled(json!({
            "id": "int",
            "status": { "$one-of": ["new", "paid"] },
            "customer": { "$ref": "customers" },
            "items": [{ "sku": "string", "qty": "int" }]
        }));

        let good = json!({
            "id": 1,
            "status": "paid",
            "customer": {"id": 9},
            "items": [{"sku": "a", "qty": 2}]
        });
        assert!(validate(&good, &spec, &registry));

        let bad = json!({
            "id": 1,
            "status": "lost",
            "customer": {"id": "nine"},
            "items": [{"sku": "a", "qty": 2}, {"sku": "b", "qty": "many"}]
        });
        let paths: Vec<String> = explain(&bad, &spec, &registry)
            .errors
            .into_iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(paths, vec!["status", "customer.id", "items[1].qty"]);
    }

    #[test]
    fn field_order_follows_the_document() {
        let spec = compiled(json!({"zeta": "int", "alpha": "int"}));
        let result = explain(&json!({}), &spec, &SchemaRegistry::new());
        let paths: Vec<&str> = result.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["zeta", "alpha"]);
    }

    #[test]
    fn count_and_map_of_directives() {
        let spec = compiled(json!({
            "tags": {"$min-count": 1},
            "labels": {"$map-of": ["string", "int"]},
            "notes": {"$max-count": 2}
        }));
        let registry = SchemaRegistry::new();
        assert!(validate(
            &json!({"tags": ["a"], "labels": {"x": 1}, "notes": "ab"}),
            &spec,
            &registry
        ));
        let result = explain(
            &json!({"tags": [], "labels": {"x": "1"}, "notes": [1, 2, 3]}),
            &spec,
            &registry,
        );
        assert_eq!(result.errors.len(), 3);
        assert!(result.errors.iter().all(|e| e.kind == ErrorKind::TypeMismatch));
    }

    #[test]
    fn composition_targets_mix_ids_and_inline_specs() {
        let registry = SchemaRegistry::new();
        registry.register("card", compiled(json!({"card_number": "string"})));
        let spec = compiled(json!({
            "payment": {"$any-of": ["card", {"iban": "string"}]}
        }));
        assert!(validate(&json!({"payment": {"iban": "DE00"}}), &spec, &registry));
        assert!(validate(&json!({"payment": {"card_number": "4111"}}), &spec, &registry));
        assert!(!validate(&json!({"payment": {"cash": 1}}), &spec, &registry));
    }

    #[test]
    fn collection_arity_is_checked() {
        assert!(invalid_reason(json!({"items": []})).starts_with("items:"));
        assert!(invalid_reason(json!({"items": ["int", "string"]})).contains("found 2"));
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(invalid_reason(json!({"id": "uuid"})).contains("unknown type"));
        assert!(invalid_reason(json!({"id": {"$regex": "x"}})).contains("unknown directive"));
        assert!(invalid_reason(json!({"id": 5})).contains("unsupported spec value"));
    }

    #[test]
    fn type_names_are_not_composition_targets() {
        let reason = invalid_reason(json!({"value": {"$any-of": ["int", "string"]}}));
        assert_eq!(reason, r#"value: $any-of target "int" is a type name, not a schema id"#);
        let reason = invalid_reason(json!({"value": {"$all-of": ["card", "map"]}}));
        assert!(reason.contains("\"map\""));
        assert!(invalid_reason(json!({"value": {"$ref": "bool"}})).contains("$ref"));
        assert!(compile(&json!({"value": {"$any-of": ["card", {"$one-of": [1, 2]}]}})).is_ok());
    }

    #[test]
    fn directive_must_stand_alone() {
        let reason = invalid_reason(json!({"id": {"$ref": "a", "extra": "int"}}));
        assert!(reason.contains("only key"));
    }

    #[test]
    fn map_of_requires_predicates() {
        let reason = invalid_reason(json!({"labels": {"$map-of": ["string", {"x": "int"}]}}));
        assert!(reason.contains("predicate specs"));
    }

    #[test]
    fn document_round_trips_through_value() {
        let value = json!({"id": "orders", "spec": {"id": "int"}});
        let document = SchemaDocument::deserialize_value(&value).unwrap();
        assert_eq!(document.id.as_str(), "orders");
        assert!(document.compile().is_ok());
        assert!(matches!(
            SchemaDocument::deserialize_value(&json!({"spec": {}})),
            Err(SchemaError::InvalidJson(_))
        ));
    }
}
