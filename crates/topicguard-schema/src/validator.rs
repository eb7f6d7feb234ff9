//! Structural validation of decoded messages against a [`SpecNode`] tree.
//!
//! Only fields declared by the spec are visited; anything else in the message
//! is ignored. A field that is absent or `null` is reported as missing no
//! matter what the spec expects there.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::composition::Resolve;
use crate::predicate::matches_caught;
use crate::spec::SpecNode;

/// Why a composition node did not match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionFailure {
    /// A `ref` names a schema that is not registered.
    UnresolvedReference,
    /// No `any-of` alternative matched (or there were none).
    NoAlternativeMatched,
    /// An `all-of` conjunct failed or did not resolve.
    ConjunctFailed,
}

impl CompositionFailure {
    pub fn as_str(self) -> &'static str {
        match self {
            CompositionFailure::UnresolvedReference => "unresolved-reference",
            CompositionFailure::NoAlternativeMatched => "no-alternative-matched",
            CompositionFailure::ConjunctFailed => "conjunct-failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Missing,
    TypeMismatch,
    CompositionFailed(CompositionFailure),
}

impl ErrorKind {
    /// One of `missing`, `type-mismatch` or `composition-failed`.
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Missing => "missing",
            ErrorKind::TypeMismatch => "type-mismatch",
            ErrorKind::CompositionFailed(_) => "composition-failed",
        }
    }

    pub fn reason(self) -> Option<CompositionFailure> {
        match self {
            ErrorKind::CompositionFailed(reason) => Some(reason),
            ErrorKind::Missing | ErrorKind::TypeMismatch => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            Some(reason) => write!(f, "{} ({})", self.name(), reason.as_str()),
            None => f.write_str(self.name()),
        }
    }
}

/// Serializes as `{"kind": ..., "reason": ...}`, with `reason` only for
/// composition failures. [`FieldError`] flattens it into its own fields.
impl Serialize for ErrorKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let reason = self.reason();
        let mut map = serializer.serialize_map(Some(1 + usize::from(reason.is_some())))?;
        map.serialize_entry("kind", self.name())?;
        if let Some(reason) = reason {
            map.serialize_entry("reason", reason.as_str())?;
        }
        map.end()
    }
}

/// One failed field, addressed by a dotted/bracketed path such as `items[1].price`.
///
/// The root of the message has the empty path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub path: String,
    #[serde(flatten)]
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub expected: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() {
            "<root>"
        } else {
            self.path.as_str()
        };
        write!(f, "{path}: {} (expected {})", self.kind, self.expected)?;
        if let Some(value) = &self.value {
            write!(f, ", got {value}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<FieldError>,
}

impl ValidationResult {
    /// A passing result with no errors.
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn from_errors(errors: Vec<FieldError>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Returns true when `value` satisfies `spec`. Stops at the first failure.
pub fn validate<R: Resolve + ?Sized>(value: &Value, spec: &SpecNode, resolver: &R) -> bool {
    match resolver.pinned() {
        Some(snapshot) => walk(value, spec, snapshot.as_ref(), true).is_empty(),
        None => walk(value, spec, resolver, true).is_empty(),
    }
}

/// Checks `value` against `spec` and reports every failure, in spec order.
pub fn explain<R: Resolve + ?Sized>(
    value: &Value,
    spec: &SpecNode,
    resolver: &R,
) -> ValidationResult {
    let errors = match resolver.pinned() {
        Some(snapshot) => walk(value, spec, snapshot.as_ref(), false),
        None => walk(value, spec, resolver, false),
    };
    ValidationResult::from_errors(errors)
}

fn walk<R: Resolve + ?Sized>(
    value: &Value,
    spec: &SpecNode,
    resolver: &R,
    fail_fast: bool,
) -> Vec<FieldError> {
    let mut walker = Walker::new(resolver, fail_fast);
    walker.check(value, spec, "");
    walker.errors
}

pub(crate) struct Walker<'r, R: ?Sized> {
    pub(crate) resolver: &'r R,
    pub(crate) errors: Vec<FieldError>,
    fail_fast: bool,
}

impl<'r, R: Resolve + ?Sized> Walker<'r, R> {
    pub(crate) fn new(resolver: &'r R, fail_fast: bool) -> Self {
        Self {
            resolver,
            errors: Vec::new(),
            fail_fast,
        }
    }

    pub(crate) fn stopped(&self) -> bool {
        self.fail_fast && !self.errors.is_empty()
    }

    pub(crate) fn push(
        &mut self,
        path: &str,
        kind: ErrorKind,
        value: Option<&Value>,
        expected: String,
    ) {
        self.errors.push(FieldError {
            path: path.to_string(),
            kind,
            value: value.cloned(),
            expected,
        });
    }

    pub(crate) fn check(&mut self, value: &Value, spec: &SpecNode, path: &str) {
        match spec {
            SpecNode::Predicate(matcher) => {
                if !matches_caught(matcher.as_ref(), value) {
                    self.push(path, ErrorKind::TypeMismatch, Some(value), matcher.describe());
                }
            }
            SpecNode::Map(fields) => {
                let Value::Object(object) = value else {
                    self.push(path, ErrorKind::TypeMismatch, Some(value), spec.describe());
                    return;
                };
                for (name, child) in fields {
                    if self.stopped() {
                        return;
                    }
                    let field_path = field_path(path, name);
                    match object.get(name) {
                        None | Some(Value::Null) => {
                            self.push(&field_path, ErrorKind::Missing, None, child.describe());
                        }
                        Some(field) => self.check(field, child, &field_path),
                    }
                }
            }
            SpecNode::Collection(element) => {
                let Value::Array(items) = value else {
                    self.push(path, ErrorKind::TypeMismatch, Some(value), spec.describe());
                    return;
                };
                for (idx, item) in items.iter().enumerate() {
                    if self.stopped() {
                        return;
                    }
                    self.check(item, element, &format!("{path}[{idx}]"));
                }
            }
            SpecNode::Composition { kind, targets } => {
                self.check_composition(*kind, targets, value, path);
            }
        }
    }
}

fn field_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::predicate::{int, one_of, string, Predicate};
    use crate::spec::{SchemaDefinition, SchemaId};

    type Snapshot = HashMap<SchemaId, Arc<SchemaDefinition>>;

    fn no_schemas() -> Snapshot {
        HashMap::new()
    }

    fn id_name() -> SpecNode {
        SpecNode::map([
            ("id", SpecNode::predicate(int())),
            ("name", SpecNode::predicate(string())),
        ])
    }

    fn order() -> SpecNode {
        SpecNode::map([
            ("id", SpecNode::predicate(int())),
            (
                "items",
                SpecNode::collection(SpecNode::map([
                    ("sku", SpecNode::predicate(string())),
                    ("price", SpecNode::predicate(int())),
                ])),
            ),
        ])
    }

    #[test]
    fn satisfying_message_is_valid() {
        let result = explain(&json!({"id": 123, "name": "A"}), &id_name(), &no_schemas());
        assert_eq!(result, ValidationResult::ok());
        assert!(validate(&json!({"id": 123, "name": "A"}), &id_name(), &no_schemas()));
    }

    #[test]
    fn reports_type_mismatch_then_missing_in_spec_order() {
        let result = explain(&json!({"id": "x"}), &id_name(), &no_schemas());
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.errors[0].path, "id");
        assert_eq!(result.errors[0].kind, ErrorKind::TypeMismatch);
        assert_eq!(result.errors[0].value, Some(json!("x")));
        assert_eq!(result.errors[0].expected, "int");
        assert_eq!(result.errors[1].path, "name");
        assert_eq!(result.errors[1].kind, ErrorKind::Missing);
        assert_eq!(result.errors[1].value, None);
    }

    #[test]
    fn null_counts_as_missing() {
        let result = explain(&json!({"id": null, "name": "A"}), &id_name(), &no_schemas());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::Missing);
        assert_eq!(result.errors[0].path, "id");
    }

    #[test]
    fn missing_nested_map_is_missing_not_mismatch() {
        let spec = SpecNode::map([(
            "user",
            SpecNode::map([("id", SpecNode::predicate(int()))]),
        )]);
        let result = explain(&json!({}), &spec, &no_schemas());
        assert_eq!(result.errors[0].path, "user");
        assert_eq!(result.errors[0].kind, ErrorKind::Missing);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let message = json!({"id": 1, "name": "A", "extra": {"deep": [1, 2]}});
        assert!(validate(&message, &id_name(), &no_schemas()));
    }

    #[test]
    fn nested_map_against_scalar_is_type_mismatch() {
        let spec = SpecNode::map([(
            "user",
            SpecNode::map([("id", SpecNode::predicate(int()))]),
        )]);
        let result = explain(&json!({"user": "not-a-map"}), &spec, &no_schemas());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, "user");
        assert_eq!(result.errors[0].kind, ErrorKind::TypeMismatch);
        assert_eq!(result.errors[0].expected, "map");
    }

    #[test]
    fn nested_field_paths_are_dotted() {
        let spec = SpecNode::map([(
            "user",
            SpecNode::map([(
                "address",
                SpecNode::map([("zip", SpecNode::predicate(string()))]),
            )]),
        )]);
        let result = explain(
            &json!({"user": {"address": {"zip": 12345}}}),
            &spec,
            &no_schemas(),
        );
        assert_eq!(result.errors[0].path, "user.address.zip");
    }

    #[test]
    fn collection_errors_are_index_qualified() {
        let message = json!({
            "id": 1,
            "items": [
                {"sku": "a", "price": 10},
                {"sku": "b", "price": "free"},
                {"price": 3}
            ]
        });
        let result = explain(&message, &order(), &no_schemas());
        let paths: Vec<&str> = result.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["items[1].price", "items[2].sku"]);
    }

    #[test]
    fn collection_against_non_list_is_type_mismatch() {
        let result = explain(&json!({"id": 1, "items": {"sku": "a"}}), &order(), &no_schemas());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, "items");
        assert_eq!(result.errors[0].kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn empty_collection_is_valid() {
        assert!(validate(&json!({"id": 1, "items": []}), &order(), &no_schemas()));
    }

    #[test]
    fn collection_of_scalars() {
        let spec = SpecNode::map([(
            "tags",
            SpecNode::collection(SpecNode::predicate(one_of(["a", "b"]))),
        )]);
        let result = explain(&json!({"tags": ["a", "c", "b", "d"]}), &spec, &no_schemas());
        let paths: Vec<&str> = result.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["tags[1]", "tags[3]"]);
    }

    #[test]
    fn root_must_be_a_map_for_map_spec() {
        let result = explain(&json!([1, 2]), &id_name(), &no_schemas());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, "");
        assert_eq!(result.errors[0].to_string(), "<root>: type-mismatch (expected map), got [1,2]");
    }

    #[test]
    fn panicking_predicate_fails_the_field() {
        let spec = SpecNode::map([(
            "n",
            SpecNode::predicate(Predicate::new("explodes", |_: &Value| panic!("boom"))),
        )]);
        let result = explain(&json!({"n": 1}), &spec, &no_schemas());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::TypeMismatch);
        assert_eq!(result.errors[0].expected, "explodes");
    }

    #[test]
    fn validate_agrees_with_explain() {
        let messages = [
            json!({"id": 1, "items": [{"sku": "a", "price": 1}]}),
            json!({"id": 1, "items": [{"sku": 1, "price": 1}]}),
            json!({"items": []}),
            json!("scalar"),
            json!({"id": 1, "items": [null]}),
        ];
        for message in &messages {
            assert_eq!(
                validate(message, &order(), &no_schemas()),
                explain(message, &order(), &no_schemas()).errors.is_empty(),
                "disagreement on {message}"
            );
        }
    }

    #[test]
    fn field_error_serializes_kind_as_string() {
        let err = FieldError {
            path: "id".to_string(),
            kind: ErrorKind::TypeMismatch,
            value: Some(json!("x")),
            expected: "int".to_string(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(
            json,
            json!({"path": "id", "kind": "type-mismatch", "value": "x", "expected": "int"})
        );
    }

    #[test]
    fn composition_failure_serializes_reason_separately() {
        let err = FieldError {
            path: "payment".to_string(),
            kind: ErrorKind::CompositionFailed(CompositionFailure::NoAlternativeMatched),
            value: Some(json!({"cash": true})),
            expected: "any-of(card, bank)".to_string(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "composition-failed");
        assert_eq!(json["reason"], "no-alternative-matched");
        assert_eq!(
            err.to_string(),
            "payment: composition-failed (no-alternative-matched) (expected any-of(card, bank)), \
             got {\"cash\":true}"
        );
    }
}
