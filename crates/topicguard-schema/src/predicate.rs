//! Leaf matchers for schema trees.
//!
//! Every predicate in a schema is a [`Matcher`]. Built-ins cover membership,
//! size bounds, map shape, and JSON value types; anything else can be wrapped
//! from a closure with [`Predicate::new`].

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

/// A value-to-boolean matcher used as a schema leaf.
pub trait Matcher: Send + Sync {
    /// Returns true when the value satisfies this matcher.
    fn matches(&self, value: &Value) -> bool;

    /// Short human-readable description, reported as `expected` in diagnostics.
    fn describe(&self) -> String {
        "predicate".to_string()
    }
}

/// Applies a matcher, treating a panic inside it as a failed match.
pub(crate) fn matches_caught(matcher: &dyn Matcher, value: &Value) -> bool {
    match catch_unwind(AssertUnwindSafe(|| matcher.matches(value))) {
        Ok(matched) => matched,
        Err(_) => {
            warn!(expected = %matcher.describe(), "predicate panicked; treating as no match");
            false
        }
    }
}

type CheckFn = dyn Fn(&Value) -> bool + Send + Sync;

/// A named matcher backed by a closure.
pub struct Predicate {
    name: String,
    check: Box<CheckFn>,
}

impl Predicate {
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Box::new(check),
        }
    }
}

impl Matcher for Predicate {
    fn matches(&self, value: &Value) -> bool {
        (self.check)(value)
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").field("name", &self.name).finish()
    }
}

/// JSON value types recognized by [`TypeOf`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Any,
    String,
    Integer,
    Number,
    Boolean,
    Map,
    List,
}

impl ValueType {
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Any => "any",
            ValueType::String => "string",
            ValueType::Integer => "int",
            ValueType::Number => "number",
            ValueType::Boolean => "bool",
            ValueType::Map => "map",
            ValueType::List => "list",
        }
    }

    /// Parses the type names accepted in schema documents.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "any" => Some(ValueType::Any),
            "string" => Some(ValueType::String),
            "int" | "integer" => Some(ValueType::Integer),
            "number" => Some(ValueType::Number),
            "bool" | "boolean" => Some(ValueType::Boolean),
            "map" => Some(ValueType::Map),
            "list" => Some(ValueType::List),
            _ => None,
        }
    }
}

/// Matches values of one JSON type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeOf(pub ValueType);

impl Matcher for TypeOf {
    fn matches(&self, value: &Value) -> bool {
        match self.0 {
            ValueType::Any => true,
            ValueType::String => value.is_string(),
            ValueType::Integer => value.is_i64() || value.is_u64(),
            ValueType::Number => value.is_number(),
            ValueType::Boolean => value.is_boolean(),
            ValueType::Map => value.is_object(),
            ValueType::List => value.is_array(),
        }
    }

    fn describe(&self) -> String {
        self.0.name().to_string()
    }
}

pub fn any() -> TypeOf {
    TypeOf(ValueType::Any)
}

pub fn string() -> TypeOf {
    TypeOf(ValueType::String)
}

pub fn int() -> TypeOf {
    TypeOf(ValueType::Integer)
}

pub fn number() -> TypeOf {
    TypeOf(ValueType::Number)
}

pub fn boolean() -> TypeOf {
    TypeOf(ValueType::Boolean)
}

/// Matches values equal to one of a fixed set.
#[derive(Debug, Clone, PartialEq)]
pub struct OneOf {
    values: Vec<Value>,
}

impl Matcher for OneOf {
    fn matches(&self, value: &Value) -> bool {
        self.values.iter().any(|candidate| candidate == value)
    }

    fn describe(&self) -> String {
        let values: Vec<String> = self.values.iter().map(Value::to_string).collect();
        format!("one of [{}]", values.join(", "))
    }
}

pub fn one_of<I, V>(values: I) -> OneOf
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    OneOf {
        values: values.into_iter().map(Into::into).collect(),
    }
}

fn count(value: &Value) -> Option<usize> {
    match value {
        Value::Array(items) => Some(items.len()),
        Value::Object(map) => Some(map.len()),
        Value::String(text) => Some(text.chars().count()),
        _ => None,
    }
}

/// Matches collections with at least `n` elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinCount(pub usize);

impl Matcher for MinCount {
    fn matches(&self, value: &Value) -> bool {
        count(value).is_some_and(|len| len >= self.0)
    }

    fn describe(&self) -> String {
        format!("at least {} elements", self.0)
    }
}

/// Matches collections with at most `n` elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaxCount(pub usize);

impl Matcher for MaxCount {
    fn matches(&self, value: &Value) -> bool {
        count(value).is_some_and(|len| len <= self.0)
    }

    fn describe(&self) -> String {
        format!("at most {} elements", self.0)
    }
}

pub fn min_count(n: usize) -> MinCount {
    MinCount(n)
}

pub fn max_count(n: usize) -> MaxCount {
    MaxCount(n)
}

/// Matches maps whose every key and value satisfy the given matchers.
///
/// Keys are offered to the key matcher as JSON strings.
#[derive(Clone)]
pub struct MapOf {
    key: Arc<dyn Matcher>,
    value: Arc<dyn Matcher>,
}

impl MapOf {
    pub fn new(key: Arc<dyn Matcher>, value: Arc<dyn Matcher>) -> Self {
        Self { key, value }
    }
}

impl Matcher for MapOf {
    fn matches(&self, value: &Value) -> bool {
        let Value::Object(map) = value else {
            return false;
        };
        map.iter().all(|(key, item)| {
            matches_caught(self.key.as_ref(), &Value::String(key.clone()))
                && matches_caught(self.value.as_ref(), item)
        })
    }

    fn describe(&self) -> String {
        format!(
            "map of {} to {}",
            self.key.describe(),
            self.value.describe()
        )
    }
}

impl fmt::Debug for MapOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

pub fn map_of(key: impl Matcher + 'static, value: impl Matcher + 'static) -> MapOf {
    MapOf::new(Arc::new(key), Arc::new(value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn one_of_checks_membership() {
        let status = one_of(["new", "paid", "shipped"]);
        assert!(status.matches(&json!("paid")));
        assert!(!status.matches(&json!("lost")));
        assert!(!status.matches(&json!(1)));
        assert_eq!(status.describe(), r#"one of ["new", "paid", "shipped"]"#);
    }

    #[test]
    fn one_of_mixed_values() {
        let matcher = one_of([json!(1), json!("one"), json!(true)]);
        assert!(matcher.matches(&json!(1)));
        assert!(matcher.matches(&json!(true)));
        assert!(!matcher.matches(&json!(2)));
    }

    #[test]
    fn count_bounds_on_collections() {
        assert!(min_count(2).matches(&json!([1, 2])));
        assert!(!min_count(3).matches(&json!([1, 2])));
        assert!(max_count(2).matches(&json!({"a": 1, "b": 2})));
        assert!(!max_count(1).matches(&json!({"a": 1, "b": 2})));
        assert!(min_count(3).matches(&json!("abc")));
    }

    #[test]
    fn count_bounds_fail_closed_on_scalars() {
        assert!(!min_count(0).matches(&json!(42)));
        assert!(!max_count(10).matches(&json!(true)));
        assert!(!max_count(10).matches(&Value::Null));
    }

    #[test]
    fn map_of_checks_every_entry() {
        let matcher = map_of(string(), int());
        assert!(matcher.matches(&json!({"a": 1, "b": 2})));
        assert!(matcher.matches(&json!({})));
        assert!(!matcher.matches(&json!({"a": 1, "b": "two"})));
    }

    #[test]
    fn map_of_key_predicate_sees_string_keys() {
        let matcher = map_of(one_of(["eu", "us"]), any());
        assert!(matcher.matches(&json!({"eu": 1})));
        assert!(!matcher.matches(&json!({"apac": 1})));
    }

    #[test]
    fn map_of_fails_closed_on_non_maps() {
        let matcher = map_of(string(), int());
        assert!(!matcher.matches(&json!([1, 2])));
        assert!(!matcher.matches(&json!("map")));
    }

    #[test]
    fn type_matchers() {
        assert!(int().matches(&json!(7)));
        assert!(int().matches(&json!(-7)));
        assert!(!int().matches(&json!(7.5)));
        assert!(number().matches(&json!(7.5)));
        assert!(string().matches(&json!("x")));
        assert!(boolean().matches(&json!(false)));
        assert!(any().matches(&json!(null)));
        assert!(TypeOf(ValueType::List).matches(&json!([])));
        assert!(!TypeOf(ValueType::Map).matches(&json!([])));
    }

    #[test]
    fn value_type_parse_accepts_aliases() {
        assert_eq!(ValueType::parse("integer"), Some(ValueType::Integer));
        assert_eq!(ValueType::parse("boolean"), Some(ValueType::Boolean));
        assert_eq!(ValueType::parse("uuid"), None);
    }

    #[test]
    fn closure_predicate_uses_its_name() {
        let positive = Predicate::new("positive", |v: &Value| v.as_i64().is_some_and(|n| n > 0));
        assert!(positive.matches(&json!(3)));
        assert!(!positive.matches(&json!(-3)));
        assert_eq!(positive.describe(), "positive");
    }

    #[test]
    fn panicking_predicate_is_a_failed_match() {
        let exploding = Predicate::new("exploding", |_: &Value| panic!("boom"));
        assert!(!matches_caught(&exploding, &json!(1)));
    }
}
