//! Topic-name conventions for schema lookup.
//!
//! A topic `orders` is served by `orders/default` if registered, otherwise
//! by a schema registered as plain `orders`. Topic lookups never fail: when
//! nothing matches, the message is treated as valid and the caller decides
//! whether an unschematized topic is acceptable.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::registry::{SchemaRegistry, Snapshot};
use crate::spec::{SchemaDefinition, SchemaId};
use crate::validator::{explain, validate, ValidationResult};

impl SchemaRegistry {
    /// Schema serving `topic`: `"{topic}/default"` first, then `"{topic}"`.
    pub fn schema_for_topic(&self, topic: &str) -> Option<Arc<SchemaDefinition>> {
        resolve_topic(&self.snapshot(), topic, &self.config().default_variant)
    }

    /// Ids registered as `topic` itself or namespaced under `"{topic}/"`, sorted.
    pub fn schemas_for_topic(&self, topic: &str) -> Vec<SchemaId> {
        let prefix = format!("{topic}/");
        self.list()
            .into_iter()
            .filter(|id| id.as_str() == topic || id.as_str().starts_with(&prefix))
            .collect()
    }

    /// Validate against the topic's schema. A topic without a schema passes.
    pub fn validate_for_topic(&self, value: &Value, topic: &str) -> bool {
        let snapshot = self.snapshot();
        match resolve_topic(&snapshot, topic, &self.config().default_variant) {
            Some(definition) => validate(value, definition.spec(), snapshot.as_ref()),
            None => true,
        }
    }

    /// Explain against the topic's schema. A topic without a schema passes.
    pub fn explain_for_topic(&self, value: &Value, topic: &str) -> ValidationResult {
        let snapshot = self.snapshot();
        match resolve_topic(&snapshot, topic, &self.config().default_variant) {
            Some(definition) => explain(value, definition.spec(), snapshot.as_ref()),
            None => ValidationResult::ok(),
        }
    }
}

pub(crate) fn resolve_topic(
    snapshot: &Snapshot,
    topic: &str,
    default_variant: &str,
) -> Option<Arc<SchemaDefinition>> {
    let namespaced = format!("{topic}/{default_variant}");
    let found = snapshot
        .get(namespaced.as_str())
        .or_else(|| snapshot.get(topic))
        .cloned();
    match &found {
        Some(definition) => debug!(topic, schema = %definition.id(), "resolved topic schema"),
        None => debug!(topic, "no schema registered for topic"),
    }
    found
}
