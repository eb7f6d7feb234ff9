//! Transmit/drop decisions for producers and consumers.
//!
//! The registry reports; the gate decides. A message whose topic schema
//! rejects it becomes [`SchemaError::Rejected`] carrying every field error.
//! What happens to a topic with no schema is an explicit policy choice.

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::error::{Result, SchemaError};
use crate::registry::SchemaRegistry;
use crate::topic::resolve_topic;
use crate::validator::explain;

/// What to do with messages on a topic that has no schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingSchemaPolicy {
    /// Let the message through.
    #[default]
    Lenient,
    /// Reject the message with [`SchemaError::NoSchemaForTopic`].
    Strict,
}

/// Topic-based admission check shared by a transport's producer and consumer.
#[derive(Clone)]
pub struct TopicGate {
    registry: Arc<SchemaRegistry>,
    policy: MissingSchemaPolicy,
}

impl TopicGate {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self::with_policy(registry, MissingSchemaPolicy::default())
    }

    pub fn with_policy(registry: Arc<SchemaRegistry>, policy: MissingSchemaPolicy) -> Self {
        Self { registry, policy }
    }

    /// Ok when `value` may be sent on (or delivered from) `topic`.
    pub fn check(&self, topic: &str, value: &Value) -> Result<()> {
        let snapshot = self.registry.snapshot();
        let default_variant = &self.registry.config().default_variant;
        let Some(definition) = resolve_topic(&snapshot, topic, default_variant) else {
            return match self.policy {
                MissingSchemaPolicy::Lenient => Ok(()),
                MissingSchemaPolicy::Strict => {
                    warn!(topic, "dropping message: no schema for topic");
                    Err(SchemaError::NoSchemaForTopic(topic.to_string()))
                }
            };
        };

        let result = explain(value, definition.spec(), snapshot.as_ref());
        if result.valid {
            return Ok(());
        }

        warn!(
            topic,
            errors = result.errors.len(),
            first = %result.errors[0],
            "dropping message: schema validation failed"
        );
        Err(SchemaError::Rejected {
            topic: topic.to_string(),
            errors: result.errors,
        })
    }

    /// Decode a JSON payload and check it.
    pub fn check_payload(&self, topic: &str, payload: &[u8]) -> Result<Value> {
        let value: Value = serde_json::from_slice(payload)?;
        self.check(topic, &value)?;
        Ok(value)
    }

    pub fn policy(&self) -> MissingSchemaPolicy {
        self.policy
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }
}
