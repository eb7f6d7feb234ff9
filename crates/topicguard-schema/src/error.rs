use crate::spec::SchemaId;
use crate::validator::FieldError;

/// Errors that can occur while registering schemas or checking messages.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// An explicit schema id is not registered.
    #[error("schema not found: {0}")]
    SchemaNotFound(SchemaId),

    /// No schema resolves for the topic and the gate is strict.
    #[error("no schema registered for topic {0}")]
    NoSchemaForTopic(String),

    /// The message failed validation against its topic schema.
    #[error("message rejected on topic {topic}: {}", summarize(.errors))]
    Rejected {
        topic: String,
        errors: Vec<FieldError>,
    },

    /// A schema document does not describe a well-formed spec.
    #[error("invalid spec: {0}")]
    InvalidSpec(String),

    /// A schema file could not be loaded.
    #[error("failed to load schema: {0}")]
    LoadFailed(String),

    /// The input is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SchemaError>;

fn summarize(errors: &[FieldError]) -> String {
    let mut message = String::new();
    for (idx, err) in errors.iter().take(4).enumerate() {
        if idx > 0 {
            message.push_str("; ");
        }
        message.push_str(&err.to_string());
    }
    if errors.len() > 4 {
        message.push_str(&format!("; and {} more", errors.len() - 4));
    }
    message
}
