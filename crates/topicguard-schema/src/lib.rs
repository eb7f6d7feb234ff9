//! Declarative message schemas for publish/subscribe topics.
//!
//! Register structural schemas once, then check decoded messages against them
//! before they are transmitted or after they are received. Schemas are
//! allow-lists: only declared fields are checked, extra fields pass through.
//!
//! - [`predicate`]: leaf matchers (`one_of`, `min_count`, `map_of`, ...)
//! - [`spec`]: the schema tree ([`SpecNode`])
//! - [`registry`]: the shared [`SchemaRegistry`]
//! - [`validator`]: structural validation with path-qualified diagnostics
//! - [`composition`]: `ref` / `any-of` / `all-of` across registered schemas
//! - [`topic`]: topic-name conventions for schema lookup
//! - [`document`]: JSON schema documents for loading schemas from disk
//! - [`gate`]: transmit/drop decisions for transport collaborators

pub mod composition;
pub mod config;
pub mod document;
pub mod error;
pub mod gate;
pub mod predicate;
pub mod registry;
pub mod spec;
pub mod topic;
pub mod validator;

pub use composition::{all_of, any_of, Resolve, SchemaRef};
pub use config::RegistryConfig;
pub use document::{compile, SchemaDocument};
pub use error::{Result, SchemaError};
pub use gate::{MissingSchemaPolicy, TopicGate};
pub use predicate::{Matcher, Predicate};
pub use registry::{SchemaRegistry, Snapshot};
pub use spec::{CompositionKind, SchemaDefinition, SchemaId, SpecNode, Target};
pub use validator::{explain, validate, CompositionFailure, ErrorKind, FieldError, ValidationResult};
