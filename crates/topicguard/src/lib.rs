//! Schema contracts for publish/subscribe messages.
//!
//! topicguard checks decoded messages against schemas registered per topic
//! before a producer transmits them or a consumer hands them to application
//! code.
//!
//! # Crate Structure
//!
//! - [`schema`]: registry, validator, composition and topic gate
//!
//! The `topicguard` binary (behind the `cli` feature) validates JSON messages
//! against a directory of `*.spec.json` schema documents.

/// Re-export schema types.
pub mod schema {
    pub use topicguard_schema::*;
}
