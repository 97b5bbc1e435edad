//! crates/learning_assistant_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core depends on.
//! These traits form the boundary of the hexagonal architecture: the record store
//! and the text generator are implemented by adapters in the service crate.

use async_trait::async_trait;
use serde_json::{Map, Value};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Store IO failure on '{name}': {reason}")]
    Io { name: String, reason: String },
    #[error("Store document '{name}' is corrupt: {reason}")]
    CorruptStore { name: String, reason: String },
    #[error("Text generation failed: {0}")]
    Generation(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// One persisted JSON document: a mapping from string identity to a record.
pub type Document = Map<String, Value>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Loads the named document. A missing document is an empty mapping.
    async fn load(&self, name: &str) -> PortResult<Document>;

    /// Overwrites the named document.
    async fn save(&self, name: &str, document: &Document) -> PortResult<()>;

    /// Copies every existing document aside and returns how many were copied.
    async fn backup(&self) -> PortResult<usize>;
}

#[async_trait]
pub trait TextGenerationService: Send + Sync {
    /// Produces a reply for `prompt` under the given persona instructions.
    async fn generate(&self, prompt: &str, persona_instructions: &str) -> PortResult<String>;
}
