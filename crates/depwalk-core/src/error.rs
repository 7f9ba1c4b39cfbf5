//! Error types for Depwalk Core

use thiserror::Error;

/// Result type alias using Depwalk's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Depwalk error types
///
/// Missing contracts (no actions, no display field, no recursive support)
/// are never errors. Everything here originates at the adapter boundary.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown entity type: {0}")]
    UnknownEntityType(String),

    #[error("Unknown relation: {entity_type}.{relation}")]
    UnknownRelation {
        entity_type: String,
        relation: String,
    },

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Adapter error: {0}")]
    Adapter(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an adapter-specific error
    pub fn adapter(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Adapter(Box::new(err))
    }

    pub fn unknown_relation(entity_type: impl Into<String>, relation: impl Into<String>) -> Self {
        Self::UnknownRelation {
            entity_type: entity_type.into(),
            relation: relation.into(),
        }
    }
}
