//! Storage error types

use thiserror::Error;

/// Result type alias for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Storage-specific error types
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Unknown entity type: {0}")]
    UnknownType(String),

    #[error("Unknown relation: {entity_type}.{relation}")]
    UnknownRelation {
        entity_type: String,
        relation: String,
    },

    #[error("Unknown scope '{scope}' on {entity_type}")]
    UnknownScope { entity_type: String, scope: String },

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Duplicate record: {0}")]
    DuplicateRecord(String),

    #[error("Invalid fixture: {0}")]
    InvalidFixture(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for depwalk_core::Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnknownType(name) => Self::UnknownEntityType(name),
            StorageError::UnknownRelation {
                entity_type,
                relation,
            } => Self::UnknownRelation {
                entity_type,
                relation,
            },
            StorageError::RecordNotFound(key) => Self::EntityNotFound(key),
            other => Self::adapter(other),
        }
    }
}
