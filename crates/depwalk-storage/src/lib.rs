//! Depwalk Storage - Entity stores for the dependency engine
//!
//! This crate provides an in-memory relational store that implements
//! [`depwalk_core::EntityAdapter`], plus fixture loading so schemas and
//! records can be described in JSON or TOML files.

#![allow(clippy::result_large_err)]

pub mod error;
pub mod fixture;
pub mod memory;
pub mod record;
pub mod schema;

pub use error::{StorageError, StorageResult};
pub use fixture::Fixture;
pub use memory::{MemoryStore, StoreStats};
pub use record::Record;
pub use schema::{DependencyContract, RelationDef, RelationKind, ScopeFilter, TypeSchema};
