//! Depwalk Core - Dependency tree traversal engine
//!
//! This crate walks the declared relations of an entity in both directions
//! and produces an annotated tree of the entities it depends on
//! (lower-level) and the entities that depend on it (higher-level).
//!
//! Storage is not part of this crate. Everything it knows about entities
//! comes through the [`EntityAdapter`] trait.

pub mod actions;
pub mod adapter;
pub mod builder;
pub mod entity;
pub mod error;
pub mod limits;
pub mod options;
pub mod paths;
pub mod relation;
pub mod tree;

#[cfg(test)]
mod testing;

pub use actions::{filter_actions, ActionTag};
pub use adapter::{DependencyParticipant, EntityAdapter};
pub use builder::{DependencyBuilder, TraversalOptions};
pub use entity::{EntityId, EntityRef, EntityType};
pub use error::{Error, Result};
pub use options::{resolve_options, DependencyOption};
pub use paths::{relation_paths, PrefetchPath};
pub use relation::{Cardinality, Direction, Materialized, RelationDescriptor};
pub use tree::{max_depth, DependencyNode, DependencyTree};
