//! Boundary traits between the traversal engine and the entity store
//!
//! The engine drives two traits:
//!
//! - [`EntityAdapter`] is implemented once per storage layer. It resolves
//!   handles, materializes relations and runs option queries.
//! - [`DependencyParticipant`] is the capability a type opts into to take
//!   part in dependency traversal. A type without it can still show up as a
//!   node, but it is never recursed into and contributes no actions.

use crate::actions::ActionTag;
use crate::entity::{EntityRef, EntityType};
use crate::error::Result;
use crate::options::DependencyOption;
use crate::paths::PrefetchPath;
use crate::relation::{Direction, Materialized, RelationDescriptor};

/// Dependency contract of one entity type
pub trait DependencyParticipant {
    /// Relation names walked in the given direction, in declaration order
    fn relations(&self, direction: Direction) -> &[String];

    /// Actions this type permits on dependents discovered in `direction`
    fn available_actions(&self, direction: Direction) -> &[ActionTag];

    /// Label used for nodes of this type
    fn dependency_name(&self) -> Option<&str> {
        None
    }

    /// Field used to build `{id, name}` option lists for this type
    fn option_field(&self) -> Option<&str> {
        None
    }

    fn loads_options(&self) -> bool {
        true
    }

    /// Whether traversal may recurse through this type
    fn recursive(&self) -> bool {
        true
    }

    /// Whether an initial traversal rooted at this type prefetches its paths
    fn eager_loading(&self) -> bool {
        true
    }
}

/// Storage-side collaborator consumed by the traversal engine
///
/// All calls are synchronous. Implementations are free to block.
pub trait EntityAdapter {
    /// Dependency contract of a type, if it participates
    fn participant(&self, entity_type: &EntityType) -> Option<&dyn DependencyParticipant>;

    /// Descriptor of a relation declared on `entity_type`
    fn relation_descriptor(
        &self,
        entity_type: &EntityType,
        relation: &str,
    ) -> Result<RelationDescriptor>;

    /// Materialize a relation of `entity`
    ///
    /// `scope` names an extra query constraint to apply to the relation.
    fn materialize(
        &self,
        entity: &EntityRef,
        relation: &str,
        scope: Option<&str>,
    ) -> Result<Materialized>;

    /// All instances of `entity_type` as `{id, name}` pairs ordered
    /// ascending by `field`
    fn option_query(&self, entity_type: &EntityType, field: &str)
        -> Result<Vec<DependencyOption>>;

    /// Human-readable name of an entity
    fn display_name(&self, entity: &EntityRef) -> Result<String> {
        Ok(entity.id.to_string())
    }

    /// Batch-materialize relations along dotted paths
    ///
    /// Purely a performance hint: no later `materialize` may return anything
    /// different because of it. A path's scope only says which constraint
    /// the walk will materialize that relation with.
    fn prefetch(&self, _entity: &EntityRef, _paths: &[PrefetchPath]) -> Result<()> {
        Ok(())
    }

    /// Scope constraining higher-level fetches of `entity_type`
    fn additional_filter_scope(&self, _entity_type: &EntityType) -> Option<String> {
        None
    }

    fn declared_relations(&self, entity_type: &EntityType, direction: Direction) -> Vec<String> {
        self.participant(entity_type)
            .map(|p| p.relations(direction).to_vec())
            .unwrap_or_default()
    }

    fn declared_actions(&self, entity_type: &EntityType, direction: Direction) -> Vec<ActionTag> {
        self.participant(entity_type)
            .map(|p| p.available_actions(direction).to_vec())
            .unwrap_or_default()
    }

    /// Option field of a type, unless it opted out of option loading
    fn display_field(&self, entity_type: &EntityType) -> Option<String> {
        let participant = self.participant(entity_type)?;
        if !participant.loads_options() {
            return None;
        }
        participant.option_field().map(str::to_string)
    }

    fn is_participant(&self, entity_type: &EntityType) -> bool {
        self.participant(entity_type).is_some()
    }

    /// Participating type that lets traversal recurse through it
    fn allows_recursion(&self, entity_type: &EntityType) -> bool {
        self.participant(entity_type)
            .map(|p| p.recursive())
            .unwrap_or(false)
    }
}
