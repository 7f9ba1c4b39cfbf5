//! Hand-built adapter for unit tests

use crate::actions::ActionTag;
use crate::adapter::{DependencyParticipant, EntityAdapter};
use crate::entity::{EntityRef, EntityType};
use crate::error::{Error, Result};
use crate::options::DependencyOption;
use crate::paths::PrefetchPath;
use crate::relation::{Cardinality, Direction, Materialized, RelationDescriptor};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub(crate) struct FakeType {
    pub lower: Vec<String>,
    pub higher: Vec<String>,
    pub lower_actions: Vec<ActionTag>,
    pub higher_actions: Vec<ActionTag>,
    pub name: Option<String>,
    pub option_field: Option<String>,
    pub recursive: bool,
}

impl Default for FakeType {
    fn default() -> Self {
        Self {
            lower: Vec::new(),
            higher: Vec::new(),
            lower_actions: Vec::new(),
            higher_actions: Vec::new(),
            name: None,
            option_field: None,
            recursive: true,
        }
    }
}

impl FakeType {
    pub fn lower(mut self, relations: &[&str]) -> Self {
        self.lower = relations.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn higher(mut self, relations: &[&str]) -> Self {
        self.higher = relations.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn actions(mut self, direction: Direction, actions: &[&str]) -> Self {
        let tags = actions.iter().map(|a| ActionTag::from(*a)).collect();
        match direction {
            Direction::LowerLevel => self.lower_actions = tags,
            Direction::HigherLevel => self.higher_actions = tags,
        }
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_option_field(mut self, field: &str) -> Self {
        self.option_field = Some(field.to_string());
        self
    }

    pub fn not_recursive(mut self) -> Self {
        self.recursive = false;
        self
    }
}

impl DependencyParticipant for FakeType {
    fn relations(&self, direction: Direction) -> &[String] {
        match direction {
            Direction::LowerLevel => &self.lower,
            Direction::HigherLevel => &self.higher,
        }
    }

    fn available_actions(&self, direction: Direction) -> &[ActionTag] {
        match direction {
            Direction::LowerLevel => &self.lower_actions,
            Direction::HigherLevel => &self.higher_actions,
        }
    }

    fn dependency_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn option_field(&self) -> Option<&str> {
        self.option_field.as_deref()
    }

    fn recursive(&self) -> bool {
        self.recursive
    }
}

#[derive(Default)]
pub(crate) struct FakeAdapter {
    types: HashMap<EntityType, FakeType>,
    descriptors: HashMap<(EntityType, String), RelationDescriptor>,
    links: HashMap<(EntityRef, String), Vec<EntityRef>>,
    options: HashMap<EntityType, Vec<DependencyOption>>,
    pub fetches: Cell<usize>,
    pub option_queries: Cell<usize>,
    pub prefetched: RefCell<Vec<PrefetchPath>>,
    /// `(relation, scope)` of every materialize call
    pub materialized: RefCell<Vec<(String, Option<String>)>>,
}

impl FakeAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, entity_type: &str, contract: FakeType) -> Self {
        self.types.insert(EntityType::new(entity_type), contract);
        self
    }

    pub fn with_relation(
        mut self,
        owner: &str,
        name: &str,
        direction: Direction,
        related: &str,
        foreign_key: &str,
    ) -> Self {
        let cardinality = match direction {
            Direction::LowerLevel => Cardinality::ToOne,
            Direction::HigherLevel => Cardinality::ToMany,
        };
        self.descriptors.insert(
            (EntityType::new(owner), name.to_string()),
            RelationDescriptor {
                name: name.to_string(),
                direction,
                foreign_key: foreign_key.to_string(),
                related_type: EntityType::new(related),
                cardinality,
                recursive: false,
            },
        );
        self
    }

    pub fn with_link(mut self, from: EntityRef, relation: &str, to: EntityRef) -> Self {
        self.links
            .entry((from, relation.to_string()))
            .or_default()
            .push(to);
        self
    }

    pub fn with_options(mut self, entity_type: &str, options: Vec<DependencyOption>) -> Self {
        self.options.insert(EntityType::new(entity_type), options);
        self
    }
}

impl EntityAdapter for FakeAdapter {
    fn participant(&self, entity_type: &EntityType) -> Option<&dyn DependencyParticipant> {
        self.types
            .get(entity_type)
            .map(|t| t as &dyn DependencyParticipant)
    }

    fn relation_descriptor(
        &self,
        entity_type: &EntityType,
        relation: &str,
    ) -> Result<RelationDescriptor> {
        let mut descriptor = self
            .descriptors
            .get(&(entity_type.clone(), relation.to_string()))
            .cloned()
            .ok_or_else(|| Error::unknown_relation(entity_type.as_str(), relation))?;
        descriptor.recursive = self.allows_recursion(&descriptor.related_type);
        Ok(descriptor)
    }

    fn materialize(
        &self,
        entity: &EntityRef,
        relation: &str,
        scope: Option<&str>,
    ) -> Result<Materialized> {
        self.fetches.set(self.fetches.get() + 1);
        self.materialized
            .borrow_mut()
            .push((relation.to_string(), scope.map(str::to_string)));
        let descriptor = self.relation_descriptor(&entity.entity_type, relation)?;
        let linked = self
            .links
            .get(&(entity.clone(), relation.to_string()))
            .cloned()
            .unwrap_or_default();

        Ok(match descriptor.cardinality {
            Cardinality::ToOne => linked
                .into_iter()
                .next()
                .map(Materialized::One)
                .unwrap_or(Materialized::Absent),
            Cardinality::ToMany => Materialized::Many(linked),
        })
    }

    fn option_query(
        &self,
        entity_type: &EntityType,
        _field: &str,
    ) -> Result<Vec<DependencyOption>> {
        self.option_queries.set(self.option_queries.get() + 1);
        Ok(self.options.get(entity_type).cloned().unwrap_or_default())
    }

    fn display_name(&self, entity: &EntityRef) -> Result<String> {
        Ok(format!("{} {}", entity.entity_type.short_name(), entity.id))
    }

    fn prefetch(&self, _entity: &EntityRef, paths: &[PrefetchPath]) -> Result<()> {
        self.prefetched.borrow_mut().extend(paths.iter().cloned());
        Ok(())
    }
}
