//! Entity type schemas: relations, scopes and dependency contracts

use depwalk_core::{
    ActionTag, Cardinality, DependencyParticipant, Direction, EntityType, RelationDescriptor,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Equality conditions a record must satisfy to pass a scope
pub type ScopeFilter = BTreeMap<String, serde_json::Value>;

/// Kind of a declared relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// This type holds the foreign key (to-one)
    BelongsTo,
    /// The related type holds the foreign key (to-one)
    HasOne,
    /// The related type holds the foreign key (to-many)
    HasMany,
}

impl RelationKind {
    pub fn direction(&self) -> Direction {
        match self {
            Self::BelongsTo => Direction::LowerLevel,
            Self::HasOne | Self::HasMany => Direction::HigherLevel,
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        match self {
            Self::BelongsTo | Self::HasOne => Cardinality::ToOne,
            Self::HasMany => Cardinality::ToMany,
        }
    }
}

/// A relation declared on a type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDef {
    pub name: String,
    pub kind: RelationKind,
    pub related: EntityType,
    /// Foreign key column: on this type for `belongs_to`, on the related
    /// type otherwise
    pub foreign_key: String,
}

impl RelationDef {
    pub fn new(
        name: impl Into<String>,
        kind: RelationKind,
        related: impl Into<EntityType>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            related: related.into(),
            foreign_key: foreign_key.into(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Dependency contract of a participating type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyContract {
    /// Relations this type depends on
    #[serde(default)]
    pub lower_level: Vec<String>,

    /// Relations that depend on this type
    #[serde(default)]
    pub higher_level: Vec<String>,

    #[serde(default)]
    pub lower_level_actions: Vec<ActionTag>,

    #[serde(default)]
    pub higher_level_actions: Vec<ActionTag>,

    /// Node label, defaults to the bare type name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_name: Option<String>,

    /// Field shown in option lists for this type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_field: Option<String>,

    #[serde(default)]
    pub skip_options: bool,

    #[serde(default = "default_true")]
    pub recursive: bool,

    #[serde(default = "default_true")]
    pub eager_loading: bool,
}

impl Default for DependencyContract {
    fn default() -> Self {
        Self {
            lower_level: Vec::new(),
            higher_level: Vec::new(),
            lower_level_actions: Vec::new(),
            higher_level_actions: Vec::new(),
            dependency_name: None,
            option_field: None,
            skip_options: false,
            recursive: true,
            eager_loading: true,
        }
    }
}

impl DependencyContract {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lower_level(mut self, relations: &[&str]) -> Self {
        self.lower_level = relations.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn higher_level(mut self, relations: &[&str]) -> Self {
        self.higher_level = relations.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn lower_level_actions(mut self, actions: &[&str]) -> Self {
        self.lower_level_actions = actions.iter().map(|a| ActionTag::from(*a)).collect();
        self
    }

    pub fn higher_level_actions(mut self, actions: &[&str]) -> Self {
        self.higher_level_actions = actions.iter().map(|a| ActionTag::from(*a)).collect();
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.dependency_name = Some(name.into());
        self
    }

    pub fn options_by(mut self, field: impl Into<String>) -> Self {
        self.option_field = Some(field.into());
        self
    }

    pub fn without_options(mut self) -> Self {
        self.skip_options = true;
        self
    }

    pub fn without_recursion(mut self) -> Self {
        self.recursive = false;
        self
    }

    pub fn without_eager_loading(mut self) -> Self {
        self.eager_loading = false;
        self
    }
}

impl DependencyParticipant for DependencyContract {
    fn relations(&self, direction: Direction) -> &[String] {
        match direction {
            Direction::LowerLevel => &self.lower_level,
            Direction::HigherLevel => &self.higher_level,
        }
    }

    fn available_actions(&self, direction: Direction) -> &[ActionTag] {
        match direction {
            Direction::LowerLevel => &self.lower_level_actions,
            Direction::HigherLevel => &self.higher_level_actions,
        }
    }

    fn dependency_name(&self) -> Option<&str> {
        self.dependency_name.as_deref()
    }

    fn option_field(&self) -> Option<&str> {
        self.option_field.as_deref()
    }

    fn loads_options(&self) -> bool {
        !self.skip_options
    }

    fn recursive(&self) -> bool {
        self.recursive
    }

    fn eager_loading(&self) -> bool {
        self.eager_loading
    }
}

/// Schema of one entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSchema {
    pub name: EntityType,

    /// Table name used to qualify inverse foreign keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    /// Field holding the identifiable name, defaults to the id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_field: Option<String>,

    #[serde(default)]
    pub relations: Vec<RelationDef>,

    /// Named query constraints on this type
    #[serde(default)]
    pub scopes: BTreeMap<String, ScopeFilter>,

    /// Scope applied whenever this type is fetched as a higher-level
    /// dependency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub higher_dependencies_filter: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<DependencyContract>,
}

impl TypeSchema {
    pub fn new(name: impl Into<EntityType>) -> Self {
        Self {
            name: name.into(),
            table: None,
            name_field: None,
            relations: Vec::new(),
            scopes: BTreeMap::new(),
            higher_dependencies_filter: None,
            dependencies: None,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_name_field(mut self, field: impl Into<String>) -> Self {
        self.name_field = Some(field.into());
        self
    }

    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn belongs_to(
        self,
        name: &str,
        related: impl Into<EntityType>,
        foreign_key: &str,
    ) -> Self {
        self.with_relation(RelationDef::new(name, RelationKind::BelongsTo, related, foreign_key))
    }

    pub fn has_many(self, name: &str, related: impl Into<EntityType>, foreign_key: &str) -> Self {
        self.with_relation(RelationDef::new(name, RelationKind::HasMany, related, foreign_key))
    }

    pub fn has_one(self, name: &str, related: impl Into<EntityType>, foreign_key: &str) -> Self {
        self.with_relation(RelationDef::new(name, RelationKind::HasOne, related, foreign_key))
    }

    pub fn with_scope(mut self, name: impl Into<String>, filter: ScopeFilter) -> Self {
        self.scopes.insert(name.into(), filter);
        self
    }

    pub fn with_higher_dependencies_filter(mut self, scope: impl Into<String>) -> Self {
        self.higher_dependencies_filter = Some(scope.into());
        self
    }

    pub fn with_dependencies(mut self, contract: DependencyContract) -> Self {
        self.dependencies = Some(contract);
        self
    }

    /// Table name, defaulting to the lowercased bare type name
    pub fn table_name(&self) -> String {
        self.table
            .clone()
            .unwrap_or_else(|| self.name.short_name().to_lowercase())
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Descriptor for `relation` given the schema of its related type
    ///
    /// Inverse foreign keys are qualified with the related table. The
    /// relation is recursive when the related type has a contract that
    /// allows recursion.
    pub fn descriptor(
        &self,
        relation: &RelationDef,
        related: Option<&TypeSchema>,
    ) -> RelationDescriptor {
        let related_table = related
            .map(TypeSchema::table_name)
            .unwrap_or_else(|| relation.related.short_name().to_lowercase());
        let recursive = related
            .and_then(|schema| schema.dependencies.as_ref())
            .map(|contract| contract.recursive)
            .unwrap_or(false);

        let foreign_key = match relation.kind {
            RelationKind::BelongsTo => relation.foreign_key.clone(),
            RelationKind::HasOne | RelationKind::HasMany => {
                format!("{}.{}", related_table, relation.foreign_key)
            }
        };

        RelationDescriptor {
            name: relation.name.clone(),
            direction: relation.kind.direction(),
            foreign_key,
            related_type: relation.related.clone(),
            cardinality: relation.kind.cardinality(),
            recursive,
        }
    }
}
