//! Dependency tree builder
//!
//! Walks the declared relations of a root entity in one direction and
//! assembles a [`DependencyNode`] tree. Lower-level and higher-level walks
//! share one algorithm, parameterized by a [`Policy`] that captures what
//! differs between them:
//!
//! | | lower-level | higher-level |
//! |-|-------------|--------------|
//! | cardinality | to-one | to-many |
//! | foreign key | owning side, as declared | inverse side, unqualified name |
//! | fetch scope | caller's override for the path from the root | related type's additional filter |
//! | options | dependent's own | discoverer's, initial call only |
//! | empty relation | still counts 1 towards depth | contributes nothing |
//!
//! Results of initial calls are memoized per `(root, direction)` for the
//! lifetime of the builder.

use crate::actions::filter_actions;
use crate::adapter::EntityAdapter;
use crate::entity::{EntityRef, EntityType};
use crate::error::Result;
use crate::limits::MAX_DEPENDENCY_DEPTH;
use crate::options::{resolve_options, DependencyOption};
use crate::paths::{relation_paths, PrefetchPath};
use crate::relation::{Cardinality, Direction, RelationDescriptor};
use crate::tree::{max_depth, DependencyNode, DependencyTree};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Traversal configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalOptions {
    /// Recurse into participating dependents
    #[serde(default = "default_true")]
    pub recursive: bool,

    /// Prefetch flattened relation paths before an initial walk
    #[serde(default = "default_true")]
    pub eager_loading: bool,

    /// Narrow dependent actions to the discoverer's universe
    #[serde(default = "default_true")]
    pub filter_actions: bool,

    /// Lower-level relation paths, relative to the root, to materialize
    /// through a named scope
    #[serde(default)]
    pub scope_overrides: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            eager_loading: true,
            filter_actions: true,
            scope_overrides: BTreeMap::new(),
        }
    }
}

impl TraversalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only report direct dependencies
    pub fn without_recursion(mut self) -> Self {
        self.recursive = false;
        self
    }

    /// Skip the prefetch step
    pub fn without_eager_loading(mut self) -> Self {
        self.eager_loading = false;
        self
    }

    /// Report dependents' declared actions unfiltered
    pub fn without_action_filter(mut self) -> Self {
        self.filter_actions = false;
        self
    }

    /// Materialize the lower-level relation path `path` through the named
    /// `scope`
    pub fn with_scope_override(mut self, path: impl Into<String>, scope: impl Into<String>) -> Self {
        self.scope_overrides.insert(path.into(), scope.into());
        self
    }

    pub fn with_scope_overrides(mut self, overrides: BTreeMap<String, String>) -> Self {
        self.scope_overrides = overrides;
        self
    }
}

/// Which call of the recursion is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Caller-facing call
    Initial,
    /// Recursive call on a discovered dependent
    Nested,
}

/// Where the scope constraining a fetch comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchScope {
    /// Caller's override for the relation path from the root
    PathOverride,
    /// Related type's additional filter
    RelatedFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OptionsSource {
    Dependent,
    Discoverer,
}

/// Per-direction behavior of the walk
struct Policy {
    direction: Direction,
    cardinality: Cardinality,
    foreign_key: fn(&RelationDescriptor) -> &str,
    scope: FetchScope,
    options: OptionsSource,
    empty_relation_depth: usize,
}

const LOWER_LEVEL: Policy = Policy {
    direction: Direction::LowerLevel,
    cardinality: Cardinality::ToOne,
    foreign_key: RelationDescriptor::foreign_key,
    scope: FetchScope::PathOverride,
    options: OptionsSource::Dependent,
    empty_relation_depth: 1,
};

const HIGHER_LEVEL: Policy = Policy {
    direction: Direction::HigherLevel,
    cardinality: Cardinality::ToMany,
    foreign_key: RelationDescriptor::foreign_key_name,
    scope: FetchScope::RelatedFilter,
    options: OptionsSource::Discoverer,
    empty_relation_depth: 0,
};

impl Policy {
    fn for_direction(direction: Direction) -> &'static Policy {
        match direction {
            Direction::LowerLevel => &LOWER_LEVEL,
            Direction::HigherLevel => &HIGHER_LEVEL,
        }
    }

    fn fetch<A: EntityAdapter + ?Sized>(
        &self,
        adapter: &A,
        entity: &EntityRef,
        descriptor: &RelationDescriptor,
        path: &str,
        overrides: &BTreeMap<String, String>,
    ) -> Result<Vec<EntityRef>> {
        let scope = match self.scope {
            FetchScope::PathOverride => overrides.get(path).cloned(),
            FetchScope::RelatedFilter => adapter.additional_filter_scope(&descriptor.related_type),
        };

        let materialized = adapter.materialize(entity, &descriptor.name, scope.as_deref())?;
        Ok(match self.cardinality {
            Cardinality::ToOne => materialized.into_single().into_iter().collect(),
            Cardinality::ToMany => materialized.into_entities(),
        })
    }
}

/// Builds and memoizes dependency trees over an [`EntityAdapter`]
pub struct DependencyBuilder<'a, A: EntityAdapter + ?Sized> {
    adapter: &'a A,
    options: TraversalOptions,
    cache: HashMap<(EntityRef, Direction), Vec<DependencyNode>>,
}

impl<'a, A: EntityAdapter + ?Sized> DependencyBuilder<'a, A> {
    pub fn new(adapter: &'a A) -> Self {
        Self::with_options(adapter, TraversalOptions::default())
    }

    pub fn with_options(adapter: &'a A, options: TraversalOptions) -> Self {
        Self {
            adapter,
            options,
            cache: HashMap::new(),
        }
    }

    pub fn options(&self) -> &TraversalOptions {
        &self.options
    }

    /// Entities `root` depends on
    pub fn lower_level_dependencies(&mut self, root: &EntityRef) -> Result<&[DependencyNode]> {
        self.dependencies(root, Direction::LowerLevel)
    }

    /// Entities that depend on `root`
    pub fn higher_level_dependencies(&mut self, root: &EntityRef) -> Result<&[DependencyNode]> {
        self.dependencies(root, Direction::HigherLevel)
    }

    /// Top-level dependency nodes of `root` in `direction`
    ///
    /// The first call walks the graph; later calls for the same root and
    /// direction return the memoized nodes without touching the adapter.
    pub fn dependencies(
        &mut self,
        root: &EntityRef,
        direction: Direction,
    ) -> Result<&[DependencyNode]> {
        let key = (root.clone(), direction);

        if self.cache.contains_key(&key) {
            tracing::debug!("Dependency cache hit: {} ({})", root, direction);
        } else {
            let nodes = self.build(root, direction)?;
            self.cache.insert(key.clone(), nodes);
        }

        Ok(self.cache.get(&key).map(Vec::as_slice).unwrap_or_default())
    }

    /// Largest depth among the top-level nodes of `root`, 0 when empty
    pub fn dependencies_depth(&mut self, root: &EntityRef, direction: Direction) -> Result<usize> {
        Ok(max_depth(self.dependencies(root, direction)?))
    }

    pub fn lower_level_dependencies_depth(&mut self, root: &EntityRef) -> Result<usize> {
        self.dependencies_depth(root, Direction::LowerLevel)
    }

    pub fn higher_level_dependencies_depth(&mut self, root: &EntityRef) -> Result<usize> {
        self.dependencies_depth(root, Direction::HigherLevel)
    }

    /// Prefetch paths an initial walk from `entity_type` would request
    pub fn relation_paths(
        &self,
        entity_type: &EntityType,
        direction: Direction,
    ) -> Result<Vec<PrefetchPath>> {
        relation_paths(
            self.adapter,
            entity_type,
            direction,
            self.options.recursive,
            &self.options.scope_overrides,
        )
    }

    pub fn is_cached(&self, root: &EntityRef, direction: Direction) -> bool {
        self.cache.contains_key(&(root.clone(), direction))
    }

    /// Drop memoized trees of `root` in both directions
    pub fn forget(&mut self, root: &EntityRef) {
        self.cache.retain(|(entity, _), _| entity != root);
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    fn build(&self, root: &EntityRef, direction: Direction) -> Result<Vec<DependencyNode>> {
        tracing::debug!(
            "Building dependencies: root={}, direction={}, recursive={}, eager={}",
            root,
            direction,
            self.options.recursive,
            self.options.eager_loading
        );

        if self.uses_eager_loading(&root.entity_type) {
            let paths = self.relation_paths(&root.entity_type, direction)?;
            if !paths.is_empty() {
                tracing::debug!("Prefetching {} relation paths for {}", paths.len(), root);
                self.adapter.prefetch(root, &paths)?;
            }
        }

        let mut walker = Walker {
            adapter: self.adapter,
            options: &self.options,
            policy: Policy::for_direction(direction),
            visiting: HashSet::from([root.clone()]),
        };
        let tree = walker.walk(root, Mode::Initial, 0, "")?;

        tracing::debug!(
            "Built {} top-level dependencies for {} ({})",
            tree.nodes.len(),
            root,
            direction
        );
        Ok(tree.nodes)
    }

    fn uses_eager_loading(&self, entity_type: &EntityType) -> bool {
        self.options.eager_loading
            && self
                .adapter
                .participant(entity_type)
                .map(|p| p.eager_loading())
                .unwrap_or(false)
    }
}

/// State of one walk from a root
struct Walker<'w, A: EntityAdapter + ?Sized> {
    adapter: &'w A,
    options: &'w TraversalOptions,
    policy: &'static Policy,
    /// Entities on the active recursion path
    visiting: HashSet<EntityRef>,
}

impl<'w, A: EntityAdapter + ?Sized> Walker<'w, A> {
    /// Walk the relations of `entity`, which sits at relation path `prefix`
    /// from the root (empty for the root itself)
    fn walk(
        &mut self,
        entity: &EntityRef,
        mode: Mode,
        level: usize,
        prefix: &str,
    ) -> Result<DependencyTree> {
        let direction = self.policy.direction;
        let relations = self
            .adapter
            .declared_relations(&entity.entity_type, direction);
        let recurses = self.options.recursive && self.adapter.allows_recursion(&entity.entity_type);

        let mut nodes = Vec::new();
        let mut deep = 0;
        let mut discoverer_options: Option<Option<Vec<DependencyOption>>> = None;

        for relation in &relations {
            let descriptor = self
                .adapter
                .relation_descriptor(&entity.entity_type, relation)?;
            let path = if prefix.is_empty() {
                relation.clone()
            } else {
                format!("{}.{}", prefix, relation)
            };
            let dependents = self.policy.fetch(
                self.adapter,
                entity,
                &descriptor,
                &path,
                &self.options.scope_overrides,
            )?;

            tracing::trace!(
                "{}.{} materialized {} entities",
                entity,
                relation,
                dependents.len()
            );

            if dependents.is_empty() {
                deep = deep.max(self.policy.empty_relation_depth);
                continue;
            }

            for dependent in dependents {
                let mut node = self.node(entity, &dependent, &descriptor)?;

                node.options = match self.policy.options {
                    OptionsSource::Dependent => resolve_options(self.adapter, &dependent.entity_type)?,
                    OptionsSource::Discoverer if mode == Mode::Initial => {
                        if discoverer_options.is_none() {
                            discoverer_options =
                                Some(resolve_options(self.adapter, &entity.entity_type)?);
                        }
                        discoverer_options.clone().flatten()
                    }
                    OptionsSource::Discoverer => None,
                };

                if recurses && descriptor.recursive {
                    if let Some(tree) = self.descend(&dependent, level + 1, &path)? {
                        node.attach_children(tree);
                    }
                }

                deep = deep.max(node.depth);
                nodes.push(node);
            }
        }

        Ok(DependencyTree { nodes, depth: deep })
    }

    /// Nested walk of `dependent`, unless it would revisit the active path
    /// or exceed the depth limit
    fn descend(
        &mut self,
        dependent: &EntityRef,
        level: usize,
        path: &str,
    ) -> Result<Option<DependencyTree>> {
        if self.visiting.contains(dependent) {
            tracing::warn!(
                "Dependency cycle at {} ({}), not descending",
                dependent,
                self.policy.direction
            );
            return Ok(None);
        }
        if level >= MAX_DEPENDENCY_DEPTH {
            tracing::warn!(
                "Dependency depth limit {} reached at {}",
                MAX_DEPENDENCY_DEPTH,
                dependent
            );
            return Ok(None);
        }

        self.visiting.insert(dependent.clone());
        let tree = self.walk(dependent, Mode::Nested, level, path);
        self.visiting.remove(dependent);

        tree.map(Some)
    }

    fn node(
        &self,
        discoverer: &EntityRef,
        dependent: &EntityRef,
        descriptor: &RelationDescriptor,
    ) -> Result<DependencyNode> {
        Ok(DependencyNode {
            entity_type: dependent.entity_type.clone(),
            entity_id: dependent.id.clone(),
            display_name: self.adapter.display_name(dependent)?,
            foreign_key_field: (self.policy.foreign_key)(descriptor).to_string(),
            label: self.label(&dependent.entity_type),
            depth: 1,
            actions: filter_actions(
                self.adapter,
                &discoverer.entity_type,
                Some(&dependent.entity_type),
                self.policy.direction,
                self.options.filter_actions,
            ),
            options: None,
            children: Vec::new(),
        })
    }

    fn label(&self, entity_type: &EntityType) -> String {
        self.adapter
            .participant(entity_type)
            .and_then(|p| p.dependency_name())
            .unwrap_or_else(|| entity_type.short_name())
            .to_string()
    }
}
