//! Relation path flattening for batched prefetch

use crate::adapter::EntityAdapter;
use crate::entity::EntityType;
use crate::error::Result;
use crate::relation::Direction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One dotted relation path to materialize ahead of a traversal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefetchPath {
    /// Dotted relation path (e.g. `order.customer`)
    pub path: String,

    /// Named query constraint to load this path with
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl PrefetchPath {
    pub fn plain(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            scope: None,
        }
    }

    pub fn scoped(path: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            scope: Some(scope.into()),
        }
    }

    /// Relation names along the path
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('.')
    }
}

impl std::fmt::Display for PrefetchPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{} [{}]", self.path, scope),
            None => f.write_str(&self.path),
        }
    }
}

/// Flatten the relations of `entity_type` in `direction` into prefetch paths
///
/// Own relations come first, followed by each participating related type's
/// paths prefixed with `<relation>.`. Nested expansion only happens when
/// `recursive` is set and every type along the way allows recursion, the
/// same rule the tree walk follows.
///
/// Scope overrides replace exact path matches and only apply to lower-level
/// paths.
pub fn relation_paths<A: EntityAdapter + ?Sized>(
    adapter: &A,
    entity_type: &EntityType,
    direction: Direction,
    recursive: bool,
    scope_overrides: &BTreeMap<String, String>,
) -> Result<Vec<PrefetchPath>> {
    let mut stack = vec![entity_type.clone()];
    let names = flatten(adapter, entity_type, direction, recursive, &mut stack)?;

    let paths = names
        .into_iter()
        .map(|path| match direction {
            Direction::LowerLevel => match scope_overrides.get(&path) {
                Some(scope) => PrefetchPath::scoped(path, scope.clone()),
                None => PrefetchPath::plain(path),
            },
            Direction::HigherLevel => PrefetchPath::plain(path),
        })
        .collect();

    Ok(paths)
}

fn flatten<A: EntityAdapter + ?Sized>(
    adapter: &A,
    entity_type: &EntityType,
    direction: Direction,
    recursive: bool,
    stack: &mut Vec<EntityType>,
) -> Result<Vec<String>> {
    let own = adapter.declared_relations(entity_type, direction);
    let mut paths = own.clone();

    if !(recursive && adapter.allows_recursion(entity_type)) {
        return Ok(paths);
    }

    for relation in &own {
        let descriptor = adapter.relation_descriptor(entity_type, relation)?;
        if !descriptor.recursive {
            continue;
        }
        let related = descriptor.related_type;

        // Cyclic declarations would never bottom out
        if stack.contains(&related) {
            tracing::debug!(
                "Not expanding {}.{}: {} is already being flattened",
                entity_type,
                relation,
                related
            );
            continue;
        }

        stack.push(related.clone());
        let nested = flatten(adapter, &related, direction, recursive, stack)?;
        stack.pop();

        paths.extend(nested.into_iter().map(|p| format!("{}.{}", relation, p)));
    }

    Ok(paths)
}
