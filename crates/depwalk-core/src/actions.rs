//! Action tags and the per-dependent action filter

use crate::adapter::EntityAdapter;
use crate::entity::EntityType;
use crate::relation::Direction;
use serde::{Deserialize, Serialize};

/// Permitted operation tag (e.g. `view`, `edit`, `delete`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionTag(pub String);

impl ActionTag {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActionTag {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ActionTag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Actions a discoverer permits on one of its dependents
///
/// Without a dependent this is the discoverer's own universe for the
/// direction. With one, the dependent's declared actions are narrowed to
/// that universe unless `filter` is off, in which case they pass through
/// untouched.
pub fn filter_actions<A: EntityAdapter + ?Sized>(
    adapter: &A,
    discoverer: &EntityType,
    dependent: Option<&EntityType>,
    direction: Direction,
    filter: bool,
) -> Vec<ActionTag> {
    let universe = adapter.declared_actions(discoverer, direction);
    let Some(dependent) = dependent else {
        return universe;
    };

    let own = adapter.declared_actions(dependent, direction);
    if !filter {
        return own;
    }
    intersect_actions(&own, &universe)
}

/// `own` restricted to members of `universe`, deduplicated, in `own` order
pub fn intersect_actions(own: &[ActionTag], universe: &[ActionTag]) -> Vec<ActionTag> {
    let mut permitted: Vec<ActionTag> = Vec::with_capacity(own.len());
    for action in own {
        if universe.contains(action) && !permitted.contains(action) {
            permitted.push(action.clone());
        }
    }
    permitted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> Vec<ActionTag> {
        names.iter().map(|n| ActionTag::from(*n)).collect()
    }

    #[test]
    fn test_intersect_keeps_dependent_order() {
        let own = tags(&["delete", "view", "edit"]);
        let universe = tags(&["edit", "view"]);
        assert_eq!(intersect_actions(&own, &universe), tags(&["view", "edit"]));
    }

    #[test]
    fn test_intersect_deduplicates() {
        let own = tags(&["view", "view", "edit"]);
        let universe = tags(&["view"]);
        assert_eq!(intersect_actions(&own, &universe), tags(&["view"]));
    }

    #[test]
    fn test_filter_actions_against_discoverer() {
        use crate::testing::{FakeAdapter, FakeType};

        let adapter = FakeAdapter::new()
            .with_type(
                "Invoice",
                FakeType::default().actions(Direction::LowerLevel, &["view"]),
            )
            .with_type(
                "Customer",
                FakeType::default().actions(Direction::LowerLevel, &["view", "edit"]),
            );
        let invoice = EntityType::new("Invoice");
        let customer = EntityType::new("Customer");
        let unknown = EntityType::new("Currency");

        let universe = filter_actions(&adapter, &invoice, None, Direction::LowerLevel, true);
        assert_eq!(universe, tags(&["view"]));

        let filtered =
            filter_actions(&adapter, &invoice, Some(&customer), Direction::LowerLevel, true);
        assert_eq!(filtered, tags(&["view"]));

        let raw = filter_actions(&adapter, &invoice, Some(&customer), Direction::LowerLevel, false);
        assert_eq!(raw, tags(&["view", "edit"]));

        let none = filter_actions(&adapter, &invoice, Some(&unknown), Direction::LowerLevel, true);
        assert!(none.is_empty());

        let other_direction =
            filter_actions(&adapter, &invoice, Some(&customer), Direction::HigherLevel, true);
        assert!(other_direction.is_empty());
    }

    #[test]
    fn test_intersect_empty_universe() {
        let own = tags(&["view"]);
        assert!(intersect_actions(&own, &[]).is_empty());
    }
}
