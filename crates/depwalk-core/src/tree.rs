//! Dependency tree result types

use crate::actions::ActionTag;
use crate::entity::{EntityId, EntityRef, EntityType};
use crate::options::DependencyOption;
use serde::{Deserialize, Serialize};

/// One discovered entity in a dependency tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNode {
    pub entity_type: EntityType,

    pub entity_id: EntityId,

    /// Identifiable name of the entity
    pub display_name: String,

    /// Foreign key column linking the entity to its discoverer
    pub foreign_key_field: String,

    /// Short name for the relation or type
    pub label: String,

    /// Longest dependency chain rooted at this node, 1 for leaves
    pub depth: usize,

    /// Actions permitted on this node by its discoverer
    pub actions: Vec<ActionTag>,

    /// Selectable alternatives for the foreign key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<DependencyOption>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DependencyNode>,
}

impl DependencyNode {
    pub fn entity(&self) -> EntityRef {
        EntityRef::new(self.entity_type.clone(), self.entity_id.clone())
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Attach nested dependencies and lift the depth above them
    pub fn attach_children(&mut self, tree: DependencyTree) {
        if tree.nodes.is_empty() {
            return;
        }
        self.depth = self.depth.max(tree.depth + 1);
        self.children = tree.nodes;
    }

    /// Number of nodes in this subtree, including this one
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(|c| c.node_count()).sum::<usize>()
    }
}

/// Result of a nested traversal: the nodes plus their running max depth
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyTree {
    pub nodes: Vec<DependencyNode>,
    pub depth: usize,
}

impl DependencyTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Largest `depth` among top-level nodes, 0 when there are none
pub fn max_depth(nodes: &[DependencyNode]) -> usize {
    nodes.iter().map(|n| n.depth).max().unwrap_or(0)
}
