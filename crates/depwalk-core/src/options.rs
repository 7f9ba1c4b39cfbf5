//! Option lists for foreign-key targets

use crate::adapter::EntityAdapter;
use crate::entity::{EntityId, EntityType};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// One selectable candidate for a foreign-key field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyOption {
    pub id: EntityId,
    pub name: String,
}

impl DependencyOption {
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Candidates for `entity_type`, ordered ascending by its display field
///
/// Returns `None` when the type has no display field or suppresses option
/// loading.
pub fn resolve_options<A: EntityAdapter + ?Sized>(
    adapter: &A,
    entity_type: &EntityType,
) -> Result<Option<Vec<DependencyOption>>> {
    let Some(field) = adapter.display_field(entity_type) else {
        return Ok(None);
    };

    let options = adapter.option_query(entity_type, &field)?;
    tracing::trace!(
        "Resolved {} options for {} by {}",
        options.len(),
        entity_type,
        field
    );
    Ok(Some(options))
}
