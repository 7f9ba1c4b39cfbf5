//! Relation descriptors and materialized relation values

use crate::entity::{EntityRef, EntityType};
use serde::{Deserialize, Serialize};

/// Direction of a dependency relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// The subject points at the related entity (owning-side foreign key)
    LowerLevel,
    /// The related entity points at the subject (inverse-side foreign key)
    HigherLevel,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowerLevel => "lower_level",
            Self::HigherLevel => "higher_level",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "lower" | "lower_level" => Ok(Self::LowerLevel),
            "higher" | "higher_level" => Ok(Self::HigherLevel),
            other => Err(format!("unknown direction: {}", other)),
        }
    }
}

/// How many entities a relation materializes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    ToOne,
    ToMany,
}

/// Declared relation between two entity types
///
/// `recursive` is filled in by the adapter from the related type's
/// contract: it is set when that type participates in dependency traversal
/// and allows recursing through it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    /// Relation name as declared on the owning type
    pub name: String,

    pub direction: Direction,

    /// Foreign key column. For to-many relations this may be qualified with
    /// the related table (`order_lines.order_id`).
    pub foreign_key: String,

    pub related_type: EntityType,

    pub cardinality: Cardinality,

    /// Related type participates recursively in the same protocol
    #[serde(default)]
    pub recursive: bool,
}

impl RelationDescriptor {
    /// Owning-side foreign key, read as declared
    pub fn foreign_key(&self) -> &str {
        &self.foreign_key
    }

    /// Inverse-side foreign key name with any table qualifier stripped
    pub fn foreign_key_name(&self) -> &str {
        self.foreign_key
            .rsplit('.')
            .next()
            .unwrap_or(&self.foreign_key)
    }

    pub fn is_to_many(&self) -> bool {
        self.cardinality == Cardinality::ToMany
    }
}

/// A relation after the adapter materialized it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materialized {
    Absent,
    One(EntityRef),
    Many(Vec<EntityRef>),
}

impl Materialized {
    /// Single related entity, taking the first of a collection
    pub fn into_single(self) -> Option<EntityRef> {
        match self {
            Self::Absent => None,
            Self::One(entity) => Some(entity),
            Self::Many(entities) => entities.into_iter().next(),
        }
    }

    /// Related entities in materialization order
    pub fn into_entities(self) -> Vec<EntityRef> {
        match self {
            Self::Absent => Vec::new(),
            Self::One(entity) => vec![entity],
            Self::Many(entities) => entities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(foreign_key: &str) -> RelationDescriptor {
        RelationDescriptor {
            name: "lines".to_string(),
            direction: Direction::HigherLevel,
            foreign_key: foreign_key.to_string(),
            related_type: EntityType::new("OrderLine"),
            cardinality: Cardinality::ToMany,
            recursive: true,
        }
    }

    #[test]
    fn test_foreign_key_accessors() {
        let qualified = descriptor("order_lines.order_id");
        assert_eq!(qualified.foreign_key(), "order_lines.order_id");
        assert_eq!(qualified.foreign_key_name(), "order_id");

        let bare = descriptor("order_id");
        assert_eq!(bare.foreign_key_name(), "order_id");
    }

    #[test]
    fn test_recursive_flag_defaults_off() {
        let parsed: RelationDescriptor = serde_json::from_value(serde_json::json!({
            "name": "customer",
            "direction": "lower_level",
            "foreign_key": "customer_id",
            "related_type": "Customer",
            "cardinality": "to_one",
        }))
        .unwrap();
        assert!(!parsed.recursive);
        assert!(descriptor("order_id").recursive);
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("lower".parse::<Direction>(), Ok(Direction::LowerLevel));
        assert_eq!("higher-level".parse::<Direction>(), Ok(Direction::HigherLevel));
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_materialized_conversions() {
        let a = EntityRef::new("Order", "1");
        let b = EntityRef::new("Order", "2");

        assert_eq!(Materialized::Absent.into_single(), None);
        assert_eq!(Materialized::One(a.clone()).into_entities(), vec![a.clone()]);
        assert_eq!(
            Materialized::Many(vec![a.clone(), b]).into_single(),
            Some(a)
        );
    }
}
