//! Fixture documents: schemas and records in one JSON or TOML file

use crate::error::{StorageError, StorageResult};
use crate::memory::MemoryStore;
use crate::record::Record;
use crate::schema::TypeSchema;
use depwalk_core::EntityType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Serialized form of a store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub types: Vec<TypeSchema>,

    /// Records keyed by type name
    #[serde(default)]
    pub records: BTreeMap<EntityType, Vec<Record>>,
}

impl Fixture {
    pub fn from_json(s: &str) -> StorageResult<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_toml(s: &str) -> StorageResult<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load a fixture file; `.toml` files are read as TOML, anything else
    /// as JSON
    pub fn load(path: &Path) -> StorageResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        let fixture = if is_toml {
            Self::from_toml(&content)?
        } else {
            Self::from_json(&content)?
        };

        tracing::debug!(
            "Loaded fixture {:?}: {} types, {} record sets",
            path,
            fixture.types.len(),
            fixture.records.len()
        );
        Ok(fixture)
    }

    /// Build a validated store from this fixture
    pub fn into_store(self) -> StorageResult<MemoryStore> {
        let mut store = MemoryStore::new();
        for schema in self.types {
            if store.schema(&schema.name).is_some() {
                return Err(StorageError::InvalidFixture(format!(
                    "type {} declared twice",
                    schema.name
                )));
            }
            store.register_type(schema);
        }
        store.validate()?;

        for (entity_type, records) in self.records {
            for record in records {
                store.insert(entity_type.clone(), record)?;
            }
        }

        tracing::info!(
            "Store ready: {} types, {} records",
            store.types().count(),
            store.record_count()?
        );
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depwalk_core::{DependencyParticipant, Direction, EntityAdapter};
    use std::io::Write;

    const TOML_FIXTURE: &str = r#"
[[types]]
name = "Invoice"

[[types.relations]]
name = "customer"
kind = "belongs_to"
related = "Customer"
foreign_key = "customer_id"

[types.dependencies]
lower_level = ["customer"]
lower_level_actions = ["view"]

[[types]]
name = "Customer"
name_field = "name"

[types.dependencies]
lower_level_actions = ["view", "edit"]
option_field = "name"

[[records.Invoice]]
id = 1
customer_id = 7

[[records.Customer]]
id = 7
name = "Acme"
"#;

    #[test]
    fn test_toml_fixture() {
        let store = Fixture::from_toml(TOML_FIXTURE).unwrap().into_store().unwrap();

        let invoice = EntityType::new("Invoice");
        let contract = store.participant(&invoice).unwrap();
        assert_eq!(contract.relations(Direction::LowerLevel), ["customer".to_string()]);
        assert_eq!(store.record_count().unwrap(), 2);
    }

    #[test]
    fn test_json_fixture_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{
                "types": [{{"name": "Customer", "name_field": "name"}}],
                "records": {{"Customer": [{{"id": "7", "name": "Acme"}}]}}
            }}"#
        )
        .unwrap();

        let store = Fixture::load(&path).unwrap().into_store().unwrap();
        assert_eq!(
            store
                .display_name(&depwalk_core::EntityRef::new("Customer", "7"))
                .unwrap(),
            "Acme"
        );
    }

    #[test]
    fn test_records_of_unknown_type_rejected() {
        let fixture = Fixture::from_json(r#"{"records": {"Ghost": [{"id": 1}]}}"#).unwrap();
        assert!(matches!(
            fixture.into_store(),
            Err(StorageError::UnknownType(_))
        ));
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let fixture =
            Fixture::from_json(r#"{"types": [{"name": "A"}, {"name": "A"}]}"#).unwrap();
        assert!(matches!(
            fixture.into_store(),
            Err(StorageError::InvalidFixture(_))
        ));
    }
}
