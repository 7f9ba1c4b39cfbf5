//! In-memory relational store
//!
//! Holds type schemas and records, resolves relations by foreign key and
//! keeps materialized relations around the way an ORM keeps loaded
//! relations on a model. Only unscoped results are kept; scopes are applied
//! on top of them per `materialize` call, so one caller's scope never shows
//! up in another caller's results.

use crate::error::{StorageError, StorageResult};
use crate::record::{compare_values, value_label, Record};
use crate::schema::{RelationDef, RelationKind, ScopeFilter, TypeSchema};
use depwalk_core::{
    Cardinality, DependencyOption, DependencyParticipant, EntityAdapter, EntityRef, EntityType,
    Materialized, PrefetchPath, RelationDescriptor,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Counters of adapter work done by a store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// `materialize` calls
    pub materializations: usize,
    /// Relation lookups that had to scan records
    pub fetches: usize,
    /// `prefetch` calls
    pub prefetches: usize,
    pub option_queries: usize,
}

/// In-memory entity store
pub struct MemoryStore {
    types: BTreeMap<EntityType, TypeSchema>,
    records: RwLock<BTreeMap<EntityType, Vec<Record>>>,
    loaded: RwLock<HashMap<(EntityRef, String), Vec<EntityRef>>>,
    materializations: AtomicUsize,
    fetches: AtomicUsize,
    prefetches: AtomicUsize,
    option_queries: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            types: BTreeMap::new(),
            records: RwLock::new(BTreeMap::new()),
            loaded: RwLock::new(HashMap::new()),
            materializations: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            prefetches: AtomicUsize::new(0),
            option_queries: AtomicUsize::new(0),
        }
    }

    /// Register a type schema, replacing any previous one with that name
    pub fn register_type(&mut self, schema: TypeSchema) {
        tracing::debug!("Registering type {}", schema.name);
        self.types.insert(schema.name.clone(), schema);
    }

    pub fn with_type(mut self, schema: TypeSchema) -> Self {
        self.register_type(schema);
        self
    }

    pub fn schema(&self, entity_type: &EntityType) -> Option<&TypeSchema> {
        self.types.get(entity_type)
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeSchema> {
        self.types.values()
    }

    /// Insert a record of a registered type
    pub fn insert(&self, entity_type: impl Into<EntityType>, record: Record) -> StorageResult<()> {
        let entity_type = entity_type.into();
        self.schema_of(&entity_type)?;

        let mut records = self.records_mut()?;
        let rows = records.entry(entity_type.clone()).or_default();
        if rows.iter().any(|r| r.id == record.id) {
            return Err(StorageError::DuplicateRecord(format!(
                "{}#{}",
                entity_type, record.id
            )));
        }
        rows.push(record);
        drop(records);

        // New rows can change any to-many relation
        self.loaded_mut()?.clear();
        Ok(())
    }

    pub fn with_record(self, entity_type: impl Into<EntityType>, record: Record) -> StorageResult<Self> {
        self.insert(entity_type, record)?;
        Ok(self)
    }

    pub fn get(&self, entity: &EntityRef) -> StorageResult<Option<Record>> {
        let records = self.records()?;
        Ok(records
            .get(&entity.entity_type)
            .and_then(|rows| rows.iter().find(|r| r.id == entity.id))
            .cloned())
    }

    pub fn contains(&self, entity: &EntityRef) -> StorageResult<bool> {
        Ok(self.get(entity)?.is_some())
    }

    /// All records of a type in insertion order
    pub fn records_of(&self, entity_type: &EntityType) -> StorageResult<Vec<Record>> {
        let records = self.records()?;
        Ok(records.get(entity_type).cloned().unwrap_or_default())
    }

    pub fn record_count(&self) -> StorageResult<usize> {
        Ok(self.records()?.values().map(Vec::len).sum())
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            materializations: self.materializations.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            prefetches: self.prefetches.load(Ordering::Relaxed),
            option_queries: self.option_queries.load(Ordering::Relaxed),
        }
    }

    /// Forget every materialized relation
    pub fn unload(&self) -> StorageResult<()> {
        self.loaded_mut()?.clear();
        Ok(())
    }

    /// Check that relations, contracts and scopes reference things that exist
    pub fn validate(&self) -> StorageResult<()> {
        for schema in self.types.values() {
            for relation in &schema.relations {
                self.schema_of(&relation.related).map_err(|_| {
                    StorageError::InvalidFixture(format!(
                        "{}.{} points at unknown type {}",
                        schema.name, relation.name, relation.related
                    ))
                })?;
            }

            if let Some(scope) = &schema.higher_dependencies_filter {
                self.scope_filter(&schema.name, scope)?;
            }

            let Some(contract) = &schema.dependencies else {
                continue;
            };
            for (names, direction) in [
                (&contract.lower_level, depwalk_core::Direction::LowerLevel),
                (&contract.higher_level, depwalk_core::Direction::HigherLevel),
            ] {
                for name in names {
                    let relation = schema.relation(name).ok_or_else(|| {
                        StorageError::InvalidFixture(format!(
                            "{} declares {} dependency '{}' without a relation",
                            schema.name, direction, name
                        ))
                    })?;
                    if relation.kind.direction() != direction {
                        return Err(StorageError::InvalidFixture(format!(
                            "{}.{} is not a {} relation",
                            schema.name, name, direction
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn records(&self) -> StorageResult<RwLockReadGuard<'_, BTreeMap<EntityType, Vec<Record>>>> {
        self.records
            .read()
            .map_err(|e| StorageError::Database(format!("Lock error: {}", e)))
    }

    fn records_mut(
        &self,
    ) -> StorageResult<RwLockWriteGuard<'_, BTreeMap<EntityType, Vec<Record>>>> {
        self.records
            .write()
            .map_err(|e| StorageError::Database(format!("Lock error: {}", e)))
    }

    fn loaded_mut(
        &self,
    ) -> StorageResult<RwLockWriteGuard<'_, HashMap<(EntityRef, String), Vec<EntityRef>>>> {
        self.loaded
            .write()
            .map_err(|e| StorageError::Database(format!("Lock error: {}", e)))
    }

    fn schema_of(&self, entity_type: &EntityType) -> StorageResult<&TypeSchema> {
        self.types
            .get(entity_type)
            .ok_or_else(|| StorageError::UnknownType(entity_type.to_string()))
    }

    fn relation_def(&self, entity_type: &EntityType, relation: &str) -> StorageResult<&RelationDef> {
        self.schema_of(entity_type)?
            .relation(relation)
            .ok_or_else(|| StorageError::UnknownRelation {
                entity_type: entity_type.to_string(),
                relation: relation.to_string(),
            })
    }

    fn scope_filter(&self, entity_type: &EntityType, scope: &str) -> StorageResult<&ScopeFilter> {
        self.schema_of(entity_type)?
            .scopes
            .get(scope)
            .ok_or_else(|| StorageError::UnknownScope {
                entity_type: entity_type.to_string(),
                scope: scope.to_string(),
            })
    }

    /// Scan records for the targets of `relation` on `entity`
    fn fetch(&self, entity: &EntityRef, relation: &RelationDef) -> StorageResult<Vec<EntityRef>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let records = self.records()?;
        let related_rows = records
            .get(&relation.related)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let targets: Vec<EntityRef> = match relation.kind {
            RelationKind::BelongsTo => {
                let owner = records
                    .get(&entity.entity_type)
                    .and_then(|rows| rows.iter().find(|r| r.id == entity.id))
                    .ok_or_else(|| StorageError::RecordNotFound(entity.to_string()))?;

                match owner.key(&relation.foreign_key) {
                    Some(key) => related_rows
                        .iter()
                        .find(|r| r.id.0 == key)
                        .map(|r| EntityRef::new(relation.related.clone(), r.id.clone()))
                        .into_iter()
                        .collect(),
                    None => Vec::new(),
                }
            }
            RelationKind::HasOne | RelationKind::HasMany => {
                let mut matching = related_rows
                    .iter()
                    .filter(|r| r.key(&relation.foreign_key).as_deref() == Some(entity.id.as_str()))
                    .map(|r| EntityRef::new(relation.related.clone(), r.id.clone()));

                if relation.kind == RelationKind::HasOne {
                    matching.next().into_iter().collect()
                } else {
                    matching.collect()
                }
            }
        };

        Ok(targets)
    }

    /// Materialized targets of a relation, loading them on first use
    fn load(&self, entity: &EntityRef, relation: &RelationDef) -> StorageResult<Vec<EntityRef>> {
        let key = (entity.clone(), relation.name.clone());
        if let Some(targets) = self
            .loaded
            .read()
            .map_err(|e| StorageError::Database(format!("Lock error: {}", e)))?
            .get(&key)
        {
            return Ok(targets.clone());
        }

        let targets = self.fetch(entity, relation)?;
        self.loaded_mut()?.insert(key, targets.clone());
        Ok(targets)
    }

    /// Keep only the entities whose records pass `scope`
    fn apply_scope(
        &self,
        entity_type: &EntityType,
        entities: Vec<EntityRef>,
        scope: &str,
    ) -> StorageResult<Vec<EntityRef>> {
        let filter = self.scope_filter(entity_type, scope)?;
        let records = self.records()?;
        let rows = records
            .get(entity_type)
            .map(Vec::as_slice)
            .unwrap_or_default();

        Ok(entities
            .into_iter()
            .filter(|e| {
                rows.iter()
                    .find(|r| r.id == e.id)
                    .map(|r| r.matches(filter))
                    .unwrap_or(false)
            })
            .collect())
    }

    fn prefetch_path(&self, root: &EntityRef, path: &PrefetchPath) -> StorageResult<()> {
        let segments: Vec<&str> = path.segments().collect();
        let mut frontier = vec![root.clone()];

        for (i, segment) in segments.iter().enumerate() {
            let last = i + 1 == segments.len();
            let mut next: Vec<EntityRef> = Vec::new();

            for entity in &frontier {
                let relation = self.relation_def(&entity.entity_type, segment)?;
                // Scoped paths warm the unscoped relation; the scope itself
                // is applied when the walk materializes it
                if let (Some(scope), true) = (&path.scope, last) {
                    self.scope_filter(&relation.related, scope)?;
                }
                let targets = self.load(entity, relation)?;

                for target in targets {
                    if !next.contains(&target) {
                        next.push(target);
                    }
                }
            }

            frontier = next;
        }

        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityAdapter for MemoryStore {
    fn participant(&self, entity_type: &EntityType) -> Option<&dyn DependencyParticipant> {
        self.types
            .get(entity_type)
            .and_then(|schema| schema.dependencies.as_ref())
            .map(|contract| contract as &dyn DependencyParticipant)
    }

    fn relation_descriptor(
        &self,
        entity_type: &EntityType,
        relation: &str,
    ) -> depwalk_core::Result<RelationDescriptor> {
        let schema = self.schema_of(entity_type)?;
        let def = self.relation_def(entity_type, relation)?;
        Ok(schema.descriptor(def, self.types.get(&def.related)))
    }

    fn materialize(
        &self,
        entity: &EntityRef,
        relation: &str,
        scope: Option<&str>,
    ) -> depwalk_core::Result<Materialized> {
        self.materializations.fetch_add(1, Ordering::Relaxed);
        let def = self.relation_def(&entity.entity_type, relation)?;

        let mut targets = self.load(entity, def)?;
        if let Some(scope) = scope {
            targets = self.apply_scope(&def.related, targets, scope)?;
        }

        Ok(match def.kind.cardinality() {
            Cardinality::ToOne => targets
                .into_iter()
                .next()
                .map(Materialized::One)
                .unwrap_or(Materialized::Absent),
            Cardinality::ToMany => Materialized::Many(targets),
        })
    }

    fn option_query(
        &self,
        entity_type: &EntityType,
        field: &str,
    ) -> depwalk_core::Result<Vec<DependencyOption>> {
        self.option_queries.fetch_add(1, Ordering::Relaxed);
        let mut rows = self.records_of(entity_type)?;
        rows.sort_by(|a, b| {
            let a = a.get(field).unwrap_or_default();
            let b = b.get(field).unwrap_or_default();
            compare_values(&a, &b)
        });

        Ok(rows
            .into_iter()
            .map(|r| {
                let name = r.get(field).map(|v| value_label(&v)).unwrap_or_default();
                DependencyOption::new(r.id, name)
            })
            .collect())
    }

    fn display_name(&self, entity: &EntityRef) -> depwalk_core::Result<String> {
        let record = self
            .get(entity)?
            .ok_or_else(|| StorageError::RecordNotFound(entity.to_string()))?;

        let name = self
            .types
            .get(&entity.entity_type)
            .and_then(|schema| schema.name_field.as_deref())
            .and_then(|field| record.get(field))
            .map(|value| value_label(&value));

        Ok(name.unwrap_or_else(|| record.id.to_string()))
    }

    fn prefetch(&self, entity: &EntityRef, paths: &[PrefetchPath]) -> depwalk_core::Result<()> {
        self.prefetches.fetch_add(1, Ordering::Relaxed);
        for path in paths {
            tracing::trace!("Prefetching {} from {}", path, entity);
            self.prefetch_path(entity, path)?;
        }
        Ok(())
    }

    fn additional_filter_scope(&self, entity_type: &EntityType) -> Option<String> {
        self.types
            .get(entity_type)
            .and_then(|schema| schema.higher_dependencies_filter.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DependencyContract;
    use serde_json::json;

    fn store() -> MemoryStore {
        let mut open = ScopeFilter::new();
        open.insert("status".to_string(), json!("open"));

        MemoryStore::new()
            .with_type(
                TypeSchema::new("Customer")
                    .with_name_field("name")
                    .has_many("orders", "Order", "customer_id")
                    .with_dependencies(DependencyContract::new().options_by("name")),
            )
            .with_type(
                TypeSchema::new("Order")
                    .with_table("orders")
                    .belongs_to("customer", "Customer", "customer_id")
                    .with_scope("open", open),
            )
            .with_record("Customer", Record::new("1").with_field("name", "Zeta"))
            .unwrap()
            .with_record("Customer", Record::new("2").with_field("name", "Acme"))
            .unwrap()
            .with_record(
                "Order",
                Record::new("10")
                    .with_field("customer_id", 1)
                    .with_field("status", "open"),
            )
            .unwrap()
            .with_record(
                "Order",
                Record::new("11")
                    .with_field("customer_id", "1")
                    .with_field("status", "closed"),
            )
            .unwrap()
    }

    #[test]
    fn test_belongs_to_and_has_many() {
        let store = store();
        let order = EntityRef::new("Order", "10");
        let customer = EntityRef::new("Customer", "1");

        assert_eq!(
            store.materialize(&order, "customer", None).unwrap(),
            Materialized::One(customer.clone())
        );
        assert_eq!(
            store.materialize(&customer, "orders", None).unwrap(),
            Materialized::Many(vec![order, EntityRef::new("Order", "11")])
        );
    }

    #[test]
    fn test_scoped_materialize() {
        let store = store();
        let customer = EntityRef::new("Customer", "1");

        assert_eq!(
            store.materialize(&customer, "orders", Some("open")).unwrap(),
            Materialized::Many(vec![EntityRef::new("Order", "10")])
        );
        assert!(store.materialize(&customer, "orders", Some("missing")).is_err());
    }

    #[test]
    fn test_loaded_relations_are_reused() {
        let store = store();
        let customer = EntityRef::new("Customer", "1");

        store.materialize(&customer, "orders", None).unwrap();
        store.materialize(&customer, "orders", None).unwrap();

        let stats = store.stats();
        assert_eq!(stats.materializations, 2);
        assert_eq!(stats.fetches, 1);
    }

    #[test]
    fn test_scoped_prefetch_keeps_loaded_relation_unscoped() {
        let store = store();
        let customer = EntityRef::new("Customer", "1");

        store
            .prefetch(&customer, &[PrefetchPath::scoped("orders", "open")])
            .unwrap();

        assert_eq!(
            store.materialize(&customer, "orders", None).unwrap(),
            Materialized::Many(vec![EntityRef::new("Order", "10"), EntityRef::new("Order", "11")])
        );
        assert_eq!(
            store.materialize(&customer, "orders", Some("open")).unwrap(),
            Materialized::Many(vec![EntityRef::new("Order", "10")])
        );
        assert_eq!(store.stats().fetches, 1);
    }

    #[test]
    fn test_prefetch_rejects_unknown_scope() {
        let store = store();
        let result = store.prefetch(
            &EntityRef::new("Customer", "1"),
            &[PrefetchPath::scoped("orders", "missing")],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_options_sorted_by_field() {
        let store = store();
        let options = store
            .option_query(&EntityType::new("Customer"), "name")
            .unwrap();

        assert_eq!(
            options,
            vec![DependencyOption::new("2", "Acme"), DependencyOption::new("1", "Zeta")]
        );
    }

    #[test]
    fn test_display_name_uses_name_field() {
        let store = store();
        assert_eq!(
            store.display_name(&EntityRef::new("Customer", "2")).unwrap(),
            "Acme"
        );
        assert_eq!(store.display_name(&EntityRef::new("Order", "10")).unwrap(), "10");
        assert!(store.display_name(&EntityRef::new("Order", "99")).is_err());
    }

    #[test]
    fn test_inverse_foreign_key_is_qualified() {
        let store = store();
        let descriptor = store
            .relation_descriptor(&EntityType::new("Customer"), "orders")
            .unwrap();
        assert_eq!(descriptor.foreign_key, "orders.customer_id");
    }

    #[test]
    fn test_duplicate_record_rejected() {
        let store = store();
        let result = store.insert("Customer", Record::new("1"));
        assert!(matches!(result, Err(StorageError::DuplicateRecord(_))));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let store = store();
        let result = store.insert("Ghost", Record::new("1"));
        assert!(matches!(result, Err(StorageError::UnknownType(_))));
    }

    #[test]
    fn test_validate_catches_dangling_contract() {
        let store = MemoryStore::new().with_type(
            TypeSchema::new("Invoice")
                .with_dependencies(DependencyContract::new().lower_level(&["customer"])),
        );
        assert!(matches!(
            store.validate(),
            Err(StorageError::InvalidFixture(_))
        ));
        assert!(self::store().validate().is_ok());
    }
}
