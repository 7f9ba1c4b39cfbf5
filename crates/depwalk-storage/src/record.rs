//! Stored records and field value helpers

use depwalk_core::EntityId;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// One row of an entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: EntityId,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Field value, with `id` resolving to the record id
    pub fn get(&self, field: &str) -> Option<Value> {
        if field == "id" {
            return Some(Value::String(self.id.0.clone()));
        }
        self.fields.get(field).cloned()
    }

    /// Field value as a key comparable with entity ids
    pub fn key(&self, field: &str) -> Option<String> {
        self.get(field).as_ref().and_then(value_key)
    }

    /// Whether every condition matches the record's fields
    pub fn matches(&self, conditions: &std::collections::BTreeMap<String, Value>) -> bool {
        conditions.iter().all(|(field, expected)| {
            self.get(field)
                .map(|actual| values_equal(&actual, expected))
                .unwrap_or(expected.is_null())
        })
    }
}

fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<EntityId, D::Error> {
    let value = Value::deserialize(deserializer)?;
    value_key(&value)
        .map(EntityId)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid record id: {}", value)))
}

/// Key form of a scalar value: strings as-is, numbers and booleans printed
pub fn value_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Display form of a value for option lists
pub fn value_label(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (value_key(a), value_key(b)) {
        (Some(a), Some(b)) => a == b,
        _ => a == b,
    }
}

/// Ascending order of field values: nulls first, then booleans, numbers
/// and strings
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_id_deserializes() {
        let record: Record = serde_json::from_value(json!({"id": 7, "name": "Acme"})).unwrap();
        assert_eq!(record.id, EntityId::from("7"));
        assert_eq!(record.key("name"), Some("Acme".to_string()));
        assert_eq!(record.key("id"), Some("7".to_string()));
    }

    #[test]
    fn test_invalid_id_rejected() {
        let result: Result<Record, _> = serde_json::from_value(json!({"id": [1]}));
        assert!(result.is_err());
    }

    #[test]
    fn test_matches_conditions() {
        let record = Record::new("1")
            .with_field("status", "open")
            .with_field("priority", 2);

        let mut conditions = std::collections::BTreeMap::new();
        conditions.insert("status".to_string(), json!("open"));
        assert!(record.matches(&conditions));

        conditions.insert("priority".to_string(), json!("2"));
        assert!(record.matches(&conditions));

        conditions.insert("archived_at".to_string(), Value::Null);
        assert!(record.matches(&conditions));

        conditions.insert("status".to_string(), json!("closed"));
        assert!(!record.matches(&conditions));
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&Value::Null, &json!("a")), Ordering::Less);
    }
}
