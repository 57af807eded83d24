use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type EntityId = String;

// a record as it arrives from the backend; only its shape matters here
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity {
    fields: Map<String, Value>,
}

impl Entity {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Wraps a JSON object. Anything else is not an entity.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// The stable identifier, read from `id` and falling back to `_id`.
    pub fn id(&self) -> Option<EntityId> {
        self.fields
            .get("id")
            .and_then(id_from_value)
            .or_else(|| self.fields.get("_id").and_then(id_from_value))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The id stored under a foreign-key field, if it holds one.
    pub fn foreign_id(&self, field: &str) -> Option<EntityId> {
        self.fields.get(field).and_then(id_from_value)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

pub fn id_from_value(value: &Value) -> Option<EntityId> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A field on a primary entity whose value references an entity of another
/// collection, e.g. `customer_id` on a rental pointing into `users`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyField {
    pub field: String,
    /// Endpoint the referenced entity is fetched from (`GET /{collection}/{id}`).
    pub collection: String,
    /// Key the backend wraps a single entity in, when it does (`{"user": {...}}`).
    #[serde(default)]
    pub response_key: Option<String>,
    /// Fields of the referenced entity that are shown and searched.
    #[serde(default)]
    pub display_fields: Vec<String>,
}

impl ForeignKeyField {
    pub fn new(field: &str, collection: &str, display_fields: &[&str]) -> Self {
        Self {
            field: field.to_string(),
            collection: collection.to_string(),
            response_key: None,
            display_fields: display_fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn with_response_key(mut self, key: &str) -> Self {
        self.response_key = Some(key.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_prefers_id_then_underscore_id() {
        let e = Entity::from_value(json!({"id": 7, "_id": "abc"})).unwrap();
        assert_eq!(e.id().as_deref(), Some("7"));
        let e = Entity::from_value(json!({"_id": "abc"})).unwrap();
        assert_eq!(e.id().as_deref(), Some("abc"));
        let e = Entity::from_value(json!({"id": null, "name": "x"})).unwrap();
        assert_eq!(e.id(), None);
    }

    #[test]
    fn foreign_id_ignores_null_and_blank() {
        let e = Entity::from_value(json!({"a": null, "b": "  ", "c": 3, "d": {"id": 1}}))
            .unwrap();
        assert_eq!(e.foreign_id("a"), None);
        assert_eq!(e.foreign_id("b"), None);
        assert_eq!(e.foreign_id("c").as_deref(), Some("3"));
        assert_eq!(e.foreign_id("d"), None);
        assert_eq!(e.foreign_id("missing"), None);
    }

    #[test]
    fn non_objects_are_not_entities() {
        assert!(Entity::from_value(json!([1, 2])).is_none());
        assert!(Entity::from_value(json!("x")).is_none());
    }
}
