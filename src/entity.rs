//! Entity Handles
//!
//! A backend-owned mutable record with named-property access. The handle is
//! caller-owned once returned; persistence goes back through the service
//! that produced it.
//!
//! Using a handle after its service disconnected is a caller error: the
//! identity it carries belongs to the connection that produced it, and no
//! behavior is defined for it afterwards.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::constants::ID_PROPERTY;
use crate::value::Value;

/// A single record of some entity type.
///
/// Properties are an untyped bag; no validation happens against the schema
/// at this layer. Identity (`id`) is synthetic, assigned by the backend,
/// and opaque to the contract.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: Option<String>,
    entity_type: String,
    values: HashMap<String, Value>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Entity {
    /// Create an unsaved entity with a freshly assigned identity.
    pub(crate) fn new(entity_type: impl Into<String>, values: HashMap<String, Value>) -> Self {
        Self {
            id: Some(uuid::Uuid::new_v4().to_string()),
            entity_type: entity_type.into(),
            values,
            created_at: None,
            updated_at: None,
        }
    }

    /// Identity, if the backend has assigned one.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Entity type this record belongs to.
    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Timestamp of first persistence, if persisted.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Timestamp of last persistence, if persisted.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Read a property.
    ///
    /// `id` resolves to the identity; `created_at`/`updated_at` resolve to
    /// the persistence stamps. Absent properties read as `None`.
    #[must_use]
    pub fn get(&self, prop: &str) -> Option<Value> {
        match prop {
            ID_PROPERTY => self.id.clone().map(Value::Str),
            "created_at" => self.created_at.map(Value::Date),
            "updated_at" => self.updated_at.map(Value::Date),
            _ => self.values.get(prop).cloned(),
        }
    }

    /// Write a property; `None` removes it.
    ///
    /// Always succeeds. Writing `id` replaces the identity and only accepts
    /// a string value.
    pub fn set(&mut self, prop: &str, value: Option<Value>) {
        if prop == ID_PROPERTY {
            self.id = match value {
                Some(Value::Str(id)) => Some(id),
                _ => None,
            };
            return;
        }

        match value {
            Some(value) => {
                self.values.insert(prop.to_string(), value);
            }
            None => {
                self.values.remove(prop);
            }
        }
    }

    /// Property names currently set (identity and stamps excluded).
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Stamp the entity as persisted now.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        if self.created_at.is_none() {
            self.created_at = Some(now);
        }
        self.updated_at = Some(now);
    }

    /// Restore a persisted entity from backend storage.
    #[cfg(feature = "postgres")]
    pub(crate) fn restore(
        id: String,
        entity_type: impl Into<String>,
        values: HashMap<String, Value>,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        // Precondition
        assert!(!id.is_empty(), "persisted entity must have id");

        Self {
            id: Some(id),
            entity_type: entity_type.into(),
            values,
            created_at,
            updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_new_assigns_identity() {
        let entity = Entity::new("book", HashMap::new());
        assert!(entity.id().is_some());
        assert_eq!(entity.entity_type(), "book");
        assert!(entity.created_at().is_none());
    }

    #[test]
    fn test_get_and_set() {
        let mut entity = Entity::new("book", values(&[("title", Value::from("dune"))]));

        assert_eq!(entity.get("title"), Some(Value::from("dune")));
        assert_eq!(entity.get("missing"), None);

        entity.set("price", Some(Value::from(9.5)));
        assert_eq!(entity.get("price"), Some(Value::from(9.5)));
    }

    #[test]
    fn test_set_none_removes() {
        let mut entity = Entity::new("book", values(&[("title", Value::from("dune"))]));

        entity.set("title", None);

        assert_eq!(entity.get("title"), None);
        assert_eq!(entity.properties().count(), 0);
    }

    #[test]
    fn test_id_property_reads_identity() {
        let entity = Entity::new("book", HashMap::new());
        let id = entity.id().unwrap().to_string();
        assert_eq!(entity.get("id"), Some(Value::Str(id)));
    }

    #[test]
    fn test_touch_sets_created_once() {
        let mut entity = Entity::new("book", HashMap::new());

        let first = Utc::now();
        entity.touch(first);
        let created = entity.created_at();

        entity.touch(Utc::now());

        assert_eq!(entity.created_at(), created);
        assert!(entity.updated_at() >= created);
    }
}
