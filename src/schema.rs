//! Schema Descriptors
//!
//! Supplied once, at connect time. Order of descriptors is irrelevant but
//! the set must be complete: every entity type ever referenced must appear.

use crate::constants::ENTITY_TYPE_BYTES_MAX;

/// Field type for a schema descriptor.
///
/// The relational backend derives column types from this; the document
/// backend stores it with the model but does not enforce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// UTF-8 text
    Text,
    /// Double-precision number
    Number,
    /// Boolean flag
    Boolean,
    /// UTC timestamp
    Date,
}

/// An entity type name paired with its field definitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDescriptor {
    name: String,
    fields: Vec<(String, FieldKind)>,
}

impl SchemaDescriptor {
    /// Create a descriptor for an entity type.
    ///
    /// # Panics
    /// Panics if the name is empty or exceeds [`ENTITY_TYPE_BYTES_MAX`].
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();

        // Preconditions
        assert!(!name.is_empty(), "entity type name cannot be empty");
        assert!(
            name.len() <= ENTITY_TYPE_BYTES_MAX,
            "entity type name {} bytes exceeds max {}",
            name.len(),
            ENTITY_TYPE_BYTES_MAX
        );

        Self {
            name,
            fields: Vec::new(),
        }
    }

    /// Add a field definition.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push((name.into(), kind));
        self
    }

    /// Entity type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field definitions in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[(String, FieldKind)] {
        &self.fields
    }
}
