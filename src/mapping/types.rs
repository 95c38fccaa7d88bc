//! Types for table mapping results

use serde::{Deserialize, Serialize};

use crate::descriptor::ScalarType;

/// Resolved correspondence between a record collection and a target table.
///
/// Derived on every run and never stored in the descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableMapping {
    /// Resolved target table, `None` when the record set has no identity
    pub target_table: Option<String>,
    /// `@id` of the originating record set
    pub record_set_id: Option<String>,
    pub description: Option<String>,
    /// Field mappings in declaration order
    pub field_mappings: Vec<FieldMapping>,
    /// Source name of the primary key field
    pub primary_key: Option<String>,
    pub foreign_keys: Vec<ForeignKeyRef>,
}

impl TableMapping {
    /// Target table name, treating an empty name as absent
    pub fn table_name(&self) -> Option<&str> {
        self.target_table.as_deref().filter(|name| !name.is_empty())
    }

    /// Target field names in mapping order
    pub fn target_fields(&self) -> Vec<&str> {
        self.field_mappings
            .iter()
            .map(|m| m.target_field.as_str())
            .collect()
    }

    /// Find the mapping for a source field
    pub fn field(&self, source_field: &str) -> Option<&FieldMapping> {
        self.field_mappings
            .iter()
            .find(|m| m.source_field == source_field)
    }
}

/// Mapping of one source field onto a target field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldMapping {
    /// Field name in the source descriptor
    pub source_field: String,
    /// Field name in the target table
    pub target_field: String,
    /// Declared type, `None` when absent or unrecognised
    pub data_type: Option<ScalarType>,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreign_key_table: Option<String>,
}

impl FieldMapping {
    /// Create a new field mapping with identical source and target names
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            target_field: name.clone(),
            source_field: name,
            data_type: None,
            is_primary_key: false,
            foreign_key_table: None,
        }
    }

    /// Set the target field name
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_field = target.into();
        self
    }

    /// Set the declared type
    pub fn with_data_type(mut self, data_type: ScalarType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Mark as primary key
    pub fn with_primary_key(mut self, primary_key: bool) -> Self {
        self.is_primary_key = primary_key;
        self
    }
}

/// A foreign key discovered on a record collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignKeyRef {
    /// Source name of the referencing field
    pub field: String,
    /// Referenced target table
    pub references_table: String,
    /// Referenced field; empty when the back-reference is missing or malformed
    pub references_field: String,
}
