//! Descriptor model
//!
//! In-memory representation of a Bio-Croissant dataset descriptor:
//! record sets (one per target table), their fields, and the file
//! distributions the fields point at.
//!
//! The model is read-only after parsing; it carries no behaviour beyond
//! accessor lookups.

mod parser;
pub mod report;

pub use parser::DescriptorError;
pub use report::{DescriptorReport, inspect};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// The whole metadata document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Descriptor {
    /// Dataset name
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Record collections, in declaration order
    #[serde(rename = "recordSet")]
    pub record_sets: Vec<RecordCollection>,
    /// Physical source files
    #[serde(rename = "distribution")]
    pub distributions: Vec<Distribution>,
    /// ISO 11179 conformance level (e.g. "Level 2")
    #[serde(
        rename = "bio:conformanceLevel",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub conformance_level: Option<String>,
    /// ISO 11179 data steward
    #[serde(
        rename = "iso11179:steward",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub steward: Option<Steward>,
    /// ISO 11179 registration status
    #[serde(
        rename = "iso11179:registrationStatus",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub registration_status: Option<String>,
}

impl Descriptor {
    /// Find a distribution by its `@id`.
    ///
    /// Identifiers are expected to be unique; if they are not, the first
    /// declaration wins.
    pub fn distribution(&self, id: &str) -> Option<&Distribution> {
        self.distributions
            .iter()
            .find(|d| d.id.as_deref() == Some(id))
    }

    /// Find a record collection by name
    pub fn record_set(&self, name: &str) -> Option<&RecordCollection> {
        self.record_sets
            .iter()
            .find(|rs| rs.name.as_deref() == Some(name))
    }

    /// Total number of fields across all record collections
    pub fn field_count(&self) -> usize {
        self.record_sets.iter().map(|rs| rs.fields.len()).sum()
    }
}

/// Steward contact block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Steward {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One physical source file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Distribution {
    /// Identifier, unique within a descriptor; a distribution without one
    /// cannot be referenced
    #[serde(
        rename = "@id",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Path or URL of the content
    #[serde(
        rename = "contentUrl",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub content_url: Option<String>,
    /// Declared encoding, e.g. `text/csv`
    #[serde(
        rename = "encodingFormat",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub encoding_format: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A named, ordered group of fields describing one logical table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordCollection {
    #[serde(
        rename = "@id",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Declared OMOP target table
    #[serde(
        rename = "omop:cdmTable",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_table: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "field", default, deserialize_with = "list_or_empty")]
    pub fields: Vec<Field>,
}

impl RecordCollection {
    /// Name used in messages when the collection has no usable identity
    pub fn display_name(&self) -> &str {
        self.target_table
            .as_deref()
            .or(self.name.as_deref())
            .or(self.id.as_deref())
            .unwrap_or("<unnamed>")
    }

    /// Distribution referenced by the first field, if any.
    ///
    /// A record collection maps to exactly one distribution; only the first
    /// field's `source.fileObject.@id` is consulted.
    pub fn distribution_ref(&self) -> Option<&str> {
        self.fields.first().and_then(Field::distribution_ref)
    }
}

/// Declared scalar type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    Integer,
    Float,
    Text,
    Date,
    DateTime,
    Boolean,
}

impl ScalarType {
    /// Parse a declared data type such as `sc:Integer`.
    ///
    /// Any vocabulary prefix before the last `:` is ignored and matching is
    /// case-insensitive. Unknown types yield `None`.
    pub fn parse(declared: &str) -> Option<Self> {
        let local = declared.rsplit(':').next().unwrap_or(declared).trim();
        match local.to_ascii_lowercase().as_str() {
            "integer" | "int" | "int32" | "int64" => Some(ScalarType::Integer),
            "float" | "number" | "double" | "float32" | "float64" => Some(ScalarType::Float),
            "text" | "string" => Some(ScalarType::Text),
            "date" => Some(ScalarType::Date),
            "datetime" | "timestamp" => Some(ScalarType::DateTime),
            "boolean" | "bool" => Some(ScalarType::Boolean),
            _ => None,
        }
    }
}

impl std::fmt::Display for ScalarType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarType::Integer => write!(f, "integer"),
            ScalarType::Float => write!(f, "float"),
            ScalarType::Text => write!(f, "text"),
            ScalarType::Date => write!(f, "date"),
            ScalarType::DateTime => write!(f, "datetime"),
            ScalarType::Boolean => write!(f, "boolean"),
        }
    }
}

/// `{"@id": ...}` reference object
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IdRef {
    #[serde(
        rename = "@id",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
}

/// Where a field's values come from
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldSource {
    #[serde(
        rename = "fileObject",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub file_object: Option<IdRef>,
}

/// A single field of a record collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Field {
    #[serde(
        rename = "@id",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Source column name
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Declared data type as written in the descriptor
    #[serde(
        rename = "dataType",
        default,
        deserialize_with = "string_or_first",
        skip_serializing_if = "Option::is_none"
    )]
    pub data_type: Option<String>,
    /// Target OMOP field name, defaults to `name`
    #[serde(
        rename = "omop:cdmField",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_field: Option<String>,
    #[serde(rename = "omop:isPrimaryKey", default, deserialize_with = "truthy")]
    pub primary_key: bool,
    #[serde(
        rename = "omop:foreignKeyTable",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub foreign_key_table: Option<String>,
    /// Back-reference to another field, e.g. `person/person_id`
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub references: Option<IdRef>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub source: Option<FieldSource>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        rename = "iso11179:dataElementConcept",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub data_element_concept: Option<serde_json::Value>,
    #[serde(
        rename = "iso11179:valueDomain",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub value_domain: Option<serde_json::Value>,
}

impl Field {
    /// Create a bare field with only a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            data_type: None,
            target_field: None,
            primary_key: false,
            foreign_key_table: None,
            references: None,
            source: None,
            description: None,
            data_element_concept: None,
            value_domain: None,
        }
    }

    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    pub fn with_target_field(mut self, target: impl Into<String>) -> Self {
        self.target_field = Some(target.into());
        self
    }

    pub fn with_primary_key(mut self, primary_key: bool) -> Self {
        self.primary_key = primary_key;
        self
    }

    pub fn with_foreign_key(mut self, table: impl Into<String>) -> Self {
        self.foreign_key_table = Some(table.into());
        self
    }

    pub fn with_references(mut self, reference: impl Into<String>) -> Self {
        self.references = Some(IdRef {
            id: Some(reference.into()),
        });
        self
    }

    pub fn with_distribution(mut self, distribution_id: impl Into<String>) -> Self {
        self.source = Some(FieldSource {
            file_object: Some(IdRef {
                id: Some(distribution_id.into()),
            }),
        });
        self
    }

    /// Source column name, `None` when missing or empty
    pub fn source_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }

    /// Target field name (declared target, else the source name)
    pub fn target_name(&self) -> Option<&str> {
        self.target_field
            .as_deref()
            .filter(|target| !target.is_empty())
            .or_else(|| self.source_name())
    }

    /// Parsed declared type, `None` when absent or unknown
    pub fn scalar_type(&self) -> Option<ScalarType> {
        self.data_type.as_deref().and_then(ScalarType::parse)
    }

    /// Distribution `@id` from `source.fileObject`
    pub fn distribution_ref(&self) -> Option<&str> {
        self.source
            .as_ref()
            .and_then(|s| s.file_object.as_ref())
            .and_then(|f| f.id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Final path segment of the `references.@id` back-reference.
    ///
    /// Returns an empty string when there is no reference.
    pub fn referenced_field(&self) -> String {
        self.references
            .as_ref()
            .and_then(|r| r.id.as_deref())
            .map(|id| id.rsplit('/').next().unwrap_or_default().to_string())
            .unwrap_or_default()
    }
}

/// Read an optional member, treating a value of the wrong shape as absent.
///
/// Metadata defects in one record set must not make the whole document
/// unreadable; they surface later as per-table errors.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Key flags written as `true`, `"true"`, `"yes"` or `1` all count
fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Bool(b)) => b,
        Some(serde_json::Value::String(s)) => {
            matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1")
        }
        Some(serde_json::Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    })
}

/// A `field` member that is not a list reads as no fields
fn list_or_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        Some(items @ serde_json::Value::Array(_)) => {
            Vec::<T>::deserialize(items).map_err(serde::de::Error::custom)
        }
        _ => Ok(Vec::new()),
    }
}

/// Croissant allows `dataType` to be a single IRI or a list of them; the
/// first entry of a list is taken as the scalar type.
fn string_or_first<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .find_map(|item| item.as_str().map(str::to_string)),
        _ => None,
    })
}
