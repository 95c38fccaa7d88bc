//! Record collection to OMOP table mapper

use tracing::debug;

use super::registry::RequiredFieldRegistry;
use super::types::{FieldMapping, ForeignKeyRef, TableMapping};
use crate::descriptor::{Field, RecordCollection};

/// Maps record collections onto target tables
#[derive(Debug, Clone)]
pub struct TableMapper {
    registry: RequiredFieldRegistry,
}

impl Default for TableMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl TableMapper {
    /// Create a mapper backed by the OMOP CDM required-field registry
    pub fn new() -> Self {
        Self::with_registry(RequiredFieldRegistry::omop())
    }

    /// Create a mapper with a custom required-field registry
    pub fn with_registry(registry: RequiredFieldRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RequiredFieldRegistry {
        &self.registry
    }

    /// Map a record collection to a target table.
    ///
    /// The target table is the declared `omop:cdmTable`, else the record
    /// set's own name. A mapping without a table name is returned as-is;
    /// rejecting it is up to the caller.
    pub fn map_table(&self, record_set: &RecordCollection) -> TableMapping {
        let target_table = record_set
            .target_table
            .clone()
            .or_else(|| record_set.name.clone());

        // Unnamed fields have no column to map; the converter rejects them
        let field_mappings = record_set
            .fields
            .iter()
            .filter_map(|field| {
                Some(FieldMapping {
                    source_field: field.source_name()?.to_string(),
                    target_field: field.target_name()?.to_string(),
                    data_type: field.scalar_type(),
                    is_primary_key: field.primary_key,
                    foreign_key_table: field.foreign_key_table.clone(),
                })
            })
            .collect();

        let mapping = TableMapping {
            target_table,
            record_set_id: record_set.id.clone(),
            description: record_set.description.clone(),
            field_mappings,
            primary_key: self
                .identify_primary_key(&record_set.fields)
                .map(str::to_string),
            foreign_keys: self.identify_foreign_keys(&record_set.fields),
        };

        debug!(
            table = ?mapping.target_table,
            fields = mapping.field_mappings.len(),
            primary_key = ?mapping.primary_key,
            foreign_keys = mapping.foreign_keys.len(),
            "Mapped record set"
        );

        mapping
    }

    /// Return the first field flagged as primary key.
    ///
    /// When several fields are flagged only the first is honoured; the
    /// others are neither rejected nor reported.
    pub fn identify_primary_key<'a>(&self, fields: &'a [Field]) -> Option<&'a str> {
        fields
            .iter()
            .find(|f| f.primary_key)
            .and_then(Field::source_name)
    }

    /// Return every field that declares a foreign key table
    pub fn identify_foreign_keys(&self, fields: &[Field]) -> Vec<ForeignKeyRef> {
        fields
            .iter()
            .filter_map(|field| {
                let table = field.foreign_key_table.as_deref()?;
                if table.is_empty() {
                    return None;
                }
                Some(ForeignKeyRef {
                    field: field.source_name()?.to_string(),
                    references_table: table.to_string(),
                    references_field: field.referenced_field(),
                })
            })
            .collect()
    }

    /// Mandatory fields of a known table; empty for unknown tables
    pub fn get_required_fields(&self, table_name: &str) -> &[String] {
        self.registry.required_fields(table_name).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ScalarType;

    fn record_set(name: &str, target: Option<&str>, fields: Vec<Field>) -> RecordCollection {
        RecordCollection {
            id: Some(name.to_lowercase()),
            name: Some(name.to_string()),
            target_table: target.map(str::to_string),
            description: None,
            fields,
        }
    }

    #[test]
    fn test_map_person_table() {
        let rs = record_set(
            "PERSON",
            Some("PERSON"),
            vec![
                Field::new("person_id").with_target_field("person_id"),
                Field::new("gender_concept_id").with_target_field("gender_concept_id"),
            ],
        );
        let mapping = TableMapper::new().map_table(&rs);
        assert_eq!(mapping.table_name(), Some("PERSON"));
        assert_eq!(mapping.field_mappings.len(), 2);
        assert_eq!(mapping.record_set_id.as_deref(), Some("person"));
    }

    #[test]
    fn test_declared_table_overrides_name() {
        let rs = record_set("patients", Some("PERSON"), vec![Field::new("pid")]);
        let mapping = TableMapper::new().map_table(&rs);
        assert_eq!(mapping.table_name(), Some("PERSON"));

        let rs = record_set("patients", None, vec![Field::new("pid")]);
        let mapping = TableMapper::new().map_table(&rs);
        assert_eq!(mapping.table_name(), Some("patients"));
    }

    #[test]
    fn test_field_mapping_carries_types_and_targets() {
        let rs = record_set(
            "PERSON",
            None,
            vec![
                Field::new("pid")
                    .with_target_field("person_id")
                    .with_data_type("sc:Integer")
                    .with_primary_key(true),
                Field::new("note").with_data_type("sc:Unknown"),
            ],
        );
        let mapping = TableMapper::new().map_table(&rs);
        let first = &mapping.field_mappings[0];
        assert_eq!(first.source_field, "pid");
        assert_eq!(first.target_field, "person_id");
        assert_eq!(first.data_type, Some(ScalarType::Integer));
        assert!(first.is_primary_key);
        assert_eq!(mapping.field_mappings[1].target_field, "note");
        assert_eq!(mapping.field_mappings[1].data_type, None);
    }

    #[test]
    fn test_unnamed_fields_are_not_mapped() {
        let mut unnamed = Field::new("").with_primary_key(true);
        unnamed.name = None;
        let rs = record_set("NOTE", None, vec![unnamed, Field::new("note_id")]);

        let mapping = TableMapper::new().map_table(&rs);
        assert_eq!(mapping.target_fields(), vec!["note_id"]);
        assert_eq!(mapping.primary_key, None);
    }

    #[test]
    fn test_identify_primary_key() {
        let fields = vec![
            Field::new("person_id").with_primary_key(true),
            Field::new("gender_concept_id"),
        ];
        assert_eq!(
            TableMapper::new().identify_primary_key(&fields),
            Some("person_id")
        );
        assert_eq!(TableMapper::new().identify_primary_key(&fields[1..]), None);
    }

    #[test]
    fn test_first_primary_key_wins() {
        // Documented quirk: a second flagged field is silently ignored
        let fields = vec![
            Field::new("a"),
            Field::new("b").with_primary_key(true),
            Field::new("c").with_primary_key(true),
        ];
        assert_eq!(TableMapper::new().identify_primary_key(&fields), Some("b"));
    }

    #[test]
    fn test_identify_foreign_keys() {
        let fields = vec![
            Field::new("person_id").with_foreign_key("PERSON"),
            Field::new("condition_id"),
        ];
        let fks = TableMapper::new().identify_foreign_keys(&fields);
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].field, "person_id");
        assert_eq!(fks[0].references_table, "PERSON");
        assert_eq!(fks[0].references_field, "");
    }

    #[test]
    fn test_foreign_key_references_field_from_back_reference() {
        let fields = vec![
            Field::new("visit_id")
                .with_foreign_key("VISIT_OCCURRENCE")
                .with_references("visit_occurrence/visit_occurrence_id"),
        ];
        let fks = TableMapper::new().identify_foreign_keys(&fields);
        assert_eq!(fks[0].references_field, "visit_occurrence_id");
    }

    #[test]
    fn test_get_required_fields() {
        let mapper = TableMapper::new();
        assert!(
            mapper
                .get_required_fields("PERSON")
                .contains(&"year_of_birth".to_string())
        );
        assert!(mapper.get_required_fields("NOT_A_TABLE").is_empty());
    }
}
