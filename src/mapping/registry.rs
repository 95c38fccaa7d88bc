//! Required-field registry
//!
//! A closed table of `{target table -> mandatory field names}` handed to the
//! mapper and the validator at construction. The built-in registry covers
//! the OMOP CDM clinical event tables; more tables can be added in code or
//! loaded from a TOML file (feature `config-file`):
//!
//! ```toml
//! [tables]
//! DEATH = ["person_id", "death_date"]
//! ```

use std::collections::BTreeMap;
#[cfg(feature = "config-file")]
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading a registry file
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Failed to read registry file
    #[error("Failed to read registry file {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Registry file is not valid
    #[error("Invalid registry file: {0}")]
    Parse(String),
}

/// Mandatory fields per target table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequiredFieldRegistry {
    tables: BTreeMap<String, Vec<String>>,
}

const OMOP_REQUIRED_FIELDS: &[(&str, &[&str])] = &[
    (
        "PERSON",
        &[
            "person_id",
            "gender_concept_id",
            "year_of_birth",
            "race_concept_id",
            "ethnicity_concept_id",
        ],
    ),
    (
        "CONDITION_OCCURRENCE",
        &[
            "condition_occurrence_id",
            "person_id",
            "condition_concept_id",
            "condition_start_date",
            "condition_type_concept_id",
        ],
    ),
    (
        "PROCEDURE_OCCURRENCE",
        &[
            "procedure_occurrence_id",
            "person_id",
            "procedure_concept_id",
            "procedure_date",
            "procedure_type_concept_id",
        ],
    ),
    (
        "DRUG_EXPOSURE",
        &[
            "drug_exposure_id",
            "person_id",
            "drug_concept_id",
            "drug_exposure_start_date",
            "drug_type_concept_id",
        ],
    ),
    (
        "VISIT_OCCURRENCE",
        &[
            "visit_occurrence_id",
            "person_id",
            "visit_concept_id",
            "visit_start_date",
            "visit_type_concept_id",
        ],
    ),
    (
        "OBSERVATION",
        &[
            "observation_id",
            "person_id",
            "observation_concept_id",
            "observation_date",
            "observation_type_concept_id",
        ],
    ),
];

impl RequiredFieldRegistry {
    /// Registry with no known tables; every table validates by default
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in OMOP CDM registry
    pub fn omop() -> Self {
        let tables = OMOP_REQUIRED_FIELDS
            .iter()
            .map(|(table, fields)| {
                (
                    table.to_string(),
                    fields.iter().map(|f| f.to_string()).collect(),
                )
            })
            .collect();
        Self { tables }
    }

    /// Add or replace a table's mandatory fields
    pub fn with_table<I, S>(mut self, table: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(table, fields);
        self
    }

    pub fn insert<I, S>(&mut self, table: impl Into<String>, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables
            .insert(table.into(), fields.into_iter().map(Into::into).collect());
    }

    /// Merge another registry into this one; its entries win on conflict
    pub fn extend(&mut self, other: RequiredFieldRegistry) {
        self.tables.extend(other.tables);
    }

    /// Mandatory fields for a table, `None` if the table is unknown
    pub fn required_fields(&self, table: &str) -> Option<&[String]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Parse a registry from TOML text
    #[cfg(feature = "config-file")]
    pub fn from_toml_str(content: &str) -> Result<Self, RegistryError> {
        #[derive(Deserialize)]
        struct RegistryFile {
            #[serde(default)]
            tables: BTreeMap<String, Vec<String>>,
        }

        let file: RegistryFile =
            toml::from_str(content).map_err(|e| RegistryError::Parse(e.to_string()))?;
        if let Some((table, _)) = file.tables.iter().find(|(_, fields)| fields.is_empty()) {
            return Err(RegistryError::Parse(format!(
                "table '{}' lists no required fields",
                table
            )));
        }
        Ok(Self {
            tables: file.tables,
        })
    }

    /// Load a registry from a TOML file
    #[cfg(feature = "config-file")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| RegistryError::Read {
            path: PathBuf::from(path),
            source,
        })?;
        Self::from_toml_str(&content)
    }
}
