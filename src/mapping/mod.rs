//! Table mapping
//!
//! Resolves each record collection of a descriptor to an OMOP CDM target
//! table and derives the field-level correspondence:
//! - target table identity (declared `omop:cdmTable`, else the record set name)
//! - ordered field mappings with declared types
//! - primary key (first flagged field wins)
//! - foreign keys with their referenced table and field
//!
//! The required-field registry that backs validation also lives here.
//!
//! # Example
//!
//! ```rust
//! use croissant_omop::descriptor::{Field, RecordCollection};
//! use croissant_omop::mapping::TableMapper;
//!
//! let rs = RecordCollection {
//!     id: None,
//!     name: Some("PERSON".to_string()),
//!     target_table: None,
//!     description: None,
//!     fields: vec![Field::new("person_id").with_primary_key(true)],
//! };
//!
//! let mapping = TableMapper::new().map_table(&rs);
//! assert_eq!(mapping.table_name(), Some("PERSON"));
//! assert_eq!(mapping.primary_key.as_deref(), Some("person_id"));
//! ```

mod mapper;
mod registry;
mod types;

pub use mapper::TableMapper;
pub use registry::{RegistryError, RequiredFieldRegistry};
pub use types::{FieldMapping, ForeignKeyRef, TableMapping};
