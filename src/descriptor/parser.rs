//! Descriptor loading

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use super::Descriptor;

/// Fatal descriptor errors; any of these aborts a conversion run
#[derive(Error, Debug)]
pub enum DescriptorError {
    /// Failed to read the descriptor file
    #[error("Failed to read descriptor {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON unreadable or required top-level keys missing
    #[error("Malformed descriptor: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl Descriptor {
    /// Parse a descriptor from JSON text.
    ///
    /// `recordSet` and `distribution` are required top-level keys.
    pub fn from_json_str(content: &str) -> Result<Self, DescriptorError> {
        let descriptor: Descriptor = serde_json::from_str(content)?;
        descriptor.warn_duplicate_distributions();
        debug!(
            record_sets = descriptor.record_sets.len(),
            distributions = descriptor.distributions.len(),
            "Parsed descriptor"
        );
        Ok(descriptor)
    }

    /// Parse an already-decoded JSON document
    pub fn from_value(value: serde_json::Value) -> Result<Self, DescriptorError> {
        let descriptor: Descriptor = serde_json::from_value(value)?;
        descriptor.warn_duplicate_distributions();
        Ok(descriptor)
    }

    /// Load and parse a descriptor file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DescriptorError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| DescriptorError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    fn warn_duplicate_distributions(&self) {
        let mut seen = HashSet::new();
        for (index, dist) in self.distributions.iter().enumerate() {
            match dist.id.as_deref() {
                Some(id) if !seen.insert(id) => {
                    warn!(id, "Duplicate distribution @id; first declaration wins");
                }
                Some(_) => {}
                None => warn!(index, "Distribution without @id cannot be referenced"),
            }
        }
    }
}
