//! Descriptor inspection report
//!
//! Summarises a descriptor's ISO 11179 administrative metadata and how
//! completely its fields are annotated with data element concepts and value
//! domains.

use serde::{Deserialize, Serialize};

use super::Descriptor;

/// Summary of a descriptor's contents and metadata coverage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorReport {
    pub dataset_name: Option<String>,
    pub conformance_level: Option<String>,
    pub steward: Option<String>,
    pub registration_status: Option<String>,
    pub record_sets: usize,
    pub distributions: usize,
    pub total_fields: usize,
    pub with_data_element_concept: usize,
    pub with_value_domain: usize,
    /// Record sets whose first field points at no known distribution
    pub unresolved_record_sets: Vec<String>,
}

impl DescriptorReport {
    /// True for "Level 2" and "Level 3" descriptors
    pub fn is_registered_level(&self) -> bool {
        matches!(
            self.conformance_level.as_deref(),
            Some("Level 2") | Some("Level 3")
        )
    }

    pub fn data_element_concept_coverage(&self) -> f64 {
        percentage(self.with_data_element_concept, self.total_fields)
    }

    pub fn value_domain_coverage(&self) -> f64 {
        percentage(self.with_value_domain, self.total_fields)
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

/// Build an inspection report for a descriptor
pub fn inspect(descriptor: &Descriptor) -> DescriptorReport {
    let fields = descriptor.record_sets.iter().flat_map(|rs| rs.fields.iter());
    let (mut with_dec, mut with_vd) = (0, 0);
    for field in fields {
        if field.data_element_concept.is_some() {
            with_dec += 1;
        }
        if field.value_domain.is_some() {
            with_vd += 1;
        }
    }

    let unresolved_record_sets = descriptor
        .record_sets
        .iter()
        .filter(|rs| {
            rs.distribution_ref()
                .and_then(|id| descriptor.distribution(id))
                .is_none()
        })
        .map(|rs| rs.display_name().to_string())
        .collect();

    DescriptorReport {
        dataset_name: descriptor.name.clone(),
        conformance_level: descriptor.conformance_level.clone(),
        steward: descriptor.steward.as_ref().and_then(|s| s.name.clone()),
        registration_status: descriptor.registration_status.clone(),
        record_sets: descriptor.record_sets.len(),
        distributions: descriptor.distributions.len(),
        total_fields: descriptor.field_count(),
        with_data_element_concept: with_dec,
        with_value_domain: with_vd,
        unresolved_record_sets,
    }
}
