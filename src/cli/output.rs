//! Output formatting for CLI

use crate::convert::ConversionResult;
use crate::descriptor::DescriptorReport;

/// Format the human-readable summary of a conversion run
pub fn format_conversion_summary(result: &ConversionResult) -> String {
    let mut output = String::new();

    if result.success {
        output.push_str("\n✅ Conversion succeeded\n");
    } else {
        output.push_str("\n❌ Conversion failed\n");
    }
    output.push_str(&format!("Tables converted: {}\n", result.tables_converted));

    if !result.tables.is_empty() {
        output.push_str("\nTables:\n");
        for (name, stats) in &result.tables {
            output.push_str(&format!(
                "  - {}: {} rows, {} columns\n",
                name, stats.rows, stats.columns
            ));
        }
    }

    if !result.validation_results.is_empty() {
        output.push_str("\nValidation Results:\n");
        for (name, validation) in &result.validation_results {
            let mark = if validation.valid { "✓" } else { "✗" };
            output.push_str(&format!("  {} {}\n", mark, name));
            for error in &validation.errors {
                output.push_str(&format!("      {}\n", error));
            }
        }
    }

    if !result.reference_results.is_empty() {
        output.push_str("\nReference Checks:\n");
        for (key, check) in &result.reference_results {
            let mark = if check.valid { "✓" } else { "✗" };
            output.push_str(&format!("  {} {}\n", mark, key));
        }
    }

    if !result.errors.is_empty() {
        output.push_str("\n⚠️  Errors:\n");
        for error in &result.errors {
            output.push_str(&format!("  - {}\n", error));
        }
    }

    output
}

/// Format a descriptor inspection report
pub fn format_descriptor_report(report: &DescriptorReport) -> String {
    let mut output = String::new();
    let unset = "(not set)";

    output.push_str(&format!(
        "Dataset: {}\n",
        report.dataset_name.as_deref().unwrap_or(unset)
    ));
    output.push_str(&format!(
        "Conformance level: {}{}\n",
        report.conformance_level.as_deref().unwrap_or(unset),
        if report.is_registered_level() {
            " (registered)"
        } else {
            ""
        }
    ));
    output.push_str(&format!(
        "Steward: {}\n",
        report.steward.as_deref().unwrap_or(unset)
    ));
    output.push_str(&format!(
        "Registration status: {}\n",
        report.registration_status.as_deref().unwrap_or(unset)
    ));

    output.push_str(&format!(
        "\nRecord sets: {}\nDistributions: {}\nFields: {}\n",
        report.record_sets, report.distributions, report.total_fields
    ));
    output.push_str(&format!(
        "  Data element concept: {}/{} ({:.1}%)\n",
        report.with_data_element_concept,
        report.total_fields,
        report.data_element_concept_coverage()
    ));
    output.push_str(&format!(
        "  Value domain: {}/{} ({:.1}%)\n",
        report.with_value_domain,
        report.total_fields,
        report.value_domain_coverage()
    ));

    if report.unresolved_record_sets.is_empty() {
        output.push_str("\n✅ Every record set references a distribution\n");
    } else {
        output.push_str("\n⚠️  Record sets without a resolvable distribution:\n");
        for name in &report.unresolved_record_sets {
            output.push_str(&format!("  - {}\n", name));
        }
    }

    output
}
