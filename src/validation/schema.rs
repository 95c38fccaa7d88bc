//! JSON Schema conformance of descriptor documents
//!
//! Gated by the `schema-validation` feature. Without it every document is
//! accepted.

use serde_json::Value;

/// Format validation error with path information
#[cfg(feature = "schema-validation")]
fn format_validation_error(error: &jsonschema::ValidationError) -> String {
    let path_str = error.instance_path().to_string();
    let path_str = if path_str == "/" || path_str.is_empty() {
        "root".to_string()
    } else {
        path_str
    };

    format!(
        "Descriptor validation failed at path '{}': {}",
        path_str, error
    )
}

/// Validate a descriptor document against a JSON Schema.
///
/// Returns every violation found, or a single entry when the schema itself
/// does not compile.
#[cfg(feature = "schema-validation")]
pub fn validate_descriptor_schema(document: &Value, schema: &Value) -> Result<(), Vec<String>> {
    use jsonschema::Validator;

    let validator =
        Validator::new(schema).map_err(|e| vec![format!("Invalid JSON Schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(document)
        .map(|error| format_validation_error(&error))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(not(feature = "schema-validation"))]
pub fn validate_descriptor_schema(_document: &Value, _schema: &Value) -> Result<(), Vec<String>> {
    // Validation disabled - feature not enabled
    Ok(())
}
