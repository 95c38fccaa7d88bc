//! Validate command implementation

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::cli::error::CliError;
use crate::descriptor::Descriptor;
use crate::validation::validate_descriptor_schema;

/// Arguments for the `validate` command
pub struct ValidateArgs {
    /// Descriptor file, or `-` for stdin
    pub metadata: String,
    /// JSON Schema to check the descriptor against
    pub schema: Option<PathBuf>,
}

/// Load input content from file or stdin
fn load_input(input: &str) -> Result<String, CliError> {
    if input == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| CliError::InvalidArgument(format!("Failed to read stdin: {}", e)))?;
        Ok(content)
    } else {
        let path = PathBuf::from(input);
        std::fs::read_to_string(&path).map_err(|e| CliError::FileReadError(path, e.to_string()))
    }
}

fn load_json(path: &Path) -> Result<serde_json::Value, CliError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::FileReadError(path.to_path_buf(), e.to_string()))?;
    serde_json::from_str(&content)
        .map_err(|e| CliError::FileReadError(path.to_path_buf(), e.to_string()))
}

/// Handle the `validate` command.
///
/// The descriptor must parse into the descriptor model; with `--schema`
/// it must also conform to the given JSON Schema.
pub fn handle_validate(args: &ValidateArgs) -> Result<(), CliError> {
    let content = load_input(&args.metadata)?;
    let document: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| CliError::ValidationError(format!("Invalid JSON: {}", e)))?;

    if let Some(schema_path) = &args.schema {
        let schema = load_json(schema_path)?;
        validate_descriptor_schema(&document, &schema)
            .map_err(|errors| CliError::ValidationError(errors.join("\n")))?;
    }

    let descriptor = Descriptor::from_value(document)
        .map_err(|e| CliError::ValidationError(e.to_string()))?;

    println!(
        "Validation successful: {} record set(s), {} distribution(s)",
        descriptor.record_sets.len(),
        descriptor.distributions.len()
    );
    Ok(())
}
