//! Convert command implementation

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::cli::output::format_conversion_summary;
use crate::convert::{ConversionOptions, ConversionResult, Converter, OutputFormat};
use crate::export::SqlDialect;
use crate::mapping::RequiredFieldRegistry;

/// Arguments for the `convert` command
pub struct ConvertArgs {
    /// Descriptor file
    pub metadata: PathBuf,
    /// Output directory
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    /// Skip validation
    pub no_validate: bool,
    pub dialect: SqlDialect,
    pub batch_size: usize,
    /// Directory for relative distribution locations
    pub base_path: Option<PathBuf>,
    /// Check foreign keys across converted tables
    pub check_references: bool,
    /// Required-field registry file
    pub registry: Option<PathBuf>,
    /// Merge the registry file into the built-in OMOP registry
    pub extend_registry: bool,
    /// Write the run result as JSON
    pub report: Option<PathBuf>,
    pub verbose: bool,
}

/// Build the registry selected by the arguments
fn load_registry(args: &ConvertArgs) -> Result<RequiredFieldRegistry, CliError> {
    let Some(path) = &args.registry else {
        if args.extend_registry {
            return Err(CliError::InvalidArgument(
                "--extend-registry requires --registry".to_string(),
            ));
        }
        return Ok(RequiredFieldRegistry::omop());
    };

    let loaded = RequiredFieldRegistry::from_toml_file(path)?;
    if args.extend_registry {
        let mut registry = RequiredFieldRegistry::omop();
        registry.extend(loaded);
        Ok(registry)
    } else {
        Ok(loaded)
    }
}

/// Handle the `convert` command
pub fn handle_convert(args: &ConvertArgs) -> Result<ConversionResult, CliError> {
    let registry = load_registry(args)?;

    let mut options = ConversionOptions::new()
        .with_output_format(args.format)
        .with_validate(!args.no_validate)
        .with_dialect(args.dialect)
        .with_batch_size(args.batch_size)
        .with_check_references(args.check_references);
    if let Some(base) = &args.base_path {
        options = options.with_base_path(base);
    }

    if args.verbose {
        eprintln!("Converting {}", args.metadata.display());
        eprintln!("  Output: {}", args.output_dir.display());
        eprintln!("  Format: {}", args.format);
        eprintln!("  Dialect: {}", args.dialect);
        eprintln!("  Registry tables: {}", registry.len());
    }

    let result = Converter::with_registry(registry).convert(
        &args.metadata,
        &args.output_dir,
        &options,
    )?;

    print!("{}", format_conversion_summary(&result));

    if let Some(report_path) = &args.report {
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError::FileWriteError(report_path.clone(), e.to_string()))?;
        std::fs::write(report_path, json)
            .map_err(|e| CliError::FileWriteError(report_path.clone(), e.to_string()))?;
        if args.verbose {
            eprintln!("Report written to {}", report_path.display());
        }
    }

    Ok(result)
}
