//! Inspect command implementation

use std::path::PathBuf;

use crate::cli::error::CliError;
use crate::cli::output::format_descriptor_report;
use crate::descriptor::{Descriptor, inspect};

/// Arguments for the `inspect` command
pub struct InspectArgs {
    pub metadata: PathBuf,
    /// Print the report as JSON
    pub json: bool,
}

/// Handle the `inspect` command
pub fn handle_inspect(args: &InspectArgs) -> Result<(), CliError> {
    let descriptor = Descriptor::from_path(&args.metadata)?;
    let report = inspect(&descriptor);

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::InvalidArgument(format!("Failed to serialize report: {}", e)))?;
        println!("{}", json);
    } else {
        print!("{}", format_descriptor_report(&report));
    }
    Ok(())
}
