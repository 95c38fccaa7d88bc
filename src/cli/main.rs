//! croissant-omop command line

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use croissant_omop::cli::commands::convert::{ConvertArgs, handle_convert};
use croissant_omop::cli::commands::inspect::{InspectArgs, handle_inspect};
use croissant_omop::cli::commands::validate::{ValidateArgs, handle_validate};
use croissant_omop::cli::CliError;
use croissant_omop::cli::error::{EXIT_FATAL, EXIT_PARTIAL_FAILURE};
use croissant_omop::convert::OutputFormat;
use croissant_omop::export::SqlDialect;

#[derive(Parser)]
#[command(name = "croissant-omop")]
#[command(about = "Convert Bio-Croissant datasets to OMOP CDM tables", long_about = None)]
#[command(version)]
struct Cli {
    /// Log debug events to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a descriptor and its files into OMOP CDM output
    Convert {
        /// Bio-Croissant metadata file
        metadata: PathBuf,
        /// Directory for output files
        output_dir: PathBuf,
        /// Output format: csv, sql or both
        #[arg(long, default_value = "csv")]
        format: OutputFormat,
        /// Skip validation
        #[arg(long)]
        no_validate: bool,
        /// SQL dialect: postgresql, mysql or sqlite (does not change output)
        #[arg(long, default_value = "postgresql")]
        dialect: SqlDialect,
        /// Rows per INSERT statement
        #[arg(long, default_value_t = 100)]
        batch_size: usize,
        /// Base directory for relative file locations (default: current directory)
        #[arg(long)]
        base_path: Option<PathBuf>,
        /// Check foreign keys between converted tables
        #[arg(long)]
        check_references: bool,
        /// TOML file with required fields per table
        #[arg(long)]
        registry: Option<PathBuf>,
        /// Add the registry file to the built-in OMOP tables instead of replacing them
        #[arg(long, requires = "registry")]
        extend_registry: bool,
        /// Write the run result as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Summarise descriptor contents and ISO 11179 metadata coverage
    Inspect {
        /// Bio-Croissant metadata file
        metadata: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check that a descriptor parses and, optionally, conforms to a JSON Schema
    Validate {
        /// Bio-Croissant metadata file, or - for stdin
        metadata: String,
        /// JSON Schema file
        #[arg(long)]
        schema: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Commands::Convert {
            metadata,
            output_dir,
            format,
            no_validate,
            dialect,
            batch_size,
            base_path,
            check_references,
            registry,
            extend_registry,
            report,
        } => {
            let args = ConvertArgs {
                metadata,
                output_dir,
                format,
                no_validate,
                dialect,
                batch_size,
                base_path,
                check_references,
                registry,
                extend_registry,
                report,
                verbose: cli.verbose,
            };
            let result = handle_convert(&args)
                .with_context(|| format!("Conversion of {} failed", args.metadata.display()))?;
            Ok(if result.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_PARTIAL_FAILURE)
            })
        }
        Commands::Inspect { metadata, json } => {
            handle_inspect(&InspectArgs { metadata, json })?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { metadata, schema } => {
            handle_validate(&ValidateArgs { metadata, schema })?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<CliError>()
                .map(CliError::exit_code)
                .unwrap_or(EXIT_FATAL);
            ExitCode::from(code)
        }
    }
}
