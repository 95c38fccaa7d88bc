//! Error types for the CLI

use std::path::PathBuf;

use thiserror::Error;

use crate::convert::FatalError;
use crate::descriptor::DescriptorError;
use crate::mapping::RegistryError;

/// Process exit code when a run completed but some tables failed
pub const EXIT_PARTIAL_FAILURE: u8 = 1;
/// Process exit code when nothing could be processed
pub const EXIT_FATAL: u8 = 2;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to read {0}: {1}")]
    FileReadError(PathBuf, String),

    #[error("Failed to write {0}: {1}")]
    FileWriteError(PathBuf, String),

    #[error("Validation failed:\n{0}")]
    ValidationError(String),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Conversion(#[from] FatalError),
}

impl CliError {
    /// Exit code reported for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            // The document was readable but does not conform
            CliError::ValidationError(_) => EXIT_PARTIAL_FAILURE,
            _ => EXIT_FATAL,
        }
    }
}
