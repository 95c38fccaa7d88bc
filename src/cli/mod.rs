//! CLI module for the croissant-omop binary

pub mod commands;
pub mod error;
pub mod output;

pub use error::CliError;
