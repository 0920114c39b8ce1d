//! CLI error type and its conversion to miette reports.

use fob_preview_builder::BuildError;
use fob_preview_config::ConfigError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}\n\nHint: Check fob-preview.toml or pass --config <path>")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),

    /// The development server could not start or stopped unexpectedly.
    #[error("Server error: {0}")]
    Server(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Build(err) => err.exit_code(),
            CliError::Config(_) => 78,
            CliError::Server(_) | CliError::Io(_) | CliError::Json(_) => 1,
        }
    }
}

/// Build errors keep their own diagnostic codes and help text.
pub fn cli_error_to_miette(err: CliError) -> miette::Report {
    match err {
        CliError::Build(e) => miette::Report::new(e),
        other => miette::miette!("{}", other),
    }
}
