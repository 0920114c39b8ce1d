//! Error types for the preview builder.

use fob_preview_config::ConfigError;
use fob_preview_mdx::MdxError;

use crate::diagnostics::ExtractedDiagnostic;

/// Failure of a preview build run.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Unsupported or incomplete configuration, raised before the compiler runs.
    #[error("{0}")]
    Config(String),

    /// The compiler reported errors.
    #[error("Preview compilation failed with {} error(s): {}", errors.len(), format_errors(errors))]
    Compile { errors: Vec<ExtractedDiagnostic> },

    /// Something that must always hold did not.
    #[error("Invariant violation: {0}")]
    Invariant(String),

    /// The run was cancelled before it resolved.
    #[error("Preview build was cancelled")]
    Cancelled,

    /// `start`/`build` was called while another run was in flight.
    #[error("A preview build is already running on this builder")]
    AlreadyRunning,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A preset hook failed.
    #[error("Preset hook '{hook}' failed: {source}")]
    Preset {
        hook: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Mdx(#[from] MdxError),

    #[error(transparent)]
    ConfigLoad(#[from] ConfigError),
}

/// Result type alias for builder operations.
pub type Result<T> = std::result::Result<T, BuildError>;

fn format_errors(errors: &[ExtractedDiagnostic]) -> String {
    match errors {
        [] => "unknown error".to_string(),
        [single] => single.message.clone(),
        many => many
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; "),
    }
}

impl BuildError {
    pub fn preset(hook: &'static str, source: anyhow::Error) -> Self {
        BuildError::Preset { hook, source }
    }

    /// Process exit code this failure maps to.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::Cancelled => 130,
            BuildError::Config(_) | BuildError::ConfigLoad(_) | BuildError::Preset { .. } => 78,
            BuildError::Invariant(_) => 70,
            _ => 1,
        }
    }

    /// Whether the failure ends the run. Only cancellation is not.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, BuildError::Cancelled)
    }

    /// Compiler errors carried by this failure, if any.
    pub fn compile_errors(&self) -> &[ExtractedDiagnostic] {
        match self {
            BuildError::Compile { errors } => errors,
            _ => &[],
        }
    }
}

impl miette::Diagnostic for BuildError {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            BuildError::Config(_) => "PREVIEW_CONFIG",
            BuildError::Compile { .. } => "PREVIEW_COMPILE",
            BuildError::Invariant(_) => "PREVIEW_INVARIANT",
            BuildError::Cancelled => "PREVIEW_CANCELLED",
            BuildError::AlreadyRunning => "PREVIEW_ALREADY_RUNNING",
            BuildError::Io(_) => "IO_ERROR",
            BuildError::Preset { .. } => "PRESET_ERROR",
            BuildError::Mdx(_) => "MDX_ERROR",
            BuildError::ConfigLoad(_) => "CONFIG_LOAD",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self {
            BuildError::Cancelled => miette::Severity::Warning,
            _ => miette::Severity::Error,
        })
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            BuildError::Compile { errors } if errors.len() == 1 => errors[0]
                .help
                .as_ref()
                .map(|h| Box::new(h.clone()) as Box<dyn std::fmt::Display>),
            BuildError::Compile { .. } => Some(Box::new(
                "Multiple compilation errors occurred. See the log above for each one.",
            )),
            BuildError::AlreadyRunning => Some(Box::new(
                "Cancel the active run before starting another one on the same builder.",
            )),
            BuildError::Invariant(_) => Some(Box::new(
                "This is a bug in the preview builder. Please report it with a reproduction.",
            )),
            BuildError::Preset { hook, .. } => Some(Box::new(format!(
                "Check the '{}' entry of your preset configuration.",
                hook
            ))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_lists_every_message() {
        let err = BuildError::Compile {
            errors: vec![
                ExtractedDiagnostic::error("first"),
                ExtractedDiagnostic::error("second"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Preview compilation failed with 2 error(s): first; second"
        );
        assert_eq!(err.compile_errors().len(), 2);
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn cancellation_is_not_fatal() {
        assert!(!BuildError::Cancelled.is_fatal());
        assert!(BuildError::Invariant("x".into()).is_fatal());
        assert_eq!(BuildError::Config("x".into()).exit_code(), 78);
    }
}
