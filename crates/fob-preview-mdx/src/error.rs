//! Compilation errors with file and location context.

use serde::{Deserialize, Serialize};
use std::fmt;

/// MDX compilation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MdxError {
    pub message: String,
    pub file: Option<String>,
    /// 1-indexed
    pub line: Option<usize>,
    /// 1-indexed
    pub column: Option<usize>,
    pub suggestion: Option<String>,
}

impl MdxError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            file: None,
            line: None,
            column: None,
            suggestion: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_location(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach the file path when one is known.
    pub fn in_file(self, file: Option<&str>) -> Self {
        match file {
            Some(file) => self.with_file(file),
            None => self,
        }
    }

    /// Parser failures render as `line:column: reason`; the location is lifted out when present.
    pub fn parse_error(message: String) -> Self {
        let location = message.split_once(": ").and_then(|(place, _)| {
            let (line, column) = place.split_once(':')?;
            let column = column.split(['-', ' ']).next()?;
            Some((line.parse::<usize>().ok()?, column.parse::<usize>().ok()?))
        });

        let err = Self::new(format!("Failed to parse MDX: {}", message)).with_suggestion(
            "Check your MDX syntax. Ensure all JSX tags are properly closed and expressions are valid.",
        );
        match location {
            Some((line, column)) => err.with_location(line, column),
            None => err,
        }
    }

    pub fn conversion_error(err: &anyhow::Error) -> Self {
        Self::new(format!("Failed to convert MDX to JSX: {:#}", err))
    }

    pub fn plugin_error(plugin: &str, err: &anyhow::Error) -> Self {
        Self::new(format!("Plugin '{}' failed: {:#}", plugin, err))
    }
}

impl fmt::Display for MdxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MDX Error: {}", self.message)?;

        if let Some(ref file) = self.file {
            write!(f, "\n  in {}", file)?;
        }

        if let (Some(line), Some(col)) = (self.line, self.column) {
            write!(f, "\n  at line {}, column {}", line, col)?;
        }

        if let Some(ref suggestion) = self.suggestion {
            write!(f, "\nhelp: {}", suggestion)?;
        }

        Ok(())
    }
}

impl std::error::Error for MdxError {}
