//! Diagnostic extraction from Rolldown errors.
//!
//! Rolldown reports build problems as batched diagnostics whose structure is
//! not part of its stable API. This module flattens them into
//! [`ExtractedDiagnostic`], a cloneable and serializable record that the
//! lifecycle controller can carry in its failure result and log line by line.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Extracted diagnostic information from Rolldown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDiagnostic {
    pub kind: DiagnosticKind,
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub help: Option<String>,
}

/// Diagnostic kind (mirrors the Rolldown event kinds we care about).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    ParseError,
    UnresolvedEntry,
    UnresolvedImport,
    MissingExport,
    Plugin,
    Other,
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

impl ExtractedDiagnostic {
    /// An error diagnostic with only a message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Other,
            severity: DiagnosticSeverity::Error,
            message: message.into(),
            file: None,
            line: None,
            column: None,
            help: None,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::ParseError => "ParseError",
            DiagnosticKind::UnresolvedEntry => "UnresolvedEntry",
            DiagnosticKind::UnresolvedImport => "UnresolvedImport",
            DiagnosticKind::MissingExport => "MissingExport",
            DiagnosticKind::Plugin => "Plugin",
            DiagnosticKind::Other => "Error",
        };
        f.write_str(name)
    }
}

impl fmt::Display for ExtractedDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, self.line, self.column) {
            (Some(file), Some(line), Some(column)) => {
                write!(f, "{}:{}:{}: {}", file, line, column, self.message)?
            }
            (Some(file), _, _) => write!(f, "{}: {}", file, self.message)?,
            _ => write!(f, "{}", self.message)?,
        }
        if let Some(help) = &self.help {
            write!(f, "\n  help: {}", help)?;
        }
        Ok(())
    }
}

/// Extract diagnostics from a Rolldown error batch.
///
/// Works on the debug representation because the batch type exposes no
/// stable accessors. Every entry in the batch yields one diagnostic.
pub fn extract_from_rolldown_error(error: &dyn fmt::Debug) -> Vec<ExtractedDiagnostic> {
    extract_from_text(&format!("{error:?}"), DiagnosticSeverity::Error)
}

/// Same as [`extract_from_rolldown_error`] for the warnings of a successful build.
pub fn extract_warnings(warnings: &[impl fmt::Debug]) -> Vec<ExtractedDiagnostic> {
    warnings
        .iter()
        .flat_map(|w| extract_from_text(&format!("{w:?}"), DiagnosticSeverity::Warning))
        .collect()
}

fn extract_from_text(text: &str, severity: DiagnosticSeverity) -> Vec<ExtractedDiagnostic> {
    let parts: Vec<&str> = text
        .split("BuildDiagnostic")
        .map(str::trim)
        .filter(|part| part.len() > 2)
        .collect();

    if parts.len() > 1 {
        parts
            .iter()
            .map(|part| extract_single(part, severity))
            .collect()
    } else {
        vec![extract_single(text, severity)]
    }
}

fn extract_single(text: &str, severity: DiagnosticSeverity) -> ExtractedDiagnostic {
    let kind = if text.contains("Parse") || text.contains("Unexpected token") {
        DiagnosticKind::ParseError
    } else if text.contains("UnresolvedEntry") {
        DiagnosticKind::UnresolvedEntry
    } else if text.contains("UnresolvedImport") || text.contains("Could not resolve") {
        DiagnosticKind::UnresolvedImport
    } else if text.contains("MissingExport") {
        DiagnosticKind::MissingExport
    } else if text.contains("Plugin") || text.contains("plugin") {
        DiagnosticKind::Plugin
    } else {
        DiagnosticKind::Other
    };

    let (line, column) = extract_line_column(text);

    ExtractedDiagnostic {
        kind,
        severity,
        message: extract_message(text),
        file: extract_file_path(text),
        line,
        column,
        help: extract_help_text(text),
    }
}

/// The first quoted `message: "..."` field, or the whole text.
fn extract_message(text: &str) -> String {
    for key in ["message: \"", "msg: \""] {
        if let Some(start) = text.find(key) {
            let rest = &text[start + key.len()..];
            let mut escaped = false;
            for (index, c) in rest.char_indices() {
                match c {
                    '\\' if !escaped => escaped = true,
                    '"' if !escaped => return rest[..index].replace("\\n", "\n").replace("\\\"", "\""),
                    _ => escaped = false,
                }
            }
        }
    }
    text.trim().to_string()
}

fn extract_file_path(text: &str) -> Option<String> {
    for ext in [".mdx", ".tsx", ".jsx", ".ts", ".mjs", ".cjs", ".js"] {
        let Some(pos) = text.find(ext) else { continue };
        let before = &text[..pos + ext.len()];
        let start = before
            .rfind(|c: char| c == '"' || c == '\'' || c == ' ' || c == '(')
            .map(|i| i + 1)
            .unwrap_or(0);
        let path = before[start..].trim();
        if !path.is_empty() {
            return Some(path.to_string());
        }
    }
    None
}

/// `file.js:3:7` style locations.
fn extract_line_column(text: &str) -> (Option<u32>, Option<u32>) {
    let bytes = text.as_bytes();
    let mut index = 0;
    while let Some(offset) = text[index..].find(':') {
        let at = index + offset + 1;
        let line: String = text[at..].chars().take_while(char::is_ascii_digit).collect();
        if !line.is_empty() {
            let after = at + line.len();
            if bytes.get(after) == Some(&b':') {
                let column: String = text[after + 1..]
                    .chars()
                    .take_while(char::is_ascii_digit)
                    .collect();
                if !column.is_empty() {
                    return (line.parse().ok(), column.parse().ok());
                }
            }
        }
        index = at;
    }
    (None, None)
}

fn extract_help_text(text: &str) -> Option<String> {
    for indicator in ["help: ", "Help: ", "hint: "] {
        if let Some(pos) = text.find(indicator) {
            let help = text[pos + indicator.len()..]
                .lines()
                .next()
                .unwrap_or("")
                .trim()
                .trim_matches('"');
            if !help.is_empty() {
                return Some(help.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_diagnostic_from_text() {
        #[derive(Debug)]
        #[allow(dead_code)]
        struct Fake {
            kind: &'static str,
            message: &'static str,
        }

        let diags = extract_from_rolldown_error(&Fake {
            kind: "UnresolvedImport",
            message: "Could not resolve './missing' in /src/Button.stories.js:4:18",
        });

        assert_eq!(diags.len(), 1);
        let diag = &diags[0];
        assert_eq!(diag.kind, DiagnosticKind::UnresolvedImport);
        assert_eq!(diag.file.as_deref(), Some("/src/Button.stories.js"));
        assert_eq!(diag.line, Some(4));
        assert_eq!(diag.column, Some(18));
        assert!(diag.message.starts_with("Could not resolve"));
    }

    #[test]
    fn display_includes_location_and_help() {
        let mut diag = ExtractedDiagnostic::error("Unexpected token").with_file("a.js");
        diag.line = Some(1);
        diag.column = Some(2);
        diag.help = Some("remove the stray brace".into());
        assert_eq!(
            diag.to_string(),
            "a.js:1:2: Unexpected token\n  help: remove the stray brace"
        );
    }
}
