//! Story specifiers: normalization, glob matching and file discovery.
//!
//! A stories entry is either a bare glob (`../src/**/*.stories.@(js|tsx)`) or an
//! explicit `{ directory, files, title_prefix }` object. Normalization rewrites
//! both forms into a directory relative to the working directory (always
//! starting with `./` or `../`), the file glob, and an anchored regex that
//! matches import paths of the same shape.

use std::path::{Component, Path, PathBuf};

use path_clean::PathClean;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use walkdir::WalkDir;

use crate::error::{ConfigError, Result};

/// File glob used when an entry names a directory.
pub const DEFAULT_FILES_PATTERN: &str = "**/*.@(mdx|stories.@(js|jsx|mjs|ts|tsx))";

/// A stories entry as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoriesEntry {
    Pattern(String),
    Specifier(StoriesSpecifier),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoriesSpecifier {
    pub directory: String,
    #[serde(default)]
    pub files: Option<String>,
    #[serde(default, alias = "titlePrefix")]
    pub title_prefix: Option<String>,
}

/// A stories entry after normalization.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedStoriesSpecifier {
    pub title_prefix: String,
    pub directory: String,
    pub files: String,
    #[serde(serialize_with = "serialize_matcher")]
    pub import_path_matcher: Regex,
}

fn serialize_matcher<S: Serializer>(matcher: &Regex, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(matcher.as_str())
}

impl PartialEq for NormalizedStoriesSpecifier {
    fn eq(&self, other: &Self) -> bool {
        self.title_prefix == other.title_prefix
            && self.directory == other.directory
            && self.files == other.files
            && self.import_path_matcher.as_str() == other.import_path_matcher.as_str()
    }
}

impl NormalizedStoriesSpecifier {
    /// Whether an import path (`./src/Button.stories.js`) belongs to this specifier.
    pub fn matches(&self, import_path: &str) -> bool {
        self.import_path_matcher.is_match(import_path)
    }

    /// Walks the specifier's directory and returns every matching file as an absolute path.
    ///
    /// `node_modules` and hidden directories are skipped. A missing directory yields no files.
    pub fn discover_files(&self, working_dir: &Path) -> Vec<PathBuf> {
        let base = working_dir.join(&self.directory).clean();
        if !base.is_dir() {
            tracing::warn!(directory = %base.display(), "Stories directory does not exist");
            return Vec::new();
        }

        let mut files: Vec<PathBuf> = WalkDir::new(&base)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_ignored_dir(entry))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                let import_path = to_import_path(working_dir, entry.path());
                self.matches(&import_path)
            })
            .map(|entry| entry.into_path())
            .collect();

        files.sort();
        files
    }
}

fn is_ignored_dir(entry: &walkdir::DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name == "node_modules" || name.starts_with('.')
}

/// Normalize stories entries relative to the configuration and working directories.
pub fn normalize_stories(
    entries: &[StoriesEntry],
    config_dir: &Path,
    working_dir: &Path,
) -> Result<Vec<NormalizedStoriesSpecifier>> {
    entries
        .iter()
        .map(|entry| normalize_entry(entry, config_dir, working_dir))
        .collect()
}

fn normalize_entry(
    entry: &StoriesEntry,
    config_dir: &Path,
    working_dir: &Path,
) -> Result<NormalizedStoriesSpecifier> {
    let (directory, files, title_prefix) = match entry {
        StoriesEntry::Pattern(pattern) => {
            let (directory, files) = split_pattern(pattern, config_dir);
            (directory, files, String::new())
        }
        StoriesEntry::Specifier(spec) => (
            spec.directory.clone(),
            spec.files
                .clone()
                .unwrap_or_else(|| DEFAULT_FILES_PATTERN.to_string()),
            spec.title_prefix.clone().unwrap_or_default(),
        ),
    };

    let absolute = config_dir.join(&directory).clean();
    let directory = to_import_path(working_dir, &absolute);
    let glob = format!("{}/{}", directory, files);
    let import_path_matcher = glob_to_regex(&glob).map_err(|message| ConfigError::InvalidStories {
        pattern: glob.clone(),
        message,
    })?;

    Ok(NormalizedStoriesSpecifier {
        title_prefix,
        directory,
        files,
        import_path_matcher,
    })
}

/// Split a bare stories pattern into its static base directory and file glob.
fn split_pattern(pattern: &str, config_dir: &Path) -> (String, String) {
    let segments: Vec<&str> = pattern.split('/').collect();
    if let Some(first_glob) = segments.iter().position(|s| has_glob_syntax(s)) {
        let base = segments[..first_glob].join("/");
        let base = if base.is_empty() { ".".to_string() } else { base };
        return (base, segments[first_glob..].join("/"));
    }

    if config_dir.join(pattern).is_dir() {
        return (
            pattern.trim_end_matches('/').to_string(),
            DEFAULT_FILES_PATTERN.to_string(),
        );
    }

    match pattern.rsplit_once('/') {
        Some((dir, file)) => (
            if dir.is_empty() { ".".to_string() } else { dir.to_string() },
            file.to_string(),
        ),
        None => (".".to_string(), pattern.to_string()),
    }
}

fn has_glob_syntax(segment: &str) -> bool {
    segment.contains(['*', '?', '[', '{', '(', '!'])
}

/// Render a path relative to `working_dir` in import form: `./a/b` or `../a/b`.
pub fn to_import_path(working_dir: &Path, path: &Path) -> String {
    let relative = relative_path(working_dir, path);
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");

    if joined.is_empty() {
        ".".to_string()
    } else if joined.starts_with("..") {
        joined
    } else {
        format!("./{}", joined)
    }
}

fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from_clean = from.clean();
    let to_clean = to.clean();
    let from: Vec<Component> = from_clean.components().collect();
    let to: Vec<Component> = to_clean.components().collect();
    let shared = from.iter().zip(&to).take_while(|(a, b)| a == b).count();

    let mut result = PathBuf::new();
    for _ in shared..from.len() {
        result.push("..");
    }
    for component in &to[shared..] {
        result.push(component.as_os_str());
    }
    result
}

/// Translate a glob into an anchored regular expression.
///
/// Supports `**`, `*`, `?`, character classes, brace alternatives `{a,b}` and
/// the extglob groups `@(..)`, `?(..)`, `*(..)` and `+(..)`. Negated extglobs
/// `!(..)` are rejected.
pub fn glob_to_regex(glob: &str) -> std::result::Result<Regex, String> {
    let chars: Vec<char> = glob.chars().collect();
    let body = translate(&chars)?;
    Regex::new(&format!("^{}$", body)).map_err(|e| e.to_string())
}

fn translate(chars: &[char]) -> std::result::Result<String, String> {
    let mut out = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            '@' | '?' | '+' | '*' | '!' if next == Some('(') => {
                let close = find_close(chars, i + 1, '(', ')')?;
                let group = alternatives(&chars[i + 2..close], '|')?;
                match c {
                    '@' => out.push_str(&format!("(?:{})", group)),
                    '?' => out.push_str(&format!("(?:{})?", group)),
                    '+' => out.push_str(&format!("(?:{})+", group)),
                    '*' => out.push_str(&format!("(?:{})*", group)),
                    _ => return Err("negated extglob patterns are not supported".to_string()),
                }
                i = close + 1;
            }
            '*' if next == Some('*') => {
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:[^/]+/)*");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            '{' => {
                let close = find_close(chars, i, '{', '}')?;
                let group = alternatives(&chars[i + 1..close], ',')?;
                out.push_str(&format!("(?:{})", group));
                i = close + 1;
            }
            '[' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == ']')
                    .map(|p| p + i + 1)
                    .ok_or_else(|| "unterminated character class".to_string())?;
                let mut class: String = chars[i + 1..close].iter().collect();
                if let Some(rest) = class.strip_prefix('!') {
                    class = format!("^{}", rest);
                }
                out.push('[');
                out.push_str(&class.replace('\\', "\\\\"));
                out.push(']');
                i = close + 1;
            }
            '\\' => {
                if let Some(escaped) = next {
                    out.push_str(&regex::escape(&escaped.to_string()));
                }
                i += 2;
            }
            _ => {
                out.push_str(&regex::escape(&c.to_string()));
                i += 1;
            }
        }
    }

    Ok(out)
}

fn find_close(chars: &[char], open_at: usize, open: char, close: char) -> std::result::Result<usize, String> {
    let mut depth = 0usize;
    for (offset, &ch) in chars[open_at..].iter().enumerate() {
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                return Ok(open_at + offset);
            }
        }
    }
    Err(format!("unbalanced '{}' in glob", open))
}

fn alternatives(chars: &[char], separator: char) -> std::result::Result<String, String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (idx, &ch) in chars.iter().enumerate() {
        match ch {
            '(' | '{' => depth += 1,
            ')' | '}' => depth -= 1,
            c if c == separator && depth == 0 => {
                parts.push(translate(&chars[start..idx])?);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(translate(&chars[start..])?);

    Ok(parts.join("|"))
}
