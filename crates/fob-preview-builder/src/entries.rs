//! Generated entry modules served through the virtual module plugin.
//!
//! - `./storybook-stories.js` exports `importFn(path)`, dispatching a story
//!   import path to the first specifier whose matcher accepts it.
//! - `./storybook-config-entry.js` imports the stories module and every
//!   preview annotation and boots the preview runtime.

use fob_preview_config::NormalizedStoriesSpecifier;

use crate::error::{BuildError, Result};

/// Virtual path of the dispatch module.
pub const STORIES_FILENAME: &str = "./storybook-stories.js";

/// Virtual path of the runtime entry.
pub const CONFIG_ENTRY_PATH: &str = "./storybook-config-entry.js";

const CONFIG_ENTRY_TEMPLATE: &str = include_str!("../templates/config-entry.js.jinja");

/// Render a Rust regex source as a JavaScript regex literal.
///
/// Only unescaped `/` needs escaping; everything `glob_to_regex` emits is
/// valid in both dialects.
pub fn js_regex_literal(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + 2);
    out.push('/');
    let mut escaped = false;
    for c in source.chars() {
        if c == '/' && !escaped {
            out.push('\\');
        }
        escaped = c == '\\' && !escaped;
        out.push(c);
    }
    out.push('/');
    out
}

/// Escape text for a single-quoted JavaScript string.
fn js_single_quoted(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}

fn import_fn_part(specifier: &NormalizedStoriesSpecifier) -> String {
    let directory = js_single_quoted(&specifier.directory);
    format!(
        "  async (path) => {{\n    if (!{matcher}.exec(path)) {{\n      return;\n    }}\n\n    const pathRemainder = path.substring({offset});\n    return import('{directory}/' + pathRemainder.replace('.mdx', '.js'));\n  }}",
        matcher = js_regex_literal(specifier.import_path_matcher.as_str()),
        offset = specifier.directory.chars().count() + 1,
        directory = directory,
    )
}

/// Source of the `importFn` dispatch module.
///
/// Importers are tried in specifier order; the first one returning module
/// exports wins and later importers are never invoked.
pub fn to_import_fn(stories: &[NormalizedStoriesSpecifier]) -> String {
    let importers = stories
        .iter()
        .map(import_fn_part)
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "const pipeline = (x) => x();\n\nconst importers = [\n{importers}\n];\n\nexport async function importFn(path) {{\n  for (let i = 0; i < importers.length; i++) {{\n    const moduleExports = await pipeline(() => importers[i](path));\n    if (moduleExports) {{\n      return moduleExports;\n    }}\n  }}\n}}\n"
    )
}

/// Source of the runtime entry. Backslashes are doubled afterwards so Windows
/// paths survive as string literals.
pub fn config_entry(stories_filename: &str, preview_annotations: &[String]) -> Result<String> {
    let env = minijinja::Environment::new();
    let rendered = env
        .render_str(
            CONFIG_ENTRY_TEMPLATE,
            minijinja::context! {
                stories_filename => stories_filename,
                preview_annotations => preview_annotations,
            },
        )
        .map_err(|e| BuildError::Config(format!("Failed to render preview entry: {}", e)))?;

    Ok(rendered.replace('\\', "\\\\"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fob_preview_config::{StoriesEntry, normalize_stories};
    use std::path::Path;

    /// Where the generated `importFn(path)` sends an import: the index of the
    /// answering specifier and the module it imports.
    fn route_import(stories: &[NormalizedStoriesSpecifier], path: &str) -> Option<(usize, String)> {
        stories.iter().enumerate().find_map(|(index, specifier)| {
            if !specifier.matches(path) {
                return None;
            }
            let remainder: String = path.chars().skip(specifier.directory.chars().count() + 1).collect();
            Some((
                index,
                format!("{}/{}", specifier.directory, remainder.replacen(".mdx", ".js", 1)),
            ))
        })
    }

    fn two_specifiers() -> Vec<NormalizedStoriesSpecifier> {
        normalize_stories(
            &[
                StoriesEntry::Pattern("../src/*.stories.js".into()),
                StoriesEntry::Pattern("../lib/*.stories.js".into()),
            ],
            Path::new("/project/.storybook"),
            Path::new("/project"),
        )
        .unwrap()
    }

    #[test]
    fn dispatch_goes_to_first_directory_only() {
        let stories = two_specifiers();

        let (index, module) = route_import(&stories, "./src/Button.stories.js").unwrap();
        assert_eq!(index, 0);
        assert_eq!(module, "./src/Button.stories.js");

        let (index, _) = route_import(&stories, "./lib/Card.stories.js").unwrap();
        assert_eq!(index, 1);

        assert!(route_import(&stories, "./other/X.stories.js").is_none());
    }

    #[test]
    fn dispatch_module_has_one_importer_per_specifier() {
        let stories = two_specifiers();
        let code = to_import_fn(&stories);

        assert!(code.starts_with("const pipeline = (x) => x();"));
        assert_eq!(code.matches("async (path) =>").count(), 2);
        assert!(code.contains("path.substring(6)"));
        assert!(code.contains("return import('./src/' + pathRemainder.replace('.mdx', '.js'));"));
        assert!(code.contains("return import('./lib/' + pathRemainder.replace('.mdx', '.js'));"));
        assert!(code.contains("export async function importFn(path)"));

        let first = code.find("./src/").unwrap();
        let second = code.find("./lib/").unwrap();
        assert!(first < second);
    }

    #[test]
    fn mdx_imports_are_rewritten_to_js() {
        let stories = normalize_stories(
            &[StoriesEntry::Pattern("../docs/*.mdx".into())],
            Path::new("/p/.storybook"),
            Path::new("/p"),
        )
        .unwrap();
        let (_, module) = route_import(&stories, "./docs/intro.mdx").unwrap();
        assert_eq!(module, "./docs/intro.js");
    }

    #[test]
    fn slashes_are_escaped_in_js_regex() {
        assert_eq!(js_regex_literal("^\\./src/a$"), "/^\\.\\/src\\/a$/");
        assert_eq!(js_regex_literal("a\\/b"), "/a\\/b/");
        assert_eq!(js_regex_literal("[^/]*"), "/[^\\/]*/");
    }

    #[test]
    fn config_entry_imports_stories_and_annotations() {
        let entry = config_entry(
            STORIES_FILENAME,
            &["@storybook/react/preview".into(), "C:\\proj\\.storybook\\preview.js".into()],
        )
        .unwrap();

        assert!(entry.contains("import { importFn } from './storybook-stories.js';"));
        assert!(entry.contains("import('@storybook/react/preview'),"));
        assert!(entry.contains("import('C:\\\\proj\\\\.storybook\\\\preview.js'),"));
        assert!(entry.contains("preview.initialize({ importFn, getProjectAnnotations });"));
    }
}
