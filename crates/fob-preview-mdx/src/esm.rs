//! Hoisting of `import` / `export` blocks and the names they bind.

use std::collections::HashSet;

use markdown::MdxSignal;
use markdown::mdast::Node;

/// ESM found at the top level of a document.
#[derive(Debug, Default)]
pub struct EsmBlocks {
    /// Statements emitted verbatim ahead of the generated code.
    pub statements: Vec<String>,
    /// Names bound by those statements.
    pub bindings: HashSet<String>,
}

pub fn collect_esm(root: &Node) -> EsmBlocks {
    let mut blocks = EsmBlocks::default();
    let Some(children) = root.children() else {
        return blocks;
    };

    for child in children {
        let Node::MdxjsEsm(esm) = child else { continue };

        for statement in split_statements(&esm.value) {
            if statement.starts_with("export default") {
                tracing::warn!(
                    statement = %statement,
                    "Ignoring default export in MDX; the compiler generates its own"
                );
                continue;
            }
            blocks.bindings.extend(bound_names(&statement));
            blocks.statements.push(statement);
        }
    }

    blocks
}

/// ESM check handed to the markdown parser.
///
/// Only structure is checked: strings, template literals and comments must be
/// terminated and brackets balanced. An unterminated block reports `Eof` so
/// the parser keeps reading past the next blank line.
pub fn validate_esm(code: &str) -> MdxSignal {
    let mut stack: Vec<char> = Vec::new();
    let mut chars = code.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            '"' | '\'' | '`' => {
                let mut closed = false;
                while let Some((_, next)) = chars.next() {
                    if next == '\\' {
                        chars.next();
                    } else if next == c {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return eof("Unterminated string in ESM");
                }
            }
            '/' if matches!(chars.peek(), Some((_, '/'))) => {
                for (_, next) in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                let mut previous = ' ';
                let mut closed = false;
                for (_, next) in chars.by_ref() {
                    if previous == '*' && next == '/' {
                        closed = true;
                        break;
                    }
                    previous = next;
                }
                if !closed {
                    return eof("Unterminated comment in ESM");
                }
            }
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(expected) {
                    return MdxSignal::Error(
                        format!("Invalid ESM syntax: unexpected `{}`", c),
                        offset,
                        Box::new("fob-preview-mdx".to_string()),
                        Box::new("esm".to_string()),
                    );
                }
            }
            _ => {}
        }
    }

    if stack.is_empty() {
        MdxSignal::Ok
    } else {
        eof("Unexpected end of ESM block")
    }
}

fn eof(message: &str) -> MdxSignal {
    MdxSignal::Eof(
        message.to_string(),
        Box::new("fob-preview-mdx".to_string()),
        Box::new("esm".to_string()),
    )
}

/// Split an ESM block into statements. A new statement starts on any line
/// beginning with `import` or `export`; other lines continue the previous one.
fn split_statements(code: &str) -> Vec<String> {
    let mut statements: Vec<String> = Vec::new();

    for line in code.lines() {
        let trimmed = line.trim_start();
        let starts_statement = trimmed.starts_with("import ")
            || trimmed.starts_with("import{")
            || trimmed.starts_with("export ")
            || trimmed.starts_with("export{");

        match statements.last_mut() {
            Some(current) if !starts_statement => {
                current.push('\n');
                current.push_str(line);
            }
            _ if trimmed.is_empty() => {}
            _ => statements.push(line.to_string()),
        }
    }

    statements.into_iter().map(|s| s.trim().to_string()).collect()
}

/// Names a single statement binds in module scope.
pub fn bound_names(statement: &str) -> Vec<String> {
    let normalized: String = statement.split_whitespace().collect::<Vec<_>>().join(" ");

    if let Some(rest) = normalized.strip_prefix("import") {
        return imported_names(rest.trim_start());
    }
    if let Some(rest) = normalized.strip_prefix("export ") {
        return exported_names(rest);
    }
    Vec::new()
}

fn imported_names(clause: &str) -> Vec<String> {
    // Side-effect imports bind nothing.
    if clause.starts_with('"') || clause.starts_with('\'') {
        return Vec::new();
    }
    let Some(from) = clause.rfind(" from") else {
        return Vec::new();
    };
    let clause = clause[..from].trim();
    let mut names = Vec::new();

    let (default_part, named_part) = match clause.find('{') {
        Some(open) => {
            let close = clause.rfind('}').unwrap_or(clause.len());
            (&clause[..open], Some(&clause[open + 1..close]))
        }
        None => (clause, None),
    };

    for part in default_part.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.strip_prefix("* as ") {
            Some(namespace) => names.push(namespace.trim().to_string()),
            None => names.push(part.to_string()),
        }
    }

    if let Some(named) = named_part {
        for item in named.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let local = item.rsplit(" as ").next().unwrap_or(item).trim();
            names.push(local.to_string());
        }
    }

    names
}

fn exported_names(rest: &str) -> Vec<String> {
    const DECLARATIONS: &[&str] = &["const ", "let ", "var ", "function* ", "function ", "async function ", "class "];

    for keyword in DECLARATIONS {
        if let Some(after) = rest.strip_prefix(keyword) {
            if keyword.starts_with("const") || keyword.starts_with("let") || keyword.starts_with("var") {
                return declared_variables(after);
            }
            let name: String = after
                .trim_start()
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
                .collect();
            return if name.is_empty() { Vec::new() } else { vec![name] };
        }
    }
    Vec::new()
}

/// `a = 1, b = 2` binds `a` and `b`. Destructuring patterns are skipped.
fn declared_variables(after: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut depth = 0i32;
    let mut expect_name = true;

    let mut chars = after.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '(' | '[' | '{' => {
                depth += 1;
                expect_name = false;
            }
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => expect_name = true,
            ';' if depth == 0 => break,
            c if expect_name && depth == 0 && (c.is_alphabetic() || c == '_' || c == '$') => {
                let mut name = c.to_string();
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' || next == '$' {
                        name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                names.push(name);
                expect_name = false;
            }
            _ => {}
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_forms() {
        assert_eq!(bound_names("import Button from './Button'"), vec!["Button"]);
        assert_eq!(
            bound_names("import { Meta, Story as S } from '@storybook/addon-docs'"),
            vec!["Meta", "S"]
        );
        assert_eq!(bound_names("import React, { useState } from 'react'"), vec!["React", "useState"]);
        assert_eq!(bound_names("import * as UI from './ui'"), vec!["UI"]);
        assert!(bound_names("import './styles.css'").is_empty());
    }

    #[test]
    fn multi_line_import() {
        let names = bound_names("import {\n  Canvas,\n  Story,\n} from '@storybook/addon-docs';");
        assert_eq!(names, vec!["Canvas", "Story"]);
    }

    #[test]
    fn export_forms() {
        assert_eq!(bound_names("export const Template = (args) => null;"), vec!["Template"]);
        assert_eq!(bound_names("export const a = 1, b = { c: 2 };"), vec!["a", "b"]);
        assert_eq!(bound_names("export function Demo() {}"), vec!["Demo"]);
        assert!(bound_names("export { x } from './x'").is_empty());
    }

    #[test]
    fn validator_reports_structure() {
        assert!(matches!(validate_esm("import { a } from 'b'"), MdxSignal::Ok));
        assert!(matches!(validate_esm("export const x = '}'; // )"), MdxSignal::Ok));
        assert!(matches!(validate_esm("export const x = {"), MdxSignal::Eof(..)));
        assert!(matches!(validate_esm("export const x = 1)"), MdxSignal::Error(..)));
    }

    #[test]
    fn statements_are_split_and_default_export_dropped() {
        let ast = crate::compile::parse(
            "import A from './a'\nimport {\n  B,\n} from './b'\nexport default Layout\n\n# Hi",
            &crate::MdxCompileOptions::default(),
        )
        .unwrap();
        let blocks = collect_esm(&ast);
        assert_eq!(blocks.statements.len(), 2);
        assert!(blocks.bindings.contains("A"));
        assert!(blocks.bindings.contains("B"));
    }
}
