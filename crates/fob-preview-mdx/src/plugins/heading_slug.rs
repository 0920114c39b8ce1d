//! Heading anchors.
//!
//! Every heading gets an `id` derived from its text with the GitHub slug
//! rules: lowercase, punctuation stripped, spaces turned into dashes, and a
//! numeric suffix for repeats within the same document.

use std::collections::HashMap;

use anyhow::Result;
use markdown::mdast::{AttributeContent, AttributeValue, MdxJsxAttribute, MdxJsxFlowElement, Node};

use super::MdxPlugin;
use crate::nodes::text_content;

#[derive(Debug, Default)]
pub struct HeadingSlugPlugin;

impl HeadingSlugPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl MdxPlugin for HeadingSlugPlugin {
    fn name(&self) -> &'static str {
        "heading-slug"
    }

    fn transform_ast(&self, ast: &mut Node) -> Result<()> {
        let mut slugger = Slugger::default();
        visit(ast, &mut slugger);
        Ok(())
    }
}

fn visit(node: &mut Node, slugger: &mut Slugger) {
    if let Node::Heading(heading) = node {
        let text: String = heading.children.iter().map(text_content).collect();
        let element = MdxJsxFlowElement {
            name: Some(format!("h{}", heading.depth.clamp(1, 6))),
            attributes: vec![AttributeContent::Property(MdxJsxAttribute {
                name: "id".to_string(),
                value: Some(AttributeValue::Literal(slugger.slug(&text))),
            })],
            children: std::mem::take(&mut heading.children),
            position: heading.position.take(),
        };
        *node = Node::MdxJsxFlowElement(element);
        return;
    }

    if let Some(children) = node.children_mut() {
        for child in children {
            visit(child, slugger);
        }
    }
}

/// Per-document slug generator.
#[derive(Debug, Default)]
pub struct Slugger {
    seen: HashMap<String, usize>,
}

impl Slugger {
    pub fn slug(&mut self, text: &str) -> String {
        let base: String = text
            .trim()
            .to_lowercase()
            .chars()
            .filter_map(|c| match c {
                ' ' => Some('-'),
                '-' | '_' => Some(c),
                c if c.is_alphanumeric() => Some(c),
                _ => None,
            })
            .collect();

        let mut slug = base.clone();
        while let Some(count) = self.seen.get_mut(&slug) {
            *count += 1;
            slug = format!("{}-{}", base, count);
        }
        self.seen.insert(slug.clone(), 0);
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_follow_github_rules() {
        let mut slugger = Slugger::default();
        assert_eq!(slugger.slug("Hello World!"), "hello-world");
        assert_eq!(slugger.slug("Hello World"), "hello-world-1");
        assert_eq!(slugger.slug("Hello World"), "hello-world-2");
        assert_eq!(slugger.slug("C++ & Rust_lang"), "c--rust_lang");
    }

    #[test]
    fn headings_become_elements_with_ids() {
        let mut ast = crate::compile::parse("# Intro\n\n## Intro", &crate::MdxCompileOptions::default()).unwrap();
        HeadingSlugPlugin::new().transform_ast(&mut ast).unwrap();

        let Node::Root(root) = &ast else { panic!("expected root") };
        let ids: Vec<String> = root
            .children
            .iter()
            .filter_map(|node| match node {
                Node::MdxJsxFlowElement(el) => match &el.attributes[0] {
                    AttributeContent::Property(prop) => match &prop.value {
                        Some(AttributeValue::Literal(id)) => Some(id.clone()),
                        _ => None,
                    },
                    _ => None,
                },
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["intro".to_string(), "intro-1".to_string()]);
    }
}
