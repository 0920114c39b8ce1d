//! Absolute links open in a new tab.

use anyhow::Result;
use markdown::mdast::{AttributeContent, AttributeValue, MdxJsxAttribute, MdxJsxTextElement, Node};

use super::MdxPlugin;

const TARGET: &str = "_blank";
const REL: &str = "nofollow noopener noreferrer";

/// Rewrites `http://`, `https://` and protocol-relative links into `<a>`
/// elements carrying `target` and `rel`.
#[derive(Debug, Default)]
pub struct ExternalLinksPlugin;

impl ExternalLinksPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl MdxPlugin for ExternalLinksPlugin {
    fn name(&self) -> &'static str {
        "external-links"
    }

    fn transform_ast(&self, ast: &mut Node) -> Result<()> {
        visit(ast);
        Ok(())
    }
}

pub fn is_external(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://") || url.starts_with("//")
}

fn attribute(name: &str, value: &str) -> AttributeContent {
    AttributeContent::Property(MdxJsxAttribute {
        name: name.to_string(),
        value: Some(AttributeValue::Literal(value.to_string())),
    })
}

fn visit(node: &mut Node) {
    if let Some(children) = node.children_mut() {
        for child in children.iter_mut() {
            visit(child);
        }
    }

    if let Node::Link(link) = node {
        if !is_external(&link.url) {
            return;
        }
        let mut attributes = vec![attribute("href", &link.url)];
        if let Some(title) = &link.title {
            attributes.push(attribute("title", title));
        }
        attributes.push(attribute("target", TARGET));
        attributes.push(attribute("rel", REL));

        let element = MdxJsxTextElement {
            name: Some("a".to_string()),
            attributes,
            children: std::mem::take(&mut link.children),
            position: link.position.take(),
        };
        *node = Node::MdxJsxTextElement(element);
    }
}
