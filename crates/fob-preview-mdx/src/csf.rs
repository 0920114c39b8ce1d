//! Story glue for `*.stories.mdx` documents.
//!
//! `<Meta>` at the top level becomes the module's default export and every
//! named `<Story>` becomes a named export. The rendered document is attached as
//! the docs page of the component meta.

use std::collections::HashSet;

use anyhow::{Result, bail};
use markdown::mdast::{AttributeContent, AttributeValue, Node};

use crate::codegen::{CodegenContext, JsValue, Prop, Scope, Tag, is_valid_identifier, js_string, object_literal, render_element};
use crate::nodes::{attribute_props, children_to_js, is_comment_only};

/// Story annotations copied from `<Story>` attributes onto the export.
const STORY_ANNOTATIONS: &[&str] = &["args", "argTypes", "parameters", "decorators", "loaders", "play", "render", "tags"];

#[derive(Debug, Default)]
pub struct CsfDocument {
    pub meta: Option<Vec<Prop>>,
    pub stories: Vec<StoryDef>,
}

#[derive(Debug)]
pub struct StoryDef {
    pub name: String,
    pub export_name: String,
    pub annotations: Vec<(String, String)>,
    pub body: StoryBody,
}

#[derive(Debug)]
pub enum StoryBody {
    /// `{Template.bind({})}`
    Expression(String),
    /// JSX children rendered inside a story function.
    Children(Vec<Node>),
    /// Docs-only story.
    Empty,
}

/// Remove `<Meta>` from the top level and collect every named `<Story>`.
pub fn extract(root: &mut Node) -> Result<CsfDocument> {
    let mut doc = CsfDocument::default();

    if let Node::Root(root) = root {
        let mut kept = Vec::with_capacity(root.children.len());
        for child in std::mem::take(&mut root.children) {
            match &child {
                Node::MdxJsxFlowElement(el) if el.name.as_deref() == Some("Meta") => {
                    if doc.meta.is_some() {
                        tracing::warn!("Multiple <Meta> elements found; using the first one");
                    } else {
                        doc.meta = Some(attribute_props(&el.attributes));
                    }
                }
                _ => kept.push(child),
            }
        }
        root.children = kept;
    }

    let mut seen = HashSet::new();
    collect_stories(root, &mut doc.stories, &mut seen)?;
    Ok(doc)
}

fn collect_stories(node: &Node, stories: &mut Vec<StoryDef>, seen: &mut HashSet<String>) -> Result<()> {
    let element = match node {
        Node::MdxJsxFlowElement(el) if el.name.as_deref() == Some("Story") => Some((&el.attributes, &el.children)),
        Node::MdxJsxTextElement(el) if el.name.as_deref() == Some("Story") => Some((&el.attributes, &el.children)),
        _ => None,
    };

    if let Some((attributes, children)) = element {
        if let Some(story) = story_def(attributes, children)? {
            if !seen.insert(story.export_name.clone()) {
                bail!("Duplicate story name '{}'", story.name);
            }
            stories.push(story);
        }
        return Ok(());
    }

    if let Some(children) = node.children() {
        for child in children {
            collect_stories(child, stories, seen)?;
        }
    }
    Ok(())
}

fn story_def(attributes: &[AttributeContent], children: &[Node]) -> Result<Option<StoryDef>> {
    let mut name = None;
    let mut annotations = Vec::new();

    for attr in attributes {
        let AttributeContent::Property(prop) = attr else { continue };
        match (prop.name.as_str(), &prop.value) {
            ("name", Some(AttributeValue::Literal(value))) => name = Some(value.clone()),
            ("name", _) => bail!("<Story> name must be a string literal"),
            (key, Some(AttributeValue::Expression(expr))) if STORY_ANNOTATIONS.contains(&key) => {
                annotations.push((key.to_string(), expr.value.clone()));
            }
            (key, Some(AttributeValue::Literal(value))) if STORY_ANNOTATIONS.contains(&key) => {
                annotations.push((key.to_string(), js_string(value)));
            }
            _ => {}
        }
    }

    // Without a name the element references a story defined elsewhere.
    let Some(name) = name else { return Ok(None) };

    Ok(Some(StoryDef {
        export_name: story_export_name(&name),
        name,
        annotations,
        body: story_body(children),
    }))
}

fn story_body(children: &[Node]) -> StoryBody {
    let meaningful: Vec<&Node> = children
        .iter()
        .filter(|node| match node {
            Node::Text(text) => !text.value.trim().is_empty(),
            Node::MdxFlowExpression(expr) => !is_comment_only(&expr.value),
            Node::MdxTextExpression(expr) => !is_comment_only(&expr.value),
            _ => true,
        })
        .collect();

    match meaningful.as_slice() {
        [] => StoryBody::Empty,
        [Node::MdxFlowExpression(expr)] => StoryBody::Expression(expr.value.trim().to_string()),
        [Node::MdxTextExpression(expr)] => StoryBody::Expression(expr.value.trim().to_string()),
        [Node::Paragraph(para)] => match para.children.as_slice() {
            [Node::MdxTextExpression(expr)] if !is_comment_only(&expr.value) => {
                StoryBody::Expression(expr.value.trim().to_string())
            }
            _ => StoryBody::Children(children.to_vec()),
        },
        _ => StoryBody::Children(children.to_vec()),
    }
}

/// `"Primary Button"` becomes `primaryButton`.
pub fn story_export_name(name: &str) -> String {
    let words: Vec<String> = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect();

    let mut ident = String::new();
    for (index, word) in words.iter().enumerate() {
        if index == 0 {
            ident.push_str(word);
            continue;
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            ident.extend(first.to_uppercase());
            ident.push_str(chars.as_str());
        }
    }

    if is_valid_identifier(&ident) {
        ident
    } else {
        format!("_{}", ident)
    }
}

/// Named story exports followed by the default component meta export.
pub fn render(doc: &CsfDocument, ctx: &mut CodegenContext) -> Result<String> {
    let mut out = String::new();

    for story in &doc.stories {
        let id = &story.export_name;
        let story_fn = match &story.body {
            StoryBody::Expression(expr) => format!("({})", expr),
            StoryBody::Children(children) => {
                let value = ctx.with_scope(Scope::Module, |ctx| -> Result<JsValue> {
                    let mut values = children_to_js(children, ctx)?;
                    Ok(if values.len() == 1 {
                        values.remove(0)
                    } else {
                        render_element(ctx, Tag::Jsx(None), vec![], values)
                    })
                })?;
                format!("() => {}", value.to_js())
            }
            StoryBody::Empty => "() => {\n  throw new Error(\"Docs-only story\");\n}".to_string(),
        };

        out.push_str(&format!("export const {} = {};\n", id, story_fn));
        out.push_str(&format!("{}.storyName = {};\n", id, js_string(&story.name)));
        for (key, value) in &story.annotations {
            out.push_str(&format!("{}.{} = {};\n", id, key, value));
        }
        if matches!(story.body, StoryBody::Empty) {
            out.push_str(&format!(
                "{}.parameters = Object.assign({{}}, {}.parameters, {{docsOnly: true}});\n",
                id, id
            ));
        }
        out.push('\n');
    }

    let include: Vec<String> = doc.stories.iter().map(|s| js_string(&s.export_name)).collect();
    let mut meta_props: Vec<Prop> = doc
        .meta
        .clone()
        .unwrap_or_default()
        .into_iter()
        .filter(|prop| !matches!(prop, Prop::Pair(key, _) if key == "includeStories"))
        .collect();
    meta_props.push(Prop::expr("includeStories", format!("[{}]", include.join(", "))));

    let name_to_key: Vec<Prop> = doc
        .stories
        .iter()
        .map(|s| Prop::expr(&s.name, js_string(&s.export_name)))
        .collect();

    out.push_str(&format!("const componentMeta = {};\n", object_literal(&meta_props)));
    out.push_str(&format!("const mdxStoryNameToKey = {};\n", object_literal(&name_to_key)));
    out.push_str("componentMeta.parameters = componentMeta.parameters || {};\n");
    out.push_str(
        "componentMeta.parameters.docs = Object.assign({}, componentMeta.parameters.docs, {page: MDXContent, mdxStoryNameToKey});\n",
    );
    out.push_str("export default componentMeta;\n");

    Ok(out)
}
