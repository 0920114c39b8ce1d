//! Conversion of mdast nodes into element calls.

mod block;
mod inline;
mod jsx;
mod table;

use anyhow::Result;
use markdown::mdast::Node;

use crate::codegen::{CodegenContext, JsValue, Tag, render_element};

pub use jsx::{attribute_props, is_comment_only};

/// Convert a single node. `None` means the node renders nothing.
pub fn node_to_js(node: &Node, ctx: &mut CodegenContext) -> Result<Option<JsValue>> {
    match node {
        Node::MdxJsxFlowElement(el) => jsx::element_to_js(&el.name, &el.attributes, &el.children, ctx).map(Some),
        Node::MdxJsxTextElement(el) => jsx::element_to_js(&el.name, &el.attributes, &el.children, ctx).map(Some),
        Node::MdxFlowExpression(expr) => Ok(jsx::expression_to_js(&expr.value)),
        Node::MdxTextExpression(expr) => Ok(jsx::expression_to_js(&expr.value)),

        Node::Heading(heading) => block::heading_to_js(heading, ctx).map(Some),
        Node::Paragraph(para) => simple(ctx, "p", &para.children).map(Some),
        Node::Blockquote(quote) => simple(ctx, "blockquote", &quote.children).map(Some),
        Node::ThematicBreak(_) => Ok(Some(render_element(ctx, Tag::Markdown("hr"), vec![], vec![]))),
        Node::Code(code) => Ok(Some(block::code_to_js(code, ctx))),
        Node::List(list) => block::list_to_js(list, ctx).map(Some),
        Node::ListItem(item) => block::list_item_to_js(item, false, ctx).map(Some),

        Node::Text(text) => Ok(Some(JsValue::text(text.value.clone()))),
        Node::InlineCode(code) => Ok(Some(render_element(
            ctx,
            Tag::Markdown("code"),
            vec![],
            vec![JsValue::text(code.value.clone())],
        ))),
        Node::Emphasis(em) => simple(ctx, "em", &em.children).map(Some),
        Node::Strong(strong) => simple(ctx, "strong", &strong.children).map(Some),
        Node::Delete(del) => simple(ctx, "del", &del.children).map(Some),
        Node::Link(link) => inline::link_to_js(link, ctx).map(Some),
        Node::Image(image) => Ok(Some(inline::image_to_js(image, ctx))),
        Node::Break(_) => Ok(Some(render_element(ctx, Tag::Markdown("br"), vec![], vec![]))),
        Node::Math(math) => Ok(Some(inline::math_to_js(&math.value, true, ctx))),
        Node::InlineMath(math) => Ok(Some(inline::math_to_js(&math.value, false, ctx))),
        Node::FootnoteReference(reference) => Ok(Some(inline::footnote_reference_to_js(reference, ctx))),
        Node::FootnoteDefinition(definition) => inline::footnote_definition_to_js(definition, ctx).map(Some),

        Node::Table(table) => table::table_to_js(table, ctx).map(Some),

        // ESM is hoisted by the compiler; frontmatter and definitions render nothing.
        _ => Ok(None),
    }
}

/// Convert children, dropping nodes that render nothing.
pub fn children_to_js(children: &[Node], ctx: &mut CodegenContext) -> Result<Vec<JsValue>> {
    let mut values = Vec::with_capacity(children.len());
    for child in children {
        if let Some(value) = node_to_js(child, ctx)? {
            values.push(value);
        }
    }
    Ok(values)
}

fn simple(ctx: &mut CodegenContext, tag: &str, children: &[Node]) -> Result<JsValue> {
    let children = children_to_js(children, ctx)?;
    Ok(render_element(ctx, Tag::Markdown(tag), vec![], children))
}

/// Concatenated text of a subtree.
pub fn text_content(node: &Node) -> String {
    match node {
        Node::Text(text) => text.value.clone(),
        Node::InlineCode(code) => code.value.clone(),
        Node::InlineMath(math) => math.value.clone(),
        other => other
            .children()
            .map(|children| children.iter().map(text_content).collect())
            .unwrap_or_default(),
    }
}
