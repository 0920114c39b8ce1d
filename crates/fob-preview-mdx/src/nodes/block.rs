use anyhow::Result;
use markdown::mdast::{Code, Heading, List, ListItem, Node};

use super::children_to_js;
use crate::codegen::{CodegenContext, JsValue, Prop, Tag, render_element};

pub fn heading_to_js(heading: &Heading, ctx: &mut CodegenContext) -> Result<JsValue> {
    let tag = format!("h{}", heading.depth.clamp(1, 6));
    let children = children_to_js(&heading.children, ctx)?;
    Ok(render_element(ctx, Tag::Markdown(&tag), vec![], children))
}

pub fn code_to_js(code: &Code, ctx: &mut CodegenContext) -> JsValue {
    let props = match code.lang.as_deref() {
        Some(lang) if !lang.is_empty() => vec![Prop::literal("className", &format!("language-{}", lang))],
        _ => vec![],
    };
    let inner = render_element(
        ctx,
        Tag::Markdown("code"),
        props,
        vec![JsValue::text(format!("{}\n", code.value))],
    );
    render_element(ctx, Tag::Markdown("pre"), vec![], vec![inner])
}

pub fn list_to_js(list: &List, ctx: &mut CodegenContext) -> Result<JsValue> {
    let loose = list.spread
        || list
            .children
            .iter()
            .any(|child| matches!(child, Node::ListItem(item) if item.spread));

    let mut items = Vec::with_capacity(list.children.len());
    for child in &list.children {
        if let Node::ListItem(item) = child {
            items.push(list_item_to_js(item, !loose, ctx)?);
        }
    }

    let tag = if list.ordered { "ol" } else { "ul" };
    let mut props = Vec::new();
    if let Some(start) = list.start.filter(|start| list.ordered && *start != 1) {
        props.push(Prop::expr("start", start.to_string()));
    }
    Ok(render_element(ctx, Tag::Markdown(tag), props, items))
}

/// Tight list items render their paragraphs' contents directly.
pub fn list_item_to_js(item: &ListItem, tight: bool, ctx: &mut CodegenContext) -> Result<JsValue> {
    let mut children = Vec::new();

    if let Some(checked) = item.checked {
        let checkbox = render_element(
            ctx,
            Tag::Markdown("input"),
            vec![
                Prop::literal("type", "checkbox"),
                Prop::expr("checked", checked.to_string()),
                Prop::expr("disabled", "true"),
            ],
            vec![],
        );
        children.push(checkbox);
        children.push(JsValue::text(" "));
    }

    for child in &item.children {
        match child {
            Node::Paragraph(para) if tight => children.extend(children_to_js(&para.children, ctx)?),
            other => children.extend(super::node_to_js(other, ctx)?),
        }
    }

    let props = if item.checked.is_some() {
        vec![Prop::literal("className", "task-list-item")]
    } else {
        vec![]
    };
    Ok(render_element(ctx, Tag::Markdown("li"), props, children))
}
