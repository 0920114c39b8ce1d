use anyhow::Result;
use markdown::mdast::{FootnoteDefinition, FootnoteReference, Image, Link};

use super::children_to_js;
use crate::codegen::{CodegenContext, JsValue, Prop, Tag, render_element};

pub fn link_to_js(link: &Link, ctx: &mut CodegenContext) -> Result<JsValue> {
    let mut props = vec![Prop::literal("href", &link.url)];
    if let Some(title) = &link.title {
        props.push(Prop::literal("title", title));
    }
    let children = children_to_js(&link.children, ctx)?;
    Ok(render_element(ctx, Tag::Markdown("a"), props, children))
}

pub fn image_to_js(image: &Image, ctx: &mut CodegenContext) -> JsValue {
    let mut props = vec![Prop::literal("src", &image.url), Prop::literal("alt", &image.alt)];
    if let Some(title) = &image.title {
        props.push(Prop::literal("title", title));
    }
    render_element(ctx, Tag::Markdown("img"), props, vec![])
}

pub fn math_to_js(value: &str, display: bool, ctx: &mut CodegenContext) -> JsValue {
    let class = if display { "math math-display" } else { "math math-inline" };
    render_element(
        ctx,
        Tag::Markdown("span"),
        vec![Prop::literal("className", class)],
        vec![JsValue::text(value)],
    )
}

pub fn footnote_reference_to_js(reference: &FootnoteReference, ctx: &mut CodegenContext) -> JsValue {
    let id = &reference.identifier;
    let label = reference.label.as_deref().unwrap_or(id);
    let link = render_element(
        ctx,
        Tag::Markdown("a"),
        vec![
            Prop::literal("href", &format!("#user-content-fn-{}", id)),
            Prop::literal("id", &format!("user-content-fnref-{}", id)),
            Prop::expr("dataFootnoteRef", "true"),
        ],
        vec![JsValue::text(label)],
    );
    render_element(ctx, Tag::Markdown("sup"), vec![], vec![link])
}

pub fn footnote_definition_to_js(
    definition: &FootnoteDefinition,
    ctx: &mut CodegenContext,
) -> Result<JsValue> {
    let id = &definition.identifier;
    let mut children = children_to_js(&definition.children, ctx)?;
    let back = render_element(
        ctx,
        Tag::Markdown("a"),
        vec![
            Prop::literal("href", &format!("#user-content-fnref-{}", id)),
            Prop::expr("dataFootnoteBackref", "true"),
        ],
        vec![JsValue::text("\u{21a9}")],
    );
    children.push(back);
    Ok(render_element(
        ctx,
        Tag::Markdown("section"),
        vec![
            Prop::literal("id", &format!("user-content-fn-{}", id)),
            Prop::expr("dataFootnotes", "true"),
        ],
        children,
    ))
}
