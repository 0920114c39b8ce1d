use anyhow::Result;
use markdown::mdast::{AttributeContent, AttributeValue, Node};

use super::children_to_js;
use crate::codegen::{CodegenContext, JsValue, Prop, Tag, render_element};

pub fn element_to_js(
    name: &Option<String>,
    attributes: &[AttributeContent],
    children: &[Node],
    ctx: &mut CodegenContext,
) -> Result<JsValue> {
    let props = attribute_props(attributes);
    let children = children_to_js(children, ctx)?;
    Ok(render_element(ctx, Tag::Jsx(name.as_deref()), props, children))
}

/// Props for JSX attributes. Bare attributes become `true`.
pub fn attribute_props(attributes: &[AttributeContent]) -> Vec<Prop> {
    attributes
        .iter()
        .map(|attr| match attr {
            AttributeContent::Property(prop) => {
                let value = match &prop.value {
                    Some(AttributeValue::Literal(lit)) => crate::codegen::js_string(lit),
                    Some(AttributeValue::Expression(expr)) => expr.value.clone(),
                    None => "true".to_string(),
                };
                Prop::expr(&prop.name, value)
            }
            AttributeContent::Expression(expr) => {
                let spread = expr.value.trim();
                Prop::Spread(spread.strip_prefix("...").unwrap_or(spread).to_string())
            }
        })
        .collect()
}

pub fn expression_to_js(value: &str) -> Option<JsValue> {
    if is_comment_only(value) {
        return None;
    }
    Some(JsValue::raw(format!("({})", value.trim())))
}

/// Whether an expression holds nothing but whitespace and comments.
pub fn is_comment_only(value: &str) -> bool {
    let mut rest = value.trim();
    loop {
        if rest.is_empty() {
            return true;
        }
        if let Some(after) = rest.strip_prefix("/*") {
            match after.find("*/") {
                Some(end) => rest = after[end + 2..].trim_start(),
                None => return false,
            }
        } else if let Some(after) = rest.strip_prefix("//") {
            match after.find('\n') {
                Some(end) => rest = after[end + 1..].trim_start(),
                None => return true,
            }
        } else {
            return false;
        }
    }
}
