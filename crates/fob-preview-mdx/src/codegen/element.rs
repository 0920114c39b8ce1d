//! Element call rendering for both JSX flavors.

use super::context::{CodegenContext, JsxFlavor, Tag};
use super::escape::{js_string, property_key};
use super::js_value::{JsValue, merge_text};

/// One entry of a props object literal.
#[derive(Debug, Clone)]
pub enum Prop {
    /// `key: value`, where value is JavaScript.
    Pair(String, String),
    /// `...expr`
    Spread(String),
}

impl Prop {
    pub fn literal(key: &str, value: &str) -> Self {
        Prop::Pair(key.to_string(), js_string(value))
    }

    pub fn expr(key: &str, value: impl Into<String>) -> Self {
        Prop::Pair(key.to_string(), value.into())
    }

    fn to_js(&self) -> String {
        match self {
            Prop::Pair(key, value) => format!("{}: {}", property_key(key), value),
            Prop::Spread(expr) => format!("...{}", expr),
        }
    }
}

/// `{a: 1, "b-c": x, ...rest}`
pub fn object_literal(props: &[Prop]) -> String {
    let entries: Vec<String> = props.iter().map(Prop::to_js).collect();
    format!("{{{}}}", entries.join(", "))
}

/// Render an element call.
///
/// Automatic: `_jsx(tag, {...props, children})`, switching to `_jsxs` for
/// several children. Classic: `mdx(tag, props, ...children)` with `mdxType` on
/// components.
pub fn render_element(
    ctx: &mut CodegenContext,
    tag: Tag<'_>,
    mut props: Vec<Prop>,
    children: Vec<JsValue>,
) -> JsValue {
    let (tag_expr, mdx_type) = ctx.resolve_tag(tag);
    let children = merge_text(children);

    match ctx.flavor {
        JsxFlavor::Automatic => {
            let callee = if children.len() > 1 { "_jsxs" } else { "_jsx" };
            match children.len() {
                0 => {}
                1 => props.push(Prop::expr("children", children[0].to_js())),
                _ => {
                    let items: Vec<String> = children.iter().map(JsValue::to_js).collect();
                    props.push(Prop::expr("children", format!("[{}]", items.join(", "))));
                }
            }
            JsValue::raw(format!("{}({}, {})", callee, tag_expr, object_literal(&props)))
        }
        JsxFlavor::Classic => {
            if let Some(name) = mdx_type {
                props.push(Prop::literal("mdxType", &name));
            }
            let props_js = if props.is_empty() {
                "null".to_string()
            } else {
                object_literal(&props)
            };
            let mut args = vec![tag_expr, props_js];
            args.extend(children.iter().map(JsValue::to_js));
            JsValue::raw(format!("mdx({})", args.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn automatic_single_and_multiple_children() {
        let mut ctx = CodegenContext::new(JsxFlavor::Automatic);
        let one = render_element(&mut ctx, Tag::Markdown("p"), vec![], vec![JsValue::text("hi")]);
        assert_eq!(one.to_js(), "_jsx(_components.p, {children: \"hi\"})");

        let many = render_element(
            &mut ctx,
            Tag::Markdown("p"),
            vec![],
            vec![JsValue::text("a "), JsValue::raw("x")],
        );
        assert_eq!(many.to_js(), "_jsxs(_components.p, {children: [\"a \", x]})");
    }

    #[test]
    fn classic_adds_mdx_type_for_components() {
        let mut ctx = CodegenContext::new(JsxFlavor::Classic);
        let el = render_element(
            &mut ctx,
            Tag::Jsx(Some("Button")),
            vec![Prop::literal("label", "Go")],
            vec![],
        );
        assert_eq!(el.to_js(), "mdx(Button, {label: \"Go\", mdxType: \"Button\"})");

        let p = render_element(&mut ctx, Tag::Markdown("p"), vec![], vec![JsValue::text("x")]);
        assert_eq!(p.to_js(), "mdx(\"p\", null, \"x\")");
    }
}
