//! Code generation state.

use std::collections::{BTreeSet, HashSet};

use super::escape::{escape_js_string, is_valid_identifier, js_string};

/// Which JSX call convention the generated module uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsxFlavor {
    /// `_jsx` / `_jsxs` from the automatic runtime, components looked up on `_components`.
    Automatic,
    /// `mdx(type, props, ...children)` pragma calls with `mdxType` tags.
    Classic,
}

/// Where the code being generated will run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scope {
    /// Inside the content function, where `_components` is bound.
    #[default]
    Content,
    /// Module level, e.g. story exports.
    Module,
}

/// Tags the content function can override through `_components`.
pub const DEFAULT_COMPONENTS: &[&str] = &[
    "a", "blockquote", "br", "code", "del", "em", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "img",
    "input", "li", "ol", "p", "pre", "section", "span", "strong", "sup", "table", "tbody", "td",
    "th", "thead", "tr", "ul",
];

/// What produced an element.
#[derive(Debug, Clone, Copy)]
pub enum Tag<'a> {
    /// Markdown syntax such as a paragraph or emphasis.
    Markdown(&'a str),
    /// A JSX element written in the document. `None` is a fragment.
    Jsx(Option<&'a str>),
}

pub struct CodegenContext {
    pub flavor: JsxFlavor,
    pub scope: Scope,
    /// Names bound by the document's own imports and exports.
    pub bindings: HashSet<String>,
    /// Components referenced but never bound (classic flavor only).
    pub shortcodes: BTreeSet<String>,
    pub uses_fragment: bool,
}

impl CodegenContext {
    pub fn new(flavor: JsxFlavor) -> Self {
        Self {
            flavor,
            scope: Scope::Content,
            bindings: HashSet::new(),
            shortcodes: BTreeSet::new(),
            uses_fragment: false,
        }
    }

    /// Run `f` with a different scope, restoring the previous one afterwards.
    pub fn with_scope<T>(&mut self, scope: Scope, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = previous;
        result
    }

    /// Resolve a tag to the expression passed as the element type.
    ///
    /// Returns the expression and, for components, the name used as `mdxType`.
    pub fn resolve_tag(&mut self, tag: Tag<'_>) -> (String, Option<String>) {
        match tag {
            Tag::Markdown(name) => (self.intrinsic(name), None),
            Tag::Jsx(None) => {
                self.uses_fragment = true;
                ("_Fragment".to_string(), None)
            }
            Tag::Jsx(Some(name)) => {
                let root = name.split('.').next().unwrap_or(name);
                if self.bindings.contains(root) {
                    return (name.to_string(), Some(name.to_string()));
                }
                if is_component_name(name) {
                    return (self.component(name), Some(name.to_string()));
                }
                (self.intrinsic(name), None)
            }
        }
    }

    fn intrinsic(&self, name: &str) -> String {
        let overridable = DEFAULT_COMPONENTS.contains(&name);
        match (self.flavor, self.scope) {
            (JsxFlavor::Automatic, Scope::Content) if overridable => format!("_components.{}", name),
            _ => js_string(name),
        }
    }

    fn component(&mut self, name: &str) -> String {
        match (self.flavor, self.scope) {
            (JsxFlavor::Automatic, Scope::Content) => components_access(name),
            (JsxFlavor::Automatic, Scope::Module) => name.to_string(),
            (JsxFlavor::Classic, _) => {
                if is_valid_identifier(name) {
                    self.shortcodes.insert(name.to_string());
                }
                name.to_string()
            }
        }
    }
}

/// Uppercase, `_`/`$` prefixed and member-expression names are components.
fn is_component_name(name: &str) -> bool {
    match name.chars().next() {
        Some(first) => first.is_ascii_uppercase() || first == '_' || first == '$' || name.contains('.'),
        None => false,
    }
}

/// `_components.Foo`, `_components.Foo.Bar` or `_components["Foo-bar"]`.
fn components_access(name: &str) -> String {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.iter().any(|part| !is_valid_identifier(part)) {
        return format!("_components[\"{}\"]", escape_js_string(name));
    }
    format!("_components.{}", parts.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn automatic_content_uses_component_map() {
        let mut ctx = CodegenContext::new(JsxFlavor::Automatic);
        assert_eq!(ctx.resolve_tag(Tag::Markdown("p")).0, "_components.p");
        assert_eq!(ctx.resolve_tag(Tag::Jsx(Some("h2"))).0, "_components.h2");
        assert_eq!(ctx.resolve_tag(Tag::Jsx(Some("div"))).0, "\"div\"");
        assert_eq!(ctx.resolve_tag(Tag::Jsx(Some("Button"))).0, "_components.Button");
        assert_eq!(ctx.resolve_tag(Tag::Jsx(Some("Foo-bar"))).0, "_components[\"Foo-bar\"]");
    }

    #[test]
    fn bound_names_are_used_directly() {
        let mut ctx = CodegenContext::new(JsxFlavor::Automatic);
        ctx.bindings.insert("Meta".into());
        ctx.bindings.insert("UI".into());
        assert_eq!(ctx.resolve_tag(Tag::Jsx(Some("Meta"))).0, "Meta");
        assert_eq!(ctx.resolve_tag(Tag::Jsx(Some("UI.Card"))).0, "UI.Card");
    }

    #[test]
    fn module_scope_skips_component_map() {
        let mut ctx = CodegenContext::new(JsxFlavor::Automatic);
        let tag = ctx.with_scope(Scope::Module, |ctx| ctx.resolve_tag(Tag::Jsx(Some("Button"))).0);
        assert_eq!(tag, "Button");
        assert_eq!(ctx.scope, Scope::Content);
    }

    #[test]
    fn classic_collects_shortcodes() {
        let mut ctx = CodegenContext::new(JsxFlavor::Classic);
        let (expr, mdx_type) = ctx.resolve_tag(Tag::Jsx(Some("Badge")));
        assert_eq!(expr, "Badge");
        assert_eq!(mdx_type.as_deref(), Some("Badge"));
        assert!(ctx.shortcodes.contains("Badge"));
        assert_eq!(ctx.resolve_tag(Tag::Markdown("p")).0, "\"p\"");
    }
}
