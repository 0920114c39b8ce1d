//! Compile options shared by both front-ends.

use std::sync::Arc;

use bon::Builder;

use crate::plugins::MdxPlugin;

/// Module providing `mdx` for the classic front-end.
pub const LEGACY_PRAGMA_SOURCE: &str = "@mdx-js/react";

#[derive(Builder, Clone)]
pub struct MdxCompileOptions {
    /// Path used in error messages.
    #[builder(into)]
    pub filepath: Option<String>,

    /// Emit only the document component, without story exports.
    #[builder(default)]
    pub skip_csf: bool,

    /// Tables, strikethrough, task lists and autolink literals.
    #[builder(default = true)]
    pub gfm: bool,

    #[builder(default = true)]
    pub footnotes: bool,

    /// Inline `$...$` and block `$$...$$` math.
    #[builder(default)]
    pub math: bool,

    /// Automatic JSX runtime module.
    #[builder(default = "react/jsx-runtime".to_string(), into)]
    pub jsx_runtime: String,

    /// Module exporting `useMDXComponents`, merged under `props.components`.
    #[builder(into)]
    pub provider_import_source: Option<String>,

    /// Applied in order.
    #[builder(default)]
    pub plugins: Vec<Arc<dyn MdxPlugin>>,
}

impl std::fmt::Debug for MdxCompileOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MdxCompileOptions")
            .field("filepath", &self.filepath)
            .field("skip_csf", &self.skip_csf)
            .field("gfm", &self.gfm)
            .field("footnotes", &self.footnotes)
            .field("math", &self.math)
            .field("jsx_runtime", &self.jsx_runtime)
            .field("provider_import_source", &self.provider_import_source)
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Default for MdxCompileOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Documents whose name marks them as story files get story exports.
pub fn is_story_document(path: &str) -> bool {
    path.ends_with("stories.mdx") || path.ends_with("story.mdx")
}
