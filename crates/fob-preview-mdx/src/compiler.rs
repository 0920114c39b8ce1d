//! The two documentation front-ends behind one trait.

use std::sync::Arc;

use crate::codegen::JsxFlavor;
use crate::compile::compile_document;
use crate::error::MdxError;
use crate::options::MdxCompileOptions;

/// Compiles a documentation file into a JavaScript module.
pub trait DocsCompiler: Send + Sync {
    fn name(&self) -> &'static str;

    fn compile(&self, source: &str, options: &MdxCompileOptions) -> Result<String, MdxError>;
}

/// Current front-end: automatic JSX runtime with provider-injected components.
#[derive(Debug, Default, Clone, Copy)]
pub struct MdxCompiler;

impl DocsCompiler for MdxCompiler {
    fn name(&self) -> &'static str {
        "mdx"
    }

    fn compile(&self, source: &str, options: &MdxCompileOptions) -> Result<String, MdxError> {
        compile_document(source, options, JsxFlavor::Automatic)
    }
}

/// Legacy front-end: classic `mdx` pragma calls with shortcode fallbacks.
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyMdxCompiler;

impl DocsCompiler for LegacyMdxCompiler {
    fn name(&self) -> &'static str {
        "mdx1"
    }

    fn compile(&self, source: &str, options: &MdxCompileOptions) -> Result<String, MdxError> {
        compile_document(source, options, JsxFlavor::Classic)
    }
}

/// Pick the front-end for the `legacy_mdx1` feature flag.
pub fn compiler_for(legacy: bool) -> Arc<dyn DocsCompiler> {
    if legacy {
        Arc::new(LegacyMdxCompiler)
    } else {
        Arc::new(MdxCompiler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_front_end() {
        assert_eq!(compiler_for(true).name(), "mdx1");
        assert_eq!(compiler_for(false).name(), "mdx");
    }
}
