use anyhow::Result;
use markdown::mdast::Node;

/// Transformation hook run by both compilers.
///
/// `transform_ast` runs on the parsed tree before code generation;
/// `transform_jsx` runs on the finished module text. Plugins run in
/// registration order and must be `Send + Sync` because documents compile
/// concurrently.
pub trait MdxPlugin: Send + Sync {
    /// Short identifier used in logs and error messages, e.g. `"heading-slug"`.
    fn name(&self) -> &'static str;

    fn transform_ast(&self, ast: &mut Node) -> Result<()> {
        let _ = ast;
        Ok(())
    }

    fn transform_jsx(&self, jsx: &mut String) -> Result<()> {
        let _ = jsx;
        Ok(())
    }
}
