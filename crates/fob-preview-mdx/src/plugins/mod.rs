//! Document transformations applied before code generation.

mod external_links;
mod heading_slug;
mod trait_def;

use std::sync::Arc;

pub use external_links::{ExternalLinksPlugin, is_external};
pub use heading_slug::{HeadingSlugPlugin, Slugger};
pub use trait_def::MdxPlugin;

/// The documentation plugins every compiled document receives: heading
/// anchors first, then external link attributes.
pub fn docs_plugins() -> Vec<Arc<dyn MdxPlugin>> {
    vec![Arc::new(HeadingSlugPlugin::new()), Arc::new(ExternalLinksPlugin::new())]
}

/// Append the documentation plugins to an embedder's own list. Embedder
/// plugins keep their order and are never dropped.
pub fn with_docs_plugins(embedder: impl IntoIterator<Item = Arc<dyn MdxPlugin>>) -> Vec<Arc<dyn MdxPlugin>> {
    let mut plugins: Vec<Arc<dyn MdxPlugin>> = embedder.into_iter().collect();
    plugins.extend(docs_plugins());
    plugins
}
