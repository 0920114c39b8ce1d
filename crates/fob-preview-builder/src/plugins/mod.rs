//! Rolldown plugins that make up the preview bundle.

pub mod global_imports;
pub mod iframe_html;
pub mod mdx;
pub mod registry;
pub mod virtual_modules;

pub use global_imports::{GLOBAL_PREFIX, GlobalImportPlugin};
pub use iframe_html::{IFRAME_HTML, IframeHtmlOptions, IframeHtmlPlugin};
pub use mdx::MdxLoaderPlugin;
pub use registry::{PluginPhase, PluginRegistry, PreviewPlugin};
pub use virtual_modules::{VIRTUAL_PREFIX, VirtualModulePlugin};
