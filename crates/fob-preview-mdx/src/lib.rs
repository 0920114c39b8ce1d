//! # fob-preview-mdx
//!
//! Compiles documentation files (`.mdx`) into JavaScript modules for the
//! preview bundle. Two front-ends share one parser and code generator:
//!
//! - [`MdxCompiler`] emits automatic-runtime JSX calls with components
//!   resolved through a provider.
//! - [`LegacyMdxCompiler`] emits classic `mdx(...)` pragma calls.
//!
//! Unless [`MdxCompileOptions::skip_csf`] is set, `<Meta>` and `<Story>`
//! elements are turned into story exports.

pub mod codegen;
mod compile;
pub mod compiler;
pub mod csf;
pub mod error;
pub mod esm;
pub mod nodes;
pub mod options;
pub mod plugins;

pub use compile::parse;
pub use compiler::{DocsCompiler, LegacyMdxCompiler, MdxCompiler, compiler_for};
pub use error::MdxError;
pub use options::{LEGACY_PRAGMA_SOURCE, MdxCompileOptions, is_story_document};
pub use plugins::{ExternalLinksPlugin, HeadingSlugPlugin, MdxPlugin, docs_plugins, with_docs_plugins};
