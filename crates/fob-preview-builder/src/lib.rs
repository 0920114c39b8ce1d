#![cfg_attr(docsrs, feature(doc_cfg))]

//! # fob-preview-builder
//!
//! Cancellable, Rolldown-based builder for the component preview ("iframe").
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use fob_preview_builder::{BuildRequest, PreviewBuilder, RolldownCompiler};
//! use fob_preview_config::{PresetConfig, PreviewOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let builder = PreviewBuilder::new(Arc::new(RolldownCompiler::new()));
//! let request = BuildRequest::builder()
//!     .options(PreviewOptions::default())
//!     .presets(Arc::new(PresetConfig::default()))
//!     .output_dir("storybook-static")
//!     .build();
//!
//! let success = builder.build(request)?.await?;
//! println!("built in {:?}", success.total_time);
//! # Ok(()) }
//! ```
//!
//! The bundle is assembled from generated entry modules served by
//! [`plugins::VirtualModulePlugin`], runtime packages mapped to globals by
//! [`plugins::GlobalImportPlugin`], and documentation files compiled by
//! [`plugins::MdxLoaderPlugin`].

pub mod compiler;
pub mod diagnostics;
pub mod entries;
pub mod error;
pub mod exit_code;
pub mod iframe;
pub mod lifecycle;
pub mod plugins;
pub mod presets;
pub mod preview_assets;
pub mod request;
pub mod scope;
pub mod timing;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

pub use compiler::{BuildMetadata, BuildStats, Compiler, DevCompilation, RolldownCompiler};
pub use diagnostics::{DiagnosticKind, DiagnosticSeverity, ExtractedDiagnostic};
pub use error::{BuildError, Result};
pub use iframe::{PreviewBundleConfig, PreviewInput, iframe_config};
pub use lifecycle::{
    BuildResult, BuildSuccess, CancelHandle, LifecycleHandle, LifecycleState, PreviewBuilder,
};
pub use presets::{PresetHooks, ResolvedPresets, default_globals, resolve_presets};
pub use preview_assets::{CopyReport, copy_preview_runtime, preview_static_router};
pub use request::{BuildRequest, PreviewEvent, PreviewRouter, ServingContext};
pub use scope::RunScope;
pub use timing::print_duration;
