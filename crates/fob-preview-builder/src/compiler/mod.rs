//! The compiler seam.
//!
//! The lifecycle controller only talks to [`Compiler`] and
//! [`DevCompilation`]; [`RolldownCompiler`] is the production implementation.

mod bundle;
mod dev;
mod output;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::diagnostics::ExtractedDiagnostic;
use crate::error::Result;
use crate::iframe::PreviewBundleConfig;
use crate::request::PreviewEvent;
use crate::scope::RunScope;

pub use self::bundle::RolldownCompiler;
pub use self::dev::{BundleCache, RolldownDevCompilation};
pub use self::output::{EmittedFile, OutputFile, OutputKind, collect_outputs, write_output_files};

/// Compiles a preview bundle configuration.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Compile once and write the output into `config.output_dir`.
    ///
    /// Compilation problems are reported through [`BuildStats::errors`];
    /// `Err` is reserved for failures around the compiler itself. Blocking
    /// file work goes through `scope` so the run can wait for it.
    async fn build(&self, config: &PreviewBundleConfig, scope: &RunScope) -> Result<BuildStats>;

    /// Start a live compilation that rebuilds on change. Returns as soon as
    /// the compilation exists; the first build may still be running.
    async fn serve(
        &self,
        config: PreviewBundleConfig,
        events: Option<broadcast::Sender<PreviewEvent>>,
    ) -> Result<Arc<dyn DevCompilation>>;
}

/// A live compilation owned by a serving run.
#[async_trait]
pub trait DevCompilation: Send + Sync {
    /// Routes serving the latest in-memory output.
    fn router(&self) -> Router;

    /// Wait for the current build to settle. `None` once the compilation
    /// has been closed without producing stats.
    async fn wait_until_valid(&self) -> Result<Option<BuildStats>>;

    /// Stop watching and release every resource.
    async fn close(&self) -> anyhow::Result<()>;
}

/// Outcome of one compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    pub errors: Vec<ExtractedDiagnostic>,
    pub warnings: Vec<ExtractedDiagnostic>,
    pub metadata: BuildMetadata,
}

impl BuildStats {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn failed(errors: Vec<ExtractedDiagnostic>) -> Self {
        Self {
            errors,
            ..Default::default()
        }
    }
}

/// Written to `meta.json` after a one-shot build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMetadata {
    /// Number of bundle inputs.
    pub inputs: usize,
    pub outputs: Vec<OutputFile>,
    pub duration_ms: u64,
}

impl BuildMetadata {
    pub fn total_bytes(&self) -> u64 {
        self.outputs.iter().map(|o| o.bytes).sum()
    }
}
