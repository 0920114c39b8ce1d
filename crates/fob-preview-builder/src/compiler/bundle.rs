//! Rolldown-backed [`Compiler`].

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use rolldown::BundlerBuilder;
use tokio::sync::broadcast;

use super::dev::RolldownDevCompilation;
use super::output::{EmittedFile, collect_outputs, write_output_files};
use super::{BuildMetadata, BuildStats, Compiler, DevCompilation};
use crate::diagnostics::{extract_from_rolldown_error, extract_warnings};
use crate::error::Result;
use crate::iframe::{PreviewBundleConfig, bundler_options, preview_plugins};
use crate::request::PreviewEvent;
use crate::scope::RunScope;

/// Compiles the preview with Rolldown and the preview plugins.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolldownCompiler;

impl RolldownCompiler {
    pub fn new() -> Self {
        Self
    }
}

/// Stats plus in-memory output of one bundler run.
pub(super) struct Compiled {
    pub stats: BuildStats,
    pub files: Vec<EmittedFile>,
}

impl Compiled {
    fn failed(stats: BuildStats) -> Self {
        Self {
            stats,
            files: Vec::new(),
        }
    }
}

/// Run the bundler once without touching the output directory.
pub(super) async fn compile(config: &PreviewBundleConfig) -> Result<Compiled> {
    let started = Instant::now();
    let plugins = preview_plugins(config)?;

    let mut bundler = match BundlerBuilder::default()
        .with_options(bundler_options(config))
        .with_plugins(plugins)
        .build()
    {
        Ok(bundler) => bundler,
        Err(e) => return Ok(Compiled::failed(BuildStats::failed(extract_from_rolldown_error(&e)))),
    };

    let output = match bundler.generate().await {
        Ok(output) => output,
        Err(e) => return Ok(Compiled::failed(BuildStats::failed(extract_from_rolldown_error(&e)))),
    };

    let files = collect_outputs(&output);
    let stats = BuildStats {
        errors: Vec::new(),
        warnings: extract_warnings(&output.warnings),
        metadata: BuildMetadata {
            inputs: config.inputs.len(),
            outputs: files.iter().map(|f| f.meta.clone()).collect(),
            duration_ms: started.elapsed().as_millis() as u64,
        },
    };

    tracing::debug!(
        outputs = stats.metadata.outputs.len(),
        warnings = stats.warnings.len(),
        duration_ms = stats.metadata.duration_ms,
        "Bundled preview"
    );
    Ok(Compiled { stats, files })
}

#[async_trait]
impl Compiler for RolldownCompiler {
    async fn build(&self, config: &PreviewBundleConfig, scope: &RunScope) -> Result<BuildStats> {
        let Compiled { stats, files } = compile(config).await?;
        if stats.has_errors() {
            return Ok(stats);
        }

        for warning in &stats.warnings {
            tracing::warn!("{}", warning);
        }

        let output_dir = config.output_dir.clone();
        scope
            .spawn_blocking(move |token| write_output_files(&output_dir, &files, &token))
            .await?;

        Ok(stats)
    }

    async fn serve(
        &self,
        config: PreviewBundleConfig,
        events: Option<broadcast::Sender<PreviewEvent>>,
    ) -> Result<Arc<dyn DevCompilation>> {
        let compilation = RolldownDevCompilation::start(config, events)?;
        Ok(Arc::new(compilation))
    }
}
