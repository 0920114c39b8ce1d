//! `fob-preview build`: write the static preview and `meta.json`.

use std::future::IntoFuture;
use std::sync::Arc;

use fob_preview_builder::{
    BuildMetadata, BuildRequest, BuildSuccess, PreviewBuilder, RolldownCompiler, print_duration,
};
use fob_preview_config::LoadedConfig;
use serde::Serialize;
use tokio::signal;

use crate::cli::BuildArgs;
use crate::error::Result;
use crate::ui;

/// Printed on stdout with `--json`.
#[derive(Debug, Serialize)]
pub struct BuildSummary<'a> {
    pub duration_ms: u64,
    pub warnings: Vec<String>,
    #[serde(flatten)]
    pub metadata: &'a BuildMetadata,
}

impl<'a> BuildSummary<'a> {
    pub fn new(success: &'a BuildSuccess) -> Self {
        Self {
            duration_ms: u64::try_from(success.total_time.as_millis()).unwrap_or(u64::MAX),
            warnings: success.stats.warnings.iter().map(ToString::to_string).collect(),
            metadata: &success.stats.metadata,
        }
    }
}

pub async fn execute(config: LoadedConfig, args: BuildArgs) -> Result<()> {
    let output_dir = config.options.resolved_output_dir()?;
    ui::info(&format!("Building preview into {}", output_dir.display()));

    let builder = PreviewBuilder::new(Arc::new(RolldownCompiler::new()));
    let request = BuildRequest::builder()
        .options(config.options)
        .presets(Arc::new(config.presets))
        .output_dir(output_dir)
        .build();

    let success = run_until_interrupted(&builder, request).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&BuildSummary::new(&success))?);
    } else {
        for warning in &success.stats.warnings {
            ui::warning(&warning.to_string());
        }
        ui::print_build_summary(&success.stats.metadata);
    }
    ui::success(&format!("Preview built in {}", print_duration(success.total_time)));
    Ok(())
}

/// Run the build, cancelling it on Ctrl+C.
async fn run_until_interrupted(builder: &PreviewBuilder, request: BuildRequest) -> Result<BuildSuccess> {
    let handle = builder.build(request)?;
    let cancel = handle.cancel_handle();
    let run = handle.into_future();
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => Ok(result?),
        _ = signal::ctrl_c() => {
            ui::warning("Cancelling preview build...");
            cancel.cancel().await;
            // Resolves with `Cancelled` unless the build finished first.
            Ok(run.await?)
        }
    }
}
