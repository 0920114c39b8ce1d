//! `fob-preview dev`: serve the preview and rebuild on change.
//!
//! The HTTP server comes up first and serves whatever the builder has
//! mounted. The initial build then runs under the lifecycle controller;
//! later rebuilds are reported through the event channel until Ctrl+C.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use fob_preview_builder::{
    BuildRequest, BuildSuccess, PreviewBuilder, PreviewEvent, PreviewRouter, RolldownCompiler,
    ServingContext, print_duration,
};
use fob_preview_config::LoadedConfig;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::cli::DevArgs;
use crate::error::{CliError, Result};
use crate::{server, ui};

const EVENT_CAPACITY: usize = 64;

pub async fn execute(config: LoadedConfig, args: DevArgs) -> Result<()> {
    let preview = PreviewRouter::new();
    let (serving, events) = ServingContext::new(preview.clone(), EVENT_CAPACITY);

    let (listener, addr) = server::bind(SocketAddr::new(args.host, args.port)).await?;
    let shutdown = CancellationToken::new();
    let mut server_task = tokio::spawn(server::serve(listener, preview, shutdown.clone()));

    let output_dir = config.options.resolved_output_dir()?;
    let builder = PreviewBuilder::new(Arc::new(RolldownCompiler::new()));
    let request = BuildRequest::builder()
        .options(config.options)
        .presets(Arc::new(config.presets))
        .output_dir(output_dir)
        .serving(serving)
        .build();

    ui::info("Compiling preview...");
    let success = match initial_build(&builder, request).await {
        Ok(Some(success)) => success,
        Ok(None) => {
            shutdown.cancel();
            return Ok(());
        }
        Err(err) => {
            shutdown.cancel();
            return Err(err);
        }
    };

    let url = format!("http://{}/iframe.html", addr);
    ui::success(&format!(
        "Preview ready at {} in {}",
        url,
        print_duration(success.total_time)
    ));
    if args.open {
        open_browser(&url);
    }
    ui::info("Press Ctrl+C to stop");

    // The initial run's own events were already reported above.
    let mut events = events.resubscribe();
    let outcome = loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => report(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Dropped preview events");
                }
                Err(RecvError::Closed) => break Ok(()),
            },
            _ = signal::ctrl_c() => {
                ui::info("Shutting down preview server...");
                break Ok(());
            }
            joined = &mut server_task => {
                break match joined {
                    Ok(Ok(())) => Err(CliError::Server("server stopped unexpectedly".to_string())),
                    Ok(Err(err)) => Err(err),
                    Err(err) => Err(CliError::Server(err.to_string())),
                };
            }
        }
    };

    success.cancel.cancel().await;
    shutdown.cancel();
    if outcome.is_ok() {
        ui::success("Preview server stopped");
    }
    outcome
}

/// `Ok(None)` when Ctrl+C arrived before the preview was ready.
async fn initial_build(builder: &PreviewBuilder, request: BuildRequest) -> Result<Option<BuildSuccess>> {
    let handle = builder.start(request)?;
    let cancel = handle.cancel_handle();
    let run = handle.into_future();
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => Ok(Some(result?)),
        _ = signal::ctrl_c() => {
            ui::warning("Cancelling preview build...");
            cancel.cancel().await;
            match run.await {
                Ok(success) => {
                    success.cancel.cancel().await;
                    Ok(None)
                }
                Err(err) if !err.is_fatal() => Ok(None),
                Err(err) => Err(err.into()),
            }
        }
    }
}

pub fn report(event: &PreviewEvent) {
    match event {
        PreviewEvent::BuildStarted => ui::info("Rebuilding preview..."),
        PreviewEvent::BuildCompleted { duration_ms } => {
            ui::success(&format!("Preview rebuilt in {}ms", duration_ms));
        }
        PreviewEvent::BuildFailed { error } => ui::error(&format!("Rebuild failed: {}", error)),
    }
}

fn open_browser(url: &str) {
    use std::process::Command;

    let result = if cfg!(target_os = "macos") {
        Command::new("open").arg(url).spawn()
    } else if cfg!(target_os = "windows") {
        Command::new("cmd").args(["/C", "start", url]).spawn()
    } else {
        Command::new("xdg-open").arg(url).spawn()
    };

    if let Err(e) = result {
        ui::warning(&format!("Failed to open browser: {}", e));
    }
}
