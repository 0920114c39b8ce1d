//! Logging setup for the CLI.
//!
//! The level is picked in this order:
//! 1. `--verbose` (debug) or `--quiet` (errors only)
//! 2. `RUST_LOG`
//! 3. The preset `log_level`
//! 4. info

use fob_preview_builder::logging::LogLevel;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const CRATES: &[&str] = &[
    "fob_preview_builder",
    "fob_preview_config",
    "fob_preview_mdx",
    "fob_preview_cli",
];

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool, preset_level: Option<&str>) {
    let filter = if verbose {
        crate_filter(LogLevel::Debug)
    } else if quiet {
        crate_filter(LogLevel::Error)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| crate_filter(preset_level_or_info(preset_level)))
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .without_time()
        .compact();

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

fn preset_level_or_info(preset_level: Option<&str>) -> LogLevel {
    match preset_level.map(str::parse::<LogLevel>) {
        Some(Ok(level)) => level,
        Some(Err(message)) => {
            eprintln!("{}; falling back to info", message);
            LogLevel::Info
        }
        None => LogLevel::Info,
    }
}

/// Directive list applying `level` to the workspace crates.
pub fn filter_directives(level: LogLevel) -> String {
    CRATES
        .iter()
        .map(|krate| format!("{}={}", krate, level))
        .collect::<Vec<_>>()
        .join(",")
}

fn crate_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::new(filter_directives(level))
}
