//! fob-preview entry point.

use std::process::ExitCode;

use clap::Parser;
use fob_preview_builder::exit_code;
use fob_preview_cli::{cli, commands, config, error, logger, ui};

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Cli::parse();
    ui::init_colors(args.no_color);

    let result = run(args).await;

    match result {
        Ok(()) => exit(exit_code::current()),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", error::cli_error_to_miette(err));
            exit(code)
        }
    }
}

async fn run(args: cli::Cli) -> fob_preview_cli::Result<()> {
    let loaded = config::load(&args)?;
    logger::init_logger(
        args.verbose,
        args.quiet,
        args.no_color,
        loaded.presets.log_level.as_deref(),
    );
    if let Some(source) = &loaded.source {
        tracing::debug!(path = %source.display(), "Using preview configuration");
    }

    match args.command {
        cli::Command::Build(build_args) => commands::build_execute(loaded, build_args).await,
        cli::Command::Dev(dev_args) => commands::dev_execute(loaded, dev_args).await,
    }
}

fn exit(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
