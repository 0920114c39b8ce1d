//! Command-line interface definition.
//!
//! - `fob-preview build` - Write a static preview
//! - `fob-preview dev` - Serve the preview and rebuild on change

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use fob_preview_config::ConfigType;

/// fob-preview - build and serve the component preview
#[derive(Parser, Debug)]
#[command(
    name = "fob-preview",
    version,
    about = "Build and serve the component preview",
    long_about = "Bundles stories, preview annotations and documentation files into the\n\
                  preview iframe, either as a static directory or from a development server."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file (defaults to fob-preview.toml or fob-preview.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Working directory for the build
    #[arg(long, global = true, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a static preview into the output directory
    Build(BuildArgs),

    /// Serve the preview and rebuild it when sources change
    Dev(DevArgs),
}

impl Command {
    pub fn preview(&self) -> &PreviewArgs {
        match self {
            Command::Build(args) => &args.preview,
            Command::Dev(args) => &args.preview,
        }
    }
}

/// Options shared by every command. Each one overrides the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct PreviewArgs {
    /// Directory holding the storybook configuration
    #[arg(short = 'c', long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Compile documentation files with the legacy MDX1 front-end
    #[arg(long)]
    pub legacy_mdx1: bool,

    /// Build type announced to the preview runtime
    #[arg(long, value_enum, value_name = "TYPE")]
    pub config_type: Option<Mode>,

    /// Do not emit source maps
    #[arg(long)]
    pub no_sourcemap: bool,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub preview: PreviewArgs,

    /// Output directory for the static preview
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Print the build summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DevArgs {
    #[command(flatten)]
    pub preview: PreviewArgs,

    /// Port to listen on
    #[arg(short, long, default_value_t = 6006)]
    pub port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Open the preview in the default browser once it is ready
    #[arg(long)]
    pub open: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Development,
    Production,
}

impl From<Mode> for ConfigType {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Development => ConfigType::Development,
            Mode::Production => ConfigType::Production,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn dev_defaults_to_port_6006() {
        let cli = Cli::parse_from(["fob-preview", "dev"]);
        match cli.command {
            Command::Dev(args) => {
                assert_eq!(args.port, 6006);
                assert_eq!(args.host.to_string(), "127.0.0.1");
            }
            other => panic!("expected dev, got {:?}", other),
        }
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::parse_from([
            "fob-preview",
            "build",
            "--legacy-mdx1",
            "--config-type",
            "production",
            "-o",
            "out",
            "--quiet",
        ]);
        assert!(cli.quiet);
        let preview = cli.command.preview();
        assert!(preview.legacy_mdx1);
        assert_eq!(preview.config_type, Some(Mode::Production));
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["fob-preview", "-v", "-q", "build"]).is_err());
    }
}
