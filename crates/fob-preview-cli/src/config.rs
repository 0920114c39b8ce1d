//! Configuration loading with command-line overrides.
//!
//! Priority: CLI flags > environment variables > config file > defaults.

use std::path::{Path, PathBuf};

use fob_preview_config::{LoadedConfig, load_config};

use crate::cli::{Cli, Command, PreviewArgs};
use crate::error::Result;

/// Load the configuration for `cli`'s command.
pub fn load(cli: &Cli) -> Result<LoadedConfig> {
    let cwd = working_dir(cli.cwd.as_deref())?;
    let mut loaded = load_config(&cwd, cli.config.as_deref())?;
    loaded.options.cwd = Some(cwd);

    apply_overrides(&mut loaded, cli.command.preview());
    if let Command::Build(args) = &cli.command {
        if let Some(dir) = &args.output_dir {
            loaded.options.output_dir = dir.clone();
        }
    }

    Ok(loaded)
}

fn working_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    let current = std::env::current_dir()?;
    Ok(match explicit {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => current.join(dir),
        None => current,
    })
}

/// Flags only ever switch things on; an absent flag keeps the loaded value.
pub fn apply_overrides(loaded: &mut LoadedConfig, args: &PreviewArgs) {
    let options = &mut loaded.options;
    if let Some(dir) = &args.config_dir {
        options.config_dir = dir.clone();
    }
    if let Some(mode) = args.config_type {
        options.config_type = mode.into();
    }
    if args.legacy_mdx1 {
        options.features.legacy_mdx1 = true;
    }
    if args.no_sourcemap {
        options.sourcemap = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Mode;
    use fob_preview_config::ConfigType;
    use std::path::PathBuf;

    #[test]
    fn flags_override_loaded_values() {
        let mut loaded = LoadedConfig::default();
        let args = PreviewArgs {
            config_dir: Some(PathBuf::from("config/storybook")),
            legacy_mdx1: true,
            config_type: Some(Mode::Production),
            no_sourcemap: true,
        };

        apply_overrides(&mut loaded, &args);

        assert_eq!(loaded.options.config_dir, PathBuf::from("config/storybook"));
        assert!(loaded.options.features.legacy_mdx1);
        assert_eq!(loaded.options.config_type, ConfigType::Production);
        assert!(!loaded.options.sourcemap);
    }

    #[test]
    fn absent_flags_keep_loaded_values() {
        let mut loaded = LoadedConfig::default();
        loaded.options.features.legacy_mdx1 = true;
        loaded.options.config_type = ConfigType::Production;

        apply_overrides(&mut loaded, &PreviewArgs::default());

        assert!(loaded.options.features.legacy_mdx1);
        assert_eq!(loaded.options.config_type, ConfigType::Production);
        assert_eq!(loaded.options.config_dir, PathBuf::from(".storybook"));
    }
}
