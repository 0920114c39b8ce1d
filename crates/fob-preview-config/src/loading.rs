//! Layered configuration loading.
//!
//! Priority: environment variables > config file > defaults. The config file
//! holds [`PreviewOptions`] at the top level and the preset values under a
//! `[presets]` table.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized, Toml},
};

use crate::error::{ConfigError, Result};
use crate::options::PreviewOptions;
use crate::presets::PresetConfig;

/// File names looked up in the working directory, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["fob-preview.toml", "fob-preview.json"];

/// Prefix for environment overrides. Nested keys are separated by `__`,
/// e.g. `FOB_PREVIEW_FEATURES__LEGACY_MDX1=true`.
pub const ENV_PREFIX: &str = "FOB_PREVIEW_";

#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub options: PreviewOptions,
    pub presets: PresetConfig,
    /// File the configuration was read from, if any.
    pub source: Option<PathBuf>,
}

/// Find the first known config file in `dir`.
pub fn discover_config_file(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Load options and presets from `explicit` or the discovered config file in `dir`.
pub fn load_config(dir: &Path, explicit: Option<&Path>) -> Result<LoadedConfig> {
    let source = match explicit {
        Some(path) => {
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                dir.join(path)
            };
            if !path.is_file() {
                return Err(ConfigError::NotFound(path));
            }
            Some(path)
        }
        None => discover_config_file(dir),
    };

    let mut figment = Figment::new().merge(Serialized::defaults(PreviewOptions::default()));

    if let Some(path) = &source {
        tracing::debug!(path = %path.display(), "Loading preview configuration");
        figment = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => figment.merge(Toml::file(path)),
            Some("json") => figment.merge(Json::file(path)),
            other => {
                return Err(ConfigError::UnsupportedFormat(
                    other.unwrap_or("<none>").to_string(),
                ));
            }
        };
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

    let options: PreviewOptions = figment.extract()?;
    let presets = if figment.contains("presets") {
        figment.extract_inner::<PresetConfig>("presets")?
    } else {
        PresetConfig::default()
    };

    Ok(LoadedConfig {
        options,
        presets,
        source,
    })
}
