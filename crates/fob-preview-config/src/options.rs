//! Options for a single preview build invocation.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Whether the preview is built for interactive development or for a static deploy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfigType {
    #[default]
    Development,
    Production,
}

impl ConfigType {
    pub fn is_production(self) -> bool {
        matches!(self, ConfigType::Production)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigType::Development => "DEVELOPMENT",
            ConfigType::Production => "PRODUCTION",
        }
    }
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature toggles that change how the preview is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    /// On-demand story store. The preview builder cannot run without it.
    pub story_store_v7: bool,
    /// Compile documentation files with the legacy MDX1 front-end.
    pub legacy_mdx1: bool,
    /// Serve the generated `meta.json` alongside the build output.
    pub build_stories_json: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            story_store_v7: true,
            legacy_mdx1: false,
            build_stories_json: false,
        }
    }
}

/// Top-level options for a preview build.
///
/// Paths are resolved against [`PreviewOptions::cwd`] when relative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewOptions {
    /// Directory holding the storybook configuration (`.storybook` by default).
    pub config_dir: PathBuf,
    /// Where one-shot builds write their output.
    pub output_dir: PathBuf,
    /// Working directory. `None` means the process working directory.
    pub cwd: Option<PathBuf>,
    pub config_type: ConfigType,
    pub features: Features,
    /// Version string injected into `iframe.html`.
    pub package_version: Option<String>,
    pub preview_url: Option<String>,
    pub server_channel_url: Option<String>,
    /// Location of the prebuilt preview runtime (`@storybook/preview/dist`).
    /// Looked up in `node_modules` when unset.
    pub preview_runtime_dir: Option<PathBuf>,
    pub sourcemap: bool,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from(".storybook"),
            output_dir: PathBuf::from("storybook-static"),
            cwd: None,
            config_type: ConfigType::Development,
            features: Features::default(),
            package_version: None,
            preview_url: None,
            server_channel_url: None,
            preview_runtime_dir: None,
            sourcemap: true,
        }
    }
}

impl PreviewOptions {
    /// Working directory, falling back to the process working directory.
    pub fn working_dir(&self) -> std::io::Result<PathBuf> {
        match &self.cwd {
            Some(cwd) => Ok(cwd.clone()),
            None => std::env::current_dir(),
        }
    }

    /// Absolute configuration directory.
    pub fn resolved_config_dir(&self) -> std::io::Result<PathBuf> {
        Ok(resolve_against(&self.working_dir()?, &self.config_dir))
    }

    /// Absolute output directory.
    pub fn resolved_output_dir(&self) -> std::io::Result<PathBuf> {
        Ok(resolve_against(&self.working_dir()?, &self.output_dir))
    }
}

fn resolve_against(base: &std::path::Path, path: &std::path::Path) -> PathBuf {
    use path_clean::PathClean;

    if path.is_absolute() {
        path.to_path_buf().clean()
    } else {
        base.join(path).clean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_story_store() {
        let options = PreviewOptions::default();
        assert!(options.features.story_store_v7);
        assert!(!options.features.legacy_mdx1);
        assert_eq!(options.config_type, ConfigType::Development);
    }

    #[test]
    fn config_type_serializes_upper_case() {
        let json = serde_json::to_string(&ConfigType::Production).unwrap();
        assert_eq!(json, "\"PRODUCTION\"");
        let parsed: ConfigType = serde_json::from_str("\"DEVELOPMENT\"").unwrap();
        assert_eq!(parsed, ConfigType::Development);
    }

    #[test]
    fn relative_dirs_resolve_against_cwd() {
        let options = PreviewOptions {
            cwd: Some(PathBuf::from("/project")),
            output_dir: PathBuf::from("./dist/../out"),
            ..Default::default()
        };
        assert_eq!(
            options.resolved_output_dir().unwrap(),
            PathBuf::from("/project/out")
        );
        assert_eq!(
            options.resolved_config_dir().unwrap(),
            PathBuf::from("/project/.storybook")
        );
    }

    #[test]
    fn partial_features_keep_defaults() {
        let features: Features = serde_json::from_str(r#"{"legacy_mdx1": true}"#).unwrap();
        assert!(features.legacy_mdx1);
        assert!(features.story_store_v7);
    }
}
