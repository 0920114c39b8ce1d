//! Preset hooks and their resolution order.
//!
//! A preset chain contributes configuration through named hooks. Every hook
//! has a default, may be asynchronous, and is awaited in a fixed order by
//! [`resolve_presets`]. [`PresetHooks::bundler_final`] runs after the bundle
//! configuration has been assembled and is the embedder's last override.

use std::collections::BTreeMap;

use async_trait::async_trait;
use fob_preview_config::{
    CoreConfig, DocsOptions, PresetConfig, PreviewAnnotation, PreviewOptions, StoriesEntry,
};
use fob_preview_mdx::MdxCompileOptions;
use serde_json::Value;

use crate::error::{BuildError, Result};
use crate::iframe::PreviewBundleConfig;

/// Template used for `iframe.html` when no preset supplies one.
pub const DEFAULT_PREVIEW_TEMPLATE: &str = include_str!("../templates/iframe.html.jinja");

/// Provider module handed to the current MDX front-end by default.
pub const DEFAULT_PROVIDER_IMPORT_SOURCE: &str = "@storybook/addon-docs/mdx-react-shim";

/// Packages the preview runtime exposes as globals instead of bundling them.
const RUNTIME_GLOBALS: &[(&str, &str)] = &[
    ("@storybook/addons", "__STORYBOOK_MODULE_ADDONS__"),
    ("@storybook/channel-postmessage", "__STORYBOOK_MODULE_CHANNEL_POSTMESSAGE__"),
    ("@storybook/channel-websocket", "__STORYBOOK_MODULE_CHANNEL_WEBSOCKET__"),
    ("@storybook/channels", "__STORYBOOK_MODULE_CHANNELS__"),
    ("@storybook/client-api", "__STORYBOOK_MODULE_CLIENT_API__"),
    ("@storybook/client-logger", "__STORYBOOK_MODULE_CLIENT_LOGGER__"),
    ("@storybook/core-client", "__STORYBOOK_MODULE_CORE_CLIENT__"),
    ("@storybook/core-events", "__STORYBOOK_MODULE_CORE_EVENTS__"),
    ("@storybook/global", "__STORYBOOK_MODULE_GLOBAL__"),
    ("@storybook/preview-api", "__STORYBOOK_MODULE_PREVIEW_API__"),
    ("@storybook/preview-web", "__STORYBOOK_MODULE_PREVIEW_WEB__"),
    ("@storybook/store", "__STORYBOOK_MODULE_STORE__"),
];

/// The package name to runtime global map used when no preset overrides it.
pub fn default_globals() -> BTreeMap<String, String> {
    RUNTIME_GLOBALS
        .iter()
        .map(|(module, global)| (module.to_string(), global.to_string()))
        .collect()
}

/// Named configuration hooks contributed by presets.
///
/// Hooks receive the invocation options and return their value. Errors are
/// reported as [`BuildError::Preset`] naming the hook.
#[async_trait]
pub trait PresetHooks: Send + Sync {
    async fn core(&self, _options: &PreviewOptions) -> anyhow::Result<CoreConfig> {
        Ok(CoreConfig::default())
    }

    async fn framework_options(&self, _options: &PreviewOptions) -> anyhow::Result<Value> {
        Ok(Value::Null)
    }

    async fn env(&self, _options: &PreviewOptions) -> anyhow::Result<BTreeMap<String, String>> {
        Ok(BTreeMap::new())
    }

    async fn log_level(&self, _options: &PreviewOptions) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    async fn preview_head(&self, _options: &PreviewOptions) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    async fn preview_body(&self, _options: &PreviewOptions) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    /// Source text of the `iframe.html` template.
    async fn preview_main_template(
        &self,
        _options: &PreviewOptions,
    ) -> anyhow::Result<Option<String>> {
        Ok(Some(DEFAULT_PREVIEW_TEMPLATE.to_string()))
    }

    async fn docs(&self, _options: &PreviewOptions) -> anyhow::Result<DocsOptions> {
        Ok(DocsOptions::default())
    }

    async fn entries(&self, _options: &PreviewOptions) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn stories(&self, _options: &PreviewOptions) -> anyhow::Result<Vec<StoriesEntry>> {
        Ok(Vec::new())
    }

    async fn preview_annotations(
        &self,
        _options: &PreviewOptions,
    ) -> anyhow::Result<Vec<PreviewAnnotation>> {
        Ok(Vec::new())
    }

    async fn globals(&self, _options: &PreviewOptions) -> anyhow::Result<BTreeMap<String, String>> {
        Ok(default_globals())
    }

    /// Adjust the documentation compiler options. Receives the defaults.
    async fn mdx_compile_options(
        &self,
        _options: &PreviewOptions,
        compile_options: MdxCompileOptions,
    ) -> anyhow::Result<MdxCompileOptions> {
        Ok(compile_options)
    }

    /// Final say over the assembled bundle configuration.
    async fn bundler_final(
        &self,
        _options: &PreviewOptions,
        config: PreviewBundleConfig,
    ) -> anyhow::Result<PreviewBundleConfig> {
        Ok(config)
    }
}

/// Presets loaded from configuration files are plain data.
#[async_trait]
impl PresetHooks for PresetConfig {
    async fn core(&self, _options: &PreviewOptions) -> anyhow::Result<CoreConfig> {
        Ok(self.core.clone())
    }

    async fn framework_options(&self, _options: &PreviewOptions) -> anyhow::Result<Value> {
        Ok(self.framework_options.clone())
    }

    async fn env(&self, _options: &PreviewOptions) -> anyhow::Result<BTreeMap<String, String>> {
        Ok(self.env.clone())
    }

    async fn log_level(&self, _options: &PreviewOptions) -> anyhow::Result<Option<String>> {
        Ok(self.log_level.clone())
    }

    async fn preview_head(&self, _options: &PreviewOptions) -> anyhow::Result<Option<String>> {
        Ok(self.preview_head.clone())
    }

    async fn preview_body(&self, _options: &PreviewOptions) -> anyhow::Result<Option<String>> {
        Ok(self.preview_body.clone())
    }

    async fn preview_main_template(
        &self,
        options: &PreviewOptions,
    ) -> anyhow::Result<Option<String>> {
        let Some(path) = &self.preview_main_template else {
            return Ok(Some(DEFAULT_PREVIEW_TEMPLATE.to_string()));
        };

        // Relative template paths are written against the config directory.
        let path = if path.is_absolute() {
            path.clone()
        } else {
            options.resolved_config_dir()?.join(path)
        };
        let template = tokio::fs::read_to_string(&path).await.map_err(|e| {
            anyhow::anyhow!("Failed to read preview template {}: {}", path.display(), e)
        })?;
        Ok(Some(template))
    }

    async fn docs(&self, _options: &PreviewOptions) -> anyhow::Result<DocsOptions> {
        Ok(self.docs.clone())
    }

    async fn entries(&self, _options: &PreviewOptions) -> anyhow::Result<Vec<String>> {
        Ok(self.entries.clone())
    }

    async fn stories(&self, _options: &PreviewOptions) -> anyhow::Result<Vec<StoriesEntry>> {
        Ok(self.stories.clone())
    }

    async fn preview_annotations(
        &self,
        _options: &PreviewOptions,
    ) -> anyhow::Result<Vec<PreviewAnnotation>> {
        Ok(self.preview_annotations.clone())
    }

    async fn globals(&self, _options: &PreviewOptions) -> anyhow::Result<BTreeMap<String, String>> {
        Ok(self.globals.clone().unwrap_or_else(default_globals))
    }

    async fn mdx_compile_options(
        &self,
        _options: &PreviewOptions,
        mut compile_options: MdxCompileOptions,
    ) -> anyhow::Result<MdxCompileOptions> {
        compile_options.gfm = self.mdx.gfm;
        compile_options.footnotes = self.mdx.footnotes;
        compile_options.math = self.mdx.math;
        if let Some(source) = &self.mdx.provider_import_source {
            compile_options.provider_import_source = Some(source.clone());
        }
        Ok(compile_options)
    }
}

/// Every hook's value after resolution.
#[derive(Debug, Clone)]
pub struct ResolvedPresets {
    pub core: CoreConfig,
    pub framework_options: Value,
    pub env: BTreeMap<String, String>,
    pub log_level: Option<String>,
    pub preview_head: Option<String>,
    pub preview_body: Option<String>,
    pub preview_main_template: Option<String>,
    pub docs: DocsOptions,
    pub entries: Vec<String>,
    pub stories: Vec<StoriesEntry>,
    pub preview_annotations: Vec<PreviewAnnotation>,
    pub globals: BTreeMap<String, String>,
    pub mdx_compile_options: MdxCompileOptions,
}

/// Apply every hook in order: `core`, `framework_options`, `env`, `log_level`,
/// `preview_head`, `preview_body`, `preview_main_template`, `docs`, `entries`,
/// `stories`, `preview_annotations`, `globals`, `mdx_compile_options`.
pub async fn resolve_presets(
    hooks: &dyn PresetHooks,
    options: &PreviewOptions,
) -> Result<ResolvedPresets> {
    let core = hooks.core(options).await.map_err(|e| BuildError::preset("core", e))?;
    let framework_options = hooks
        .framework_options(options)
        .await
        .map_err(|e| BuildError::preset("framework_options", e))?;
    let env = hooks.env(options).await.map_err(|e| BuildError::preset("env", e))?;
    let log_level = hooks
        .log_level(options)
        .await
        .map_err(|e| BuildError::preset("log_level", e))?;
    let preview_head = hooks
        .preview_head(options)
        .await
        .map_err(|e| BuildError::preset("preview_head", e))?;
    let preview_body = hooks
        .preview_body(options)
        .await
        .map_err(|e| BuildError::preset("preview_body", e))?;
    let preview_main_template = hooks
        .preview_main_template(options)
        .await
        .map_err(|e| BuildError::preset("preview_main_template", e))?;
    let docs = hooks.docs(options).await.map_err(|e| BuildError::preset("docs", e))?;
    let entries = hooks
        .entries(options)
        .await
        .map_err(|e| BuildError::preset("entries", e))?;
    let stories = hooks
        .stories(options)
        .await
        .map_err(|e| BuildError::preset("stories", e))?;
    let preview_annotations = hooks
        .preview_annotations(options)
        .await
        .map_err(|e| BuildError::preset("preview_annotations", e))?;
    let globals = hooks
        .globals(options)
        .await
        .map_err(|e| BuildError::preset("globals", e))?;

    let defaults = MdxCompileOptions::builder()
        .provider_import_source(DEFAULT_PROVIDER_IMPORT_SOURCE)
        .build();
    let mdx_compile_options = hooks
        .mdx_compile_options(options, defaults)
        .await
        .map_err(|e| BuildError::preset("mdx_compile_options", e))?;

    Ok(ResolvedPresets {
        core,
        framework_options,
        env,
        log_level,
        preview_head,
        preview_body,
        preview_main_template,
        docs,
        entries,
        stories,
        preview_annotations,
        globals,
        mdx_compile_options,
    })
}
