//! Emits `iframe.html` once chunk file names are known.

use std::borrow::Cow;
use std::sync::Arc;

use rolldown_common::{Output, OutputAsset};
use rolldown_plugin::{HookGenerateBundleArgs, HookNoopReturn, HookUsage, Plugin, PluginContext};
use serde::Serialize;

use super::registry::{PluginPhase, PreviewPlugin};

pub const IFRAME_HTML: &str = "iframe.html";

/// Everything the preview template is rendered with.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IframeHtmlOptions {
    /// minijinja source of the page.
    #[serde(skip)]
    pub template: String,
    pub version: String,
    /// `window[name] = value` pairs; values are JSON text.
    pub globals: Vec<(String, String)>,
    /// JSON object installed as `window.process.env`.
    pub env: String,
    pub head_html_snippet: Option<String>,
    pub body_html_snippet: Option<String>,
    /// Input names whose entry chunks get a module script tag, in tag order.
    #[serde(skip)]
    pub entry_names: Vec<String>,
}

#[derive(Serialize)]
struct PageContext<'a> {
    #[serde(flatten)]
    options: &'a IframeHtmlOptions,
    scripts: &'a [String],
}

impl IframeHtmlOptions {
    /// Render the page with module script tags for `scripts`.
    pub fn render(&self, scripts: &[String]) -> anyhow::Result<String> {
        let env = minijinja::Environment::new();
        let context = minijinja::Value::from_serialize(PageContext {
            options: self,
            scripts,
        });
        Ok(env.render_str(&self.template, context)?)
    }
}

/// Writes `iframe.html` into the bundle from `generate_bundle`.
#[derive(Debug, Clone)]
pub struct IframeHtmlPlugin {
    options: Arc<IframeHtmlOptions>,
}

impl IframeHtmlPlugin {
    pub fn new(options: IframeHtmlOptions) -> Self {
        Self {
            options: Arc::new(options),
        }
    }
}

/// File names of entry chunks named in `entry_names`, in that order.
fn entry_scripts<'a>(
    chunks: impl Iterator<Item = (&'a str, &'a str)> + Clone,
    entry_names: &[String],
) -> Vec<String> {
    entry_names
        .iter()
        .filter_map(|name| {
            chunks
                .clone()
                .find(|(chunk_name, _)| *chunk_name == name.as_str())
                .map(|(_, filename)| filename.to_string())
        })
        .collect()
}

impl Plugin for IframeHtmlPlugin {
    fn name(&self) -> Cow<'static, str> {
        "iframe-html".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::GenerateBundle
    }

    fn generate_bundle(
        &self,
        _ctx: &PluginContext,
        args: &mut HookGenerateBundleArgs<'_>,
    ) -> impl std::future::Future<Output = HookNoopReturn> + Send {
        let options = Arc::clone(&self.options);

        async move {
            let entries: Vec<(String, String)> = args
                .bundle
                .iter()
                .filter_map(|output| match output {
                    Output::Chunk(chunk) if chunk.is_entry => {
                        Some((chunk.name.to_string(), chunk.filename.to_string()))
                    }
                    _ => None,
                })
                .collect();

            let scripts = entry_scripts(
                entries.iter().map(|(n, f)| (n.as_str(), f.as_str())),
                &options.entry_names,
            );
            let html = options.render(&scripts)?;
            tracing::debug!(scripts = ?scripts, "Rendered {}", IFRAME_HTML);

            args.bundle.push(Output::Asset(Arc::new(OutputAsset {
                names: vec![],
                original_file_names: vec![],
                filename: IFRAME_HTML.into(),
                source: html.into(),
            })));

            Ok(())
        }
    }
}

impl PreviewPlugin for IframeHtmlPlugin {
    fn phase(&self) -> PluginPhase {
        PluginPhase::PostProcess
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::DEFAULT_PREVIEW_TEMPLATE;

    fn options() -> IframeHtmlOptions {
        IframeHtmlOptions {
            template: DEFAULT_PREVIEW_TEMPLATE.to_string(),
            version: "7.0.0".into(),
            globals: vec![
                ("CONFIG_TYPE".into(), "\"PRODUCTION\"".into()),
                ("LOGLEVEL".into(), "\"info\"".into()),
            ],
            env: "{\"NODE_ENV\":\"production\"}".into(),
            head_html_snippet: Some("<link rel=\"icon\" href=\"/favicon.svg\">".into()),
            body_html_snippet: None,
            entry_names: vec!["storybook-config-entry".into()],
        }
    }

    #[test]
    fn renders_globals_snippets_and_scripts() {
        let html = options()
            .render(&["storybook-config-entry.js".to_string()])
            .unwrap();

        assert!(html.contains("window.STORYBOOK_VERSION = \"7.0.0\";"));
        assert!(html.contains("window[\"CONFIG_TYPE\"] = \"PRODUCTION\";"));
        assert!(html.contains("window.process.env = {\"NODE_ENV\":\"production\"};"));
        assert!(html.contains("<link rel=\"icon\" href=\"/favicon.svg\">"));
        assert!(html.contains("<script type=\"module\" src=\"./storybook-config-entry.js\"></script>"));
        assert!(html.contains("<div id=\"storybook-root\"></div>"));
    }

    #[test]
    fn scripts_follow_entry_name_order() {
        let chunks = [
            ("Button.stories", "Button.stories.js"),
            ("storybook-config-entry", "storybook-config-entry.js"),
            ("polyfills", "polyfills.js"),
        ];
        let names = vec!["polyfills".to_string(), "storybook-config-entry".to_string()];

        let scripts = entry_scripts(chunks.iter().copied(), &names);
        assert_eq!(scripts, vec!["polyfills.js", "storybook-config-entry.js"]);
    }
}
