//! Assembly of the preview ("iframe") bundle configuration.
//!
//! [`iframe_config`] turns resolved presets into a [`PreviewBundleConfig`]:
//! the generated virtual modules, entry points, the global import map and
//! the `iframe.html` inputs. [`bundler_options`] and [`preview_plugins`] then
//! lower that configuration to Rolldown.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fob_preview_config::{
    NormalizedStoriesSpecifier, PreviewAnnotation, PreviewOptions, normalize_stories,
    to_import_path,
};
use fob_preview_mdx::MdxCompileOptions;
use rolldown::{
    BundlerOptions, InputItem, IsExternal, OutputFormat, Platform, RawMinifyOptions,
    ResolveOptions, SourceMapType,
};
use rolldown_plugin::__inner::SharedPluginable;
use serde_json::json;

use crate::entries::{CONFIG_ENTRY_PATH, STORIES_FILENAME, config_entry, to_import_fn};
use crate::error::{BuildError, Result};
use crate::plugins::{
    GlobalImportPlugin, IframeHtmlOptions, IframeHtmlPlugin, MdxLoaderPlugin, PluginRegistry,
    VirtualModulePlugin,
};
use crate::presets::ResolvedPresets;

/// Extensions tried when an import omits one.
pub const RESOLVE_EXTENSIONS: &[&str] = &[".mjs", ".js", ".jsx", ".ts", ".tsx", ".json", ".cjs"];

pub const MAIN_FIELDS: &[&str] = &["browser", "module", "main"];

/// Output chunk name of the runtime entry.
pub const CONFIG_ENTRY_NAME: &str = "storybook-config-entry";

const PREVIEW_FILE_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts"];

/// One bundle input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewInput {
    /// Output chunk name; `None` lets the bundler derive it.
    pub name: Option<String>,
    pub import: String,
}

/// Everything needed to compile the preview.
///
/// The virtual module and global maps are final once built: plugins share
/// them through `Arc` and only read.
#[derive(Debug, Clone)]
pub struct PreviewBundleConfig {
    pub inputs: Vec<PreviewInput>,
    pub cwd: PathBuf,
    pub output_dir: PathBuf,
    pub minify: bool,
    pub sourcemap: bool,
    pub virtual_modules: Arc<BTreeMap<String, String>>,
    pub globals: Arc<BTreeMap<String, String>>,
    /// Left as bare imports in the output.
    pub external: Vec<String>,
    /// `(specifier, target)`; relative targets resolve against `cwd`.
    pub alias: Vec<(String, String)>,
    pub extensions: Vec<String>,
    pub main_fields: Vec<String>,
    pub html: IframeHtmlOptions,
    pub legacy_mdx: bool,
    pub mdx_options: MdxCompileOptions,
    pub stories: Vec<NormalizedStoriesSpecifier>,
    /// Directories whose changes trigger a rebuild while serving.
    pub watch_dirs: Vec<PathBuf>,
}

/// Build the preview bundle configuration.
///
/// Unsupported configurations fail here, before any compiler runs.
pub fn iframe_config(
    options: &PreviewOptions,
    presets: &ResolvedPresets,
    output_dir: &Path,
) -> Result<PreviewBundleConfig> {
    if !options.features.story_store_v7 {
        return Err(BuildError::Config(
            "The preview builder does not support disabled storyStoreV7. Please use the webpack5 or vite builder instead."
                .to_string(),
        ));
    }

    let template = match presets.preview_main_template.as_deref() {
        Some(template) if !template.trim().is_empty() => template.to_string(),
        _ => {
            return Err(BuildError::Config(
                "The preview builder requires a template to be specified. \
                 The previewMainTemplate preset resolved to an empty value."
                    .to_string(),
            ));
        }
    };

    let working_dir = options.working_dir()?;
    let config_dir = options.resolved_config_dir()?;
    let stories = normalize_stories(&presets.stories, &config_dir, &working_dir)?;

    let mut annotations: Vec<String> = presets
        .preview_annotations
        .iter()
        .map(|annotation| match annotation {
            PreviewAnnotation::Bare(bare) => bare.replace('\\', "/"),
            resolved => resolved.import_path(),
        })
        .collect();
    if let Some(preview) = find_preview_file(&config_dir) {
        annotations.push(preview.to_string_lossy().into_owned());
    }

    let mut virtual_modules = BTreeMap::new();
    virtual_modules.insert(STORIES_FILENAME.to_string(), to_import_fn(&stories));
    virtual_modules.insert(
        CONFIG_ENTRY_PATH.to_string(),
        config_entry(STORIES_FILENAME, &annotations)?,
    );

    let mut inputs: Vec<PreviewInput> = presets
        .entries
        .iter()
        .map(|entry| PreviewInput {
            name: Some(entry_name(entry)),
            import: entry.clone(),
        })
        .collect();
    inputs.push(PreviewInput {
        name: Some(CONFIG_ENTRY_NAME.to_string()),
        import: CONFIG_ENTRY_PATH.to_string(),
    });
    let html_entries: Vec<String> = inputs.iter().filter_map(|i| i.name.clone()).collect();

    // Story files are inputs of their own, named after their import path so
    // `importFn` finds them next to the entry chunk.
    for specifier in &stories {
        for file in specifier.discover_files(&working_dir) {
            let import_path = to_import_path(&working_dir, &file);
            inputs.push(PreviewInput {
                name: Some(story_chunk_name(&import_path)),
                import: file.to_string_lossy().into_owned(),
            });
        }
    }
    tracing::debug!(inputs = inputs.len(), stories = stories.len(), "Collected preview inputs");

    let html = IframeHtmlOptions {
        template,
        version: options
            .package_version
            .clone()
            .unwrap_or_else(|| "undefined".to_string()),
        globals: runtime_globals(options, presets, &stories)?,
        env: process_env(options, &presets.env)?,
        head_html_snippet: presets.preview_head.clone(),
        body_html_snippet: presets.preview_body.clone(),
        entry_names: html_entries,
    };

    let mut watch_dirs: Vec<PathBuf> = stories
        .iter()
        .map(|s| path_clean::clean(working_dir.join(&s.directory)))
        .collect();
    watch_dirs.push(config_dir);
    watch_dirs.dedup();

    Ok(PreviewBundleConfig {
        inputs,
        cwd: working_dir,
        output_dir: output_dir.to_path_buf(),
        minify: options.config_type.is_production(),
        sourcemap: options.sourcemap,
        virtual_modules: Arc::new(virtual_modules),
        globals: Arc::new(presets.globals.clone()),
        external: Vec::new(),
        alias: Vec::new(),
        extensions: RESOLVE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        main_fields: MAIN_FIELDS.iter().map(|f| f.to_string()).collect(),
        html,
        legacy_mdx: options.features.legacy_mdx1,
        mdx_options: presets.mdx_compile_options.clone(),
        stories,
        watch_dirs,
    })
}

/// `preview.*` in the config directory, falling back to the deprecated `config.*`.
pub fn find_preview_file(config_dir: &Path) -> Option<PathBuf> {
    let find = |stem: &str| {
        PREVIEW_FILE_EXTENSIONS
            .iter()
            .map(|ext| config_dir.join(format!("{}.{}", stem, ext)))
            .find(|candidate| candidate.is_file())
    };

    find("preview").or_else(|| {
        let config = find("config")?;
        tracing::warn!(
            file = %config.display(),
            "`config.*` in the configuration directory is deprecated, rename it to `preview.*`"
        );
        Some(config)
    })
}

/// Chunk name for a preset entry: its file stem.
fn entry_name(entry: &str) -> String {
    let trimmed = entry.trim_end_matches('/');
    let file = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file.to_string(),
    }
}

/// `./src/Button.stories.tsx` becomes `src/Button.stories`.
fn story_chunk_name(import_path: &str) -> String {
    let path = import_path.strip_prefix("./").unwrap_or(import_path);
    let (dir, file) = match path.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, path),
    };
    let stem = match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file,
    };
    match dir {
        Some(dir) => format!("{}/{}", dir, stem),
        None => stem.to_string(),
    }
}

/// `window` globals read by the preview runtime, as JSON text.
fn runtime_globals(
    options: &PreviewOptions,
    presets: &ResolvedPresets,
    stories: &[NormalizedStoriesSpecifier],
) -> Result<Vec<(String, String)>> {
    let features = json!({
        "storyStoreV7": options.features.story_store_v7,
        "legacyMdx1": options.features.legacy_mdx1,
        "buildStoriesJson": options.features.build_stories_json,
    });

    let values = [
        ("CONFIG_TYPE", json!(options.config_type)),
        ("LOGLEVEL", json!(presets.log_level)),
        ("FRAMEWORK_OPTIONS", presets.framework_options.clone()),
        ("CHANNEL_OPTIONS", presets.core.channel_options.clone()),
        ("FEATURES", features),
        ("PREVIEW_URL", json!(options.preview_url)),
        ("STORIES", serde_json::to_value(stories).map_err(json_error)?),
        ("DOCS_OPTIONS", serde_json::to_value(&presets.docs).map_err(json_error)?),
        ("SERVER_CHANNEL_URL", json!(options.server_channel_url)),
    ];

    values
        .into_iter()
        .map(|(name, value)| {
            let text = serde_json::to_string(&value).map_err(json_error)?;
            Ok((name.to_string(), text))
        })
        .collect()
}

/// Preset `env` plus `NODE_ENV` derived from the config type.
fn process_env(options: &PreviewOptions, env: &BTreeMap<String, String>) -> Result<String> {
    let mut env = env.clone();
    env.entry("NODE_ENV".to_string()).or_insert_with(|| {
        if options.config_type.is_production() {
            "production".to_string()
        } else {
            "development".to_string()
        }
    });
    serde_json::to_string(&env).map_err(json_error)
}

fn json_error(e: serde_json::Error) -> BuildError {
    BuildError::Config(format!("Failed to serialize preview globals: {}", e))
}

/// Lower the configuration to Rolldown options.
pub fn bundler_options(config: &PreviewBundleConfig) -> BundlerOptions {
    BundlerOptions {
        input: Some(
            config
                .inputs
                .iter()
                .map(|input| InputItem {
                    name: input.name.clone(),
                    import: input.import.clone(),
                })
                .collect(),
        ),
        cwd: Some(config.cwd.clone()),
        format: Some(OutputFormat::Esm),
        platform: Some(Platform::Browser),
        sourcemap: config.sourcemap.then_some(SourceMapType::File),
        minify: config.minify.then(|| RawMinifyOptions::from(true)),
        external: Some(IsExternal::from(config.external.clone())),
        resolve: Some(resolve_options(config)),
        ..Default::default()
    }
}

fn resolve_options(config: &PreviewBundleConfig) -> ResolveOptions {
    let mut modules: Vec<String> = config
        .cwd
        .ancestors()
        .map(|dir| dir.join("node_modules").to_string_lossy().into_owned())
        .collect();
    modules.push("node_modules".to_string());

    let alias = (!config.alias.is_empty()).then(|| {
        config
            .alias
            .iter()
            .map(|(specifier, target)| {
                let target = Path::new(target);
                let absolute = if target.is_absolute() {
                    target.to_path_buf()
                } else {
                    config.cwd.join(target)
                };
                (
                    specifier.clone(),
                    vec![Some(absolute.to_string_lossy().into_owned())],
                )
            })
            .collect()
    });

    ResolveOptions {
        alias,
        main_fields: Some(config.main_fields.clone()),
        condition_names: Some(vec![
            "browser".to_string(),
            "import".to_string(),
            "module".to_string(),
            "default".to_string(),
        ]),
        extensions: Some(config.extensions.clone()),
        modules: Some(modules),
        symlinks: Some(true),
        ..Default::default()
    }
}

/// The preview plugins in phase order: virtual modules, global imports,
/// documentation files, then `iframe.html`.
pub fn preview_plugins(config: &PreviewBundleConfig) -> Result<Vec<SharedPluginable>> {
    let mut registry = PluginRegistry::new();

    registry.add(
        VirtualModulePlugin::new(
            Arc::clone(&config.virtual_modules),
            config.cwd.clone(),
            config.extensions.clone(),
        )
        .map_err(|e| BuildError::Config(format!("Invalid virtual module map: {}", e)))?,
    );
    registry.add(
        GlobalImportPlugin::new(Arc::clone(&config.globals))
            .map_err(|e| BuildError::Config(format!("Invalid global import map: {}", e)))?,
    );
    registry.add(MdxLoaderPlugin::new(
        config.cwd.clone(),
        config.legacy_mdx,
        config.mdx_options.clone(),
    ));
    registry.add(IframeHtmlPlugin::new(config.html.clone()));

    Ok(registry.into_rolldown_plugins())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{PresetHooks, resolve_presets};
    use fob_preview_config::{PresetConfig, StoriesEntry};
    use std::fs;
    use tempfile::TempDir;

    fn project() -> (TempDir, PreviewOptions) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".storybook")).unwrap();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::write(root.join(".storybook/preview.js"), "export const parameters = {};").unwrap();
        fs::write(root.join("src/Button.stories.js"), "export default {};").unwrap();
        fs::write(root.join("src/nested/Card.stories.js"), "export default {};").unwrap();

        let options = PreviewOptions {
            cwd: Some(root.to_path_buf()),
            ..Default::default()
        };
        (dir, options)
    }

    async fn resolved(presets: &dyn PresetHooks, options: &PreviewOptions) -> ResolvedPresets {
        resolve_presets(presets, options).await.unwrap()
    }

    fn presets() -> PresetConfig {
        PresetConfig {
            stories: vec![StoriesEntry::Pattern("../src/**/*.stories.js".into())],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn disabled_story_store_is_rejected_first() {
        let (_dir, mut options) = project();
        options.features.story_store_v7 = false;
        let mut resolved = resolved(&presets(), &options).await;
        resolved.preview_main_template = None;

        let err = iframe_config(&options, &resolved, Path::new("/out")).unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
        assert!(err.to_string().contains("storyStoreV7"));
    }

    #[tokio::test]
    async fn missing_template_is_a_config_error() {
        let (_dir, options) = project();
        let mut resolved = resolved(&presets(), &options).await;
        resolved.preview_main_template = Some("   ".into());

        let err = iframe_config(&options, &resolved, Path::new("/out")).unwrap_err();
        assert!(err.to_string().contains("requires a template"));
    }

    #[tokio::test]
    async fn assembles_entries_virtual_modules_and_story_inputs() {
        let (dir, options) = project();
        let resolved = resolved(&presets(), &options).await;
        let config = iframe_config(&options, &resolved, &dir.path().join("out")).unwrap();

        assert!(config.virtual_modules.contains_key(STORIES_FILENAME));
        let entry = &config.virtual_modules[CONFIG_ENTRY_PATH];
        assert!(entry.contains("preview.js"));

        assert_eq!(config.inputs[0].import, CONFIG_ENTRY_PATH);
        assert_eq!(config.inputs[0].name.as_deref(), Some(CONFIG_ENTRY_NAME));
        let story_names: Vec<_> = config.inputs[1..]
            .iter()
            .map(|i| i.name.clone().unwrap())
            .collect();
        assert_eq!(story_names, vec!["src/Button.stories", "src/nested/Card.stories"]);

        assert_eq!(config.html.entry_names, vec![CONFIG_ENTRY_NAME]);
        assert!(!config.minify);
        assert_eq!(config.globals.len(), 12);
        assert!(config.watch_dirs.contains(&dir.path().join("src")));
    }

    #[tokio::test]
    async fn globals_json_carries_runtime_settings() {
        let (dir, mut options) = project();
        options.config_type = fob_preview_config::ConfigType::Production;
        options.preview_url = Some("/iframe.html".into());
        let resolved = resolved(&presets(), &options).await;
        let config = iframe_config(&options, &resolved, dir.path()).unwrap();

        let globals: BTreeMap<_, _> = config.html.globals.iter().cloned().collect();
        assert_eq!(globals["CONFIG_TYPE"], "\"PRODUCTION\"");
        assert_eq!(globals["PREVIEW_URL"], "\"/iframe.html\"");
        assert_eq!(globals["LOGLEVEL"], "null");
        let stories: serde_json::Value = serde_json::from_str(&globals["STORIES"]).unwrap();
        assert_eq!(stories[0]["directory"], "./src");
        assert!(stories[0]["importPathMatcher"].is_string());
        assert!(globals["FEATURES"].contains("\"storyStoreV7\":true"));
        assert!(config.html.env.contains("\"NODE_ENV\":\"production\""));
        assert!(config.minify);
    }

    #[test]
    fn entry_and_story_chunk_names() {
        assert_eq!(entry_name("./storybook-config-entry.js"), "storybook-config-entry");
        assert_eq!(entry_name("@acme/polyfills"), "polyfills");
        assert_eq!(story_chunk_name("./src/Button.stories.tsx"), "src/Button.stories");
        assert_eq!(story_chunk_name("./intro.mdx"), "intro");
    }

    #[test]
    fn bundler_options_follow_config() {
        let config = PreviewBundleConfig {
            inputs: vec![PreviewInput {
                name: Some("a".into()),
                import: "./a.js".into(),
            }],
            cwd: PathBuf::from("/project/app"),
            output_dir: PathBuf::from("/project/out"),
            minify: true,
            sourcemap: true,
            virtual_modules: Arc::default(),
            globals: Arc::default(),
            external: vec!["react".into()],
            alias: vec![("@".into(), "src".into())],
            extensions: vec![".js".into()],
            main_fields: vec!["module".into()],
            html: IframeHtmlOptions::default(),
            legacy_mdx: false,
            mdx_options: MdxCompileOptions::default(),
            stories: Vec::new(),
            watch_dirs: Vec::new(),
        };
        let options = bundler_options(&config);

        assert_eq!(options.input.as_ref().unwrap().len(), 1);
        assert!(options.minify.is_some());
        assert!(matches!(options.sourcemap, Some(SourceMapType::File)));
        let resolve = options.resolve.unwrap();
        let modules = resolve.modules.unwrap();
        assert_eq!(modules[0], "/project/app/node_modules");
        assert_eq!(modules.last().map(String::as_str), Some("node_modules"));
        let alias = resolve.alias.unwrap();
        assert_eq!(alias[0].1, vec![Some("/project/app/src".to_string())]);

        assert_eq!(preview_plugins(&config).unwrap().len(), 4);
    }

    #[test]
    fn config_file_is_a_deprecated_fallback() {
        let dir = TempDir::new().unwrap();
        assert!(find_preview_file(dir.path()).is_none());
        fs::write(dir.path().join("config.ts"), "").unwrap();
        assert_eq!(find_preview_file(dir.path()), Some(dir.path().join("config.ts")));
        fs::write(dir.path().join("preview.tsx"), "").unwrap();
        assert_eq!(find_preview_file(dir.path()), Some(dir.path().join("preview.tsx")));
    }
}
