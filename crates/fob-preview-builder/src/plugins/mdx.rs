//! Loads `.mdx` documents through the documentation compiler.
//!
//! `resolve_id` claims `.mdx` imports so paths stay absolute even when the
//! importer is a virtual module without a location on disk. `load` reads the
//! file and hands the compiled JSX back to the bundler.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use fob_preview_mdx::{DocsCompiler, MdxCompileOptions, compiler_for, is_story_document, with_docs_plugins};
use rolldown_common::ModuleType;
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookLoadReturn, HookResolveIdArgs, HookResolveIdOutput,
    HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};

use super::registry::{PluginPhase, PreviewPlugin};
use super::virtual_modules::VirtualModulePlugin;

/// Compiles documentation files with the front-end picked at construction.
#[derive(Clone)]
pub struct MdxLoaderPlugin {
    compiler: Arc<dyn DocsCompiler>,
    /// Base options; documentation plugins already appended.
    options: MdxCompileOptions,
    cwd: PathBuf,
}

impl std::fmt::Debug for MdxLoaderPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MdxLoaderPlugin")
            .field("compiler", &self.compiler.name())
            .field("options", &self.options)
            .field("cwd", &self.cwd)
            .finish()
    }
}

impl MdxLoaderPlugin {
    /// `legacy` selects the MDX1 front-end. The heading-anchor and
    /// external-link plugins run after any plugin already in `options`.
    pub fn new(cwd: PathBuf, legacy: bool, mut options: MdxCompileOptions) -> Self {
        options.plugins = with_docs_plugins(std::mem::take(&mut options.plugins));
        Self {
            compiler: compiler_for(legacy),
            options,
            cwd,
        }
    }

    pub fn compiler_name(&self) -> &'static str {
        self.compiler.name()
    }

    /// Options for one file. Story exports are skipped unless the file is
    /// named like a story document.
    pub fn options_for(&self, path: &str) -> MdxCompileOptions {
        let mut options = self.options.clone();
        options.filepath = Some(path.to_string());
        options.skip_csf = !is_story_document(path);
        options
    }

    /// Absolute path for an `.mdx` import, `None` for anything else.
    pub fn resolve(&self, specifier: &str, importer: Option<&str>) -> Option<PathBuf> {
        if !specifier.ends_with(".mdx") {
            return None;
        }

        let path = Path::new(specifier);
        if path.is_absolute() {
            return Some(path.to_path_buf());
        }

        let base = match importer {
            Some(importer) if !VirtualModulePlugin::is_virtual(importer) => Path::new(importer)
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.cwd.clone()),
            _ => self.cwd.clone(),
        };
        let resolved = path_clean::clean(base.join(path));
        resolved.exists().then_some(resolved)
    }

    /// Compile a document's source text.
    pub fn compile(&self, path: &str, source: &str) -> anyhow::Result<String> {
        let options = self.options_for(path);
        self.compiler
            .compile(source, &options)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Failed to compile documentation file: {}", path))
    }
}

impl Plugin for MdxLoaderPlugin {
    fn name(&self) -> Cow<'static, str> {
        "preview-mdx".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId | HookUsage::Load
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs<'_>,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let resolved = self.resolve(args.specifier, args.importer);

        async move {
            Ok(resolved.map(|path| HookResolveIdOutput {
                id: path.to_string_lossy().into_owned().into(),
                ..Default::default()
            }))
        }
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let id = args.id.to_string();
        let plugin = self.clone();

        async move {
            if !id.ends_with(".mdx") {
                return Ok(None);
            }

            let path = if Path::new(&id).is_absolute() {
                PathBuf::from(&id)
            } else {
                plugin.cwd.join(&id)
            };
            let source = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read documentation file: {}", path.display()))?;

            let code = plugin.compile(&id, &source)?;
            tracing::debug!(
                path = %path.display(),
                compiler = plugin.compiler.name(),
                code_len = code.len(),
                "Compiled documentation file"
            );

            Ok(Some(HookLoadOutput {
                code: code.into(),
                module_type: Some(ModuleType::Jsx),
                ..Default::default()
            }))
        }
    }
}

impl PreviewPlugin for MdxLoaderPlugin {
    fn phase(&self) -> PluginPhase {
        PluginPhase::Transform
    }
}
