//! In-memory modules served instead of files.
//!
//! Every key of the map registers a filter matching import paths that end with
//! that key. A match moves the import into the `\0virtual-module:` namespace;
//! ids already in the namespace are returned untouched, so one virtual module
//! importing another resolves in a single step and never loops.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::RegexSet;
use rolldown_common::ModuleType;
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookLoadReturn, HookResolveIdArgs, HookResolveIdOutput,
    HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};

use super::registry::{PluginPhase, PreviewPlugin};

/// Namespace prefix of virtual module ids.
pub const VIRTUAL_PREFIX: &str = "\0virtual-module:";

/// Serves a fixed map of module path to source text.
#[derive(Debug, Clone)]
pub struct VirtualModulePlugin {
    modules: Arc<BTreeMap<String, String>>,
    /// Keys in map order, index-aligned with `filters`.
    keys: Vec<String>,
    filters: RegexSet,
    /// Resolution base for relative imports made from a virtual module.
    cwd: PathBuf,
    extensions: Vec<String>,
}

impl VirtualModulePlugin {
    pub fn new(
        modules: Arc<BTreeMap<String, String>>,
        cwd: PathBuf,
        extensions: Vec<String>,
    ) -> anyhow::Result<Self> {
        let keys: Vec<String> = modules.keys().cloned().collect();
        let filters = RegexSet::new(keys.iter().map(|key| format!("{}$", regex::escape(key))))?;
        Ok(Self {
            modules,
            keys,
            filters,
            cwd,
            extensions,
        })
    }

    pub fn is_virtual(id: &str) -> bool {
        id.starts_with(VIRTUAL_PREFIX)
    }

    /// Resolve an import to a virtual id, or to a file when a virtual module
    /// imports something relative. `None` leaves the import to the bundler.
    pub fn resolve(&self, specifier: &str, importer: Option<&str>) -> Option<String> {
        if let Some(key) = specifier.strip_prefix(VIRTUAL_PREFIX) {
            return self.modules.contains_key(key).then(|| specifier.to_string());
        }

        if let Some(key) = self.matching_key(specifier) {
            return Some(format!("{}{}", VIRTUAL_PREFIX, key));
        }

        match importer {
            Some(importer) if Self::is_virtual(importer) && is_relative(specifier) => self
                .probe(&self.cwd.join(specifier))
                .map(|path| path.to_string_lossy().into_owned()),
            _ => None,
        }
    }

    /// Stored text for a virtual id.
    pub fn load_source(&self, id: &str) -> Option<&str> {
        let key = id.strip_prefix(VIRTUAL_PREFIX)?;
        self.modules.get(key).map(String::as_str)
    }

    /// The longest key the specifier ends with.
    fn matching_key(&self, specifier: &str) -> Option<&str> {
        self.filters
            .matches(specifier)
            .into_iter()
            .map(|index| self.keys[index].as_str())
            .max_by_key(|key| key.len())
    }

    fn probe(&self, base: &Path) -> Option<PathBuf> {
        let base = path_clean::clean(base);
        if base.is_file() {
            return Some(base);
        }
        let name = base.file_name()?.to_string_lossy().into_owned();
        self.extensions
            .iter()
            .map(|ext| base.with_file_name(format!("{}{}", name, ext)))
            .chain(
                self.extensions
                    .iter()
                    .map(|ext| base.join(format!("index{}", ext))),
            )
            .find(|candidate| candidate.is_file())
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../")
}

impl Plugin for VirtualModulePlugin {
    fn name(&self) -> Cow<'static, str> {
        "virtual-module".into()
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
            Ok(resolved.map(|id| HookResolveIdOutput {
                id: id.into(),
                ..Default::default()
            }))
        }
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let source = self.load_source(args.id).map(str::to_owned);

        async move {
            Ok(source.map(|code| HookLoadOutput {
                code: code.into(),
                module_type: Some(ModuleType::Js),
                ..Default::default()
            }))
        }
    }
}

impl PreviewPlugin for VirtualModulePlugin {
    fn phase(&self) -> PluginPhase {
        PluginPhase::Virtual
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn plugin(cwd: &Path, modules: &[(&str, &str)]) -> VirtualModulePlugin {
        let map = modules
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        VirtualModulePlugin::new(
            Arc::new(map),
            cwd.to_path_buf(),
            vec![".mjs".into(), ".js".into(), ".jsx".into()],
        )
        .unwrap()
    }

    #[test]
    fn virtual_text_wins_over_disk() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("storybook-stories.js"), "on disk").unwrap();
        let source = "export const importFn = async () => {};\n// \u{e9}\r\n";
        let plugin = plugin(dir.path(), &[("./storybook-stories.js", source)]);

        let id = plugin.resolve("./storybook-stories.js", None).unwrap();
        assert_eq!(id, "\0virtual-module:./storybook-stories.js");
        assert_eq!(plugin.load_source(&id).unwrap().as_bytes(), source.as_bytes());
    }

    #[test]
    fn paths_ending_with_a_key_match() {
        let plugin = plugin(Path::new("/tmp"), &[("./storybook-stories.js", "a")]);
        assert!(plugin.resolve("/abs/storybook-stories.js", None).is_none());
        assert!(plugin.resolve("../x/./storybook-stories.js", None).is_some());
        assert!(plugin.resolve("./storybook-stories.jsx", None).is_none());
    }

    #[test]
    fn namespaced_ids_are_not_reclassified() {
        let plugin = plugin(
            Path::new("/tmp"),
            &[("./entry.js", "import './stories.js'"), ("./stories.js", "export {}")],
        );
        let entry = plugin.resolve("./entry.js", None).unwrap();
        assert_eq!(plugin.resolve(&entry, None).as_deref(), Some(entry.as_str()));

        let stories = plugin.resolve("./stories.js", Some(&entry)).unwrap();
        assert_eq!(stories, "\0virtual-module:./stories.js");
        assert_eq!(plugin.load_source(&stories), Some("export {}"));
        assert!(plugin.resolve("\0virtual-module:./unknown.js", None).is_none());
    }

    #[test]
    fn longest_key_wins() {
        let plugin = plugin(
            Path::new("/tmp"),
            &[("stories.js", "short"), ("./storybook-stories.js", "long")],
        );
        let id = plugin.resolve("./storybook-stories.js", None).unwrap();
        assert_eq!(plugin.load_source(&id), Some("long"));
    }

    #[test]
    fn relative_imports_from_virtual_modules_use_cwd() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".storybook")).unwrap();
        std::fs::write(dir.path().join(".storybook/preview.js"), "").unwrap();
        let plugin = plugin(dir.path(), &[("./storybook-config-entry.js", "")]);
        let importer = "\0virtual-module:./storybook-config-entry.js";

        let resolved = plugin.resolve("./.storybook/preview", Some(importer)).unwrap();
        assert_eq!(
            PathBuf::from(resolved),
            dir.path().join(".storybook/preview.js")
        );

        // Only virtual importers get this treatment.
        assert!(plugin.resolve("./.storybook/preview", Some("/src/a.js")).is_none());
        assert!(plugin.resolve("./missing", Some(importer)).is_none());
    }
}
