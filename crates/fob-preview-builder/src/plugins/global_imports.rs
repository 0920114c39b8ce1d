//! Global-import resolution.
//!
//! Imports of packages the preview runtime already loaded (for example
//! `@storybook/preview-api`) must not be bundled again. Each one resolves to a
//! synthetic module in the `\0external-global:` namespace whose whole body is
//! `module.exports = <GLOBAL>;`.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::bail;
use regex::Regex;
use rolldown_common::ModuleType;
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookLoadReturn, HookResolveIdArgs, HookResolveIdOutput,
    HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};

use super::registry::{PluginPhase, PreviewPlugin};

/// Namespace prefix of synthesized global modules.
pub const GLOBAL_PREFIX: &str = "\0external-global:";

/// Rewrites imports of known packages to runtime globals.
#[derive(Debug, Clone)]
pub struct GlobalImportPlugin {
    mapping: Arc<BTreeMap<String, String>>,
    /// `^(?:a|b)$`. `None` when the map is empty, so nothing is intercepted.
    filter: Option<Regex>,
}

impl GlobalImportPlugin {
    pub fn new(mapping: Arc<BTreeMap<String, String>>) -> anyhow::Result<Self> {
        let filter = build_filter(mapping.keys().map(String::as_str))?;
        Ok(Self { mapping, filter })
    }

    /// Build with an explicit filter. The filter must agree with the map; a
    /// path it matches that the map lacks fails resolution.
    pub fn with_filter(mapping: Arc<BTreeMap<String, String>>, filter: Regex) -> Self {
        Self {
            mapping,
            filter: Some(filter),
        }
    }

    /// Namespaced id for an intercepted import, `None` when not intercepted.
    pub fn resolve(&self, specifier: &str) -> anyhow::Result<Option<String>> {
        let Some(filter) = &self.filter else {
            return Ok(None);
        };
        if !filter.is_match(specifier) {
            return Ok(None);
        }
        if !self.mapping.contains_key(specifier) {
            bail!("Unknown global: {}", specifier);
        }
        Ok(Some(format!("{}{}", GLOBAL_PREFIX, specifier)))
    }

    /// Module body for a namespaced id.
    pub fn load_source(&self, id: &str) -> anyhow::Result<Option<String>> {
        let Some(path) = id.strip_prefix(GLOBAL_PREFIX) else {
            return Ok(None);
        };
        match self.mapping.get(path) {
            Some(global) => Ok(Some(format!("module.exports = {};", global))),
            None => bail!("Unknown global: {}", path),
        }
    }
}

fn build_filter<'a>(modules: impl Iterator<Item = &'a str>) -> anyhow::Result<Option<Regex>> {
    let alternatives: Vec<String> = modules.map(regex::escape).collect();
    if alternatives.is_empty() {
        return Ok(None);
    }
    Ok(Some(Regex::new(&format!("^(?:{})$", alternatives.join("|")))?))
}

impl Plugin for GlobalImportPlugin {
    fn name(&self) -> Cow<'static, str> {
        "global-imports".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId | HookUsage::Load
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs<'_>,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let resolved = self.resolve(args.specifier);

        async move {
            Ok(resolved?.map(|id| HookResolveIdOutput {
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
        let source = self.load_source(args.id);

        async move {
            Ok(source?.map(|code| HookLoadOutput {
                code: code.into(),
                module_type: Some(ModuleType::Js),
                ..Default::default()
            }))
        }
    }
}

impl PreviewPlugin for GlobalImportPlugin {
    fn phase(&self) -> PluginPhase {
        PluginPhase::Resolve
    }
}
