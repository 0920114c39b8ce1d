//! Static preset configuration.
//!
//! These are the values a preset chain may contribute to a preview build. The
//! builder applies them hook by hook; this module only defines the data and
//! its (de)serialization.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::stories::StoriesEntry;

/// Everything the preset chain can contribute, keyed by hook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetConfig {
    pub core: CoreConfig,
    pub framework_options: Value,
    pub env: BTreeMap<String, String>,
    pub log_level: Option<String>,
    /// HTML appended to the iframe `<head>`.
    pub preview_head: Option<String>,
    /// HTML inserted at the top of the iframe `<body>`.
    pub preview_body: Option<String>,
    /// Template used to render `iframe.html`. Falls back to the bundled template.
    pub preview_main_template: Option<PathBuf>,
    pub docs: DocsOptions,
    /// Extra modules bundled ahead of the preview entry.
    pub entries: Vec<String>,
    pub stories: Vec<StoriesEntry>,
    pub preview_annotations: Vec<PreviewAnnotation>,
    /// Module specifier to runtime global overrides. `None` keeps the built-in map.
    pub globals: Option<BTreeMap<String, String>>,
    pub mdx: MdxSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub builder: Option<String>,
    pub channel_options: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocsOptions {
    #[serde(alias = "default_name", skip_serializing_if = "Option::is_none")]
    pub default_name: Option<String>,
    pub autodocs: bool,
    #[serde(alias = "docs_mode")]
    pub docs_mode: bool,
}

/// A preview annotation module, either a bare specifier or a resolved pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreviewAnnotation {
    Bare(String),
    Resolved { bare: String, absolute: PathBuf },
}

impl PreviewAnnotation {
    /// Path the generated config entry should import.
    pub fn import_path(&self) -> String {
        match self {
            PreviewAnnotation::Bare(bare) => bare.clone(),
            PreviewAnnotation::Resolved { absolute, .. } => absolute.to_string_lossy().into_owned(),
        }
    }
}

/// Options forwarded to the documentation compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MdxSettings {
    pub gfm: bool,
    pub footnotes: bool,
    pub math: bool,
    /// Module providing `useMDXComponents` to compiled documents.
    pub provider_import_source: Option<String>,
}

impl Default for MdxSettings {
    fn default() -> Self {
        Self {
            gfm: true,
            footnotes: true,
            math: false,
            provider_import_source: None,
        }
    }
}
