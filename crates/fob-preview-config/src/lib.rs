//! Configuration for the fob preview builder.
//!
//! Holds the per-invocation [`PreviewOptions`], the static [`PresetConfig`]
//! contributed by presets, story specifier normalization, and layered loading
//! from `fob-preview.toml` / `fob-preview.json` plus `FOB_PREVIEW_*` variables.

pub mod error;
pub mod loading;
pub mod options;
pub mod presets;
pub mod stories;

pub use error::{ConfigError, Result};
pub use loading::{CONFIG_FILE_NAMES, ENV_PREFIX, LoadedConfig, discover_config_file, load_config};
pub use options::{ConfigType, Features, PreviewOptions};
pub use presets::{CoreConfig, DocsOptions, MdxSettings, PresetConfig, PreviewAnnotation};
pub use stories::{
    DEFAULT_FILES_PATTERN, NormalizedStoriesSpecifier, StoriesEntry, StoriesSpecifier,
    glob_to_regex, normalize_stories, to_import_path,
};
