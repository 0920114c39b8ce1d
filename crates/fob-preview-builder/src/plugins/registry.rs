//! Plugin registry with execution phases.
//!
//! Rolldown runs `resolve_id` hooks in plugin order, so the order matters:
//! virtual modules must claim their ids before global imports, which must
//! claim theirs before anything touches the filesystem.

use std::sync::Arc;

use rolldown_plugin::Plugin;
use rolldown_plugin::__inner::SharedPluginable;

/// Plugin execution phases, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PluginPhase {
    /// In-memory modules that do not exist on disk.
    Virtual = 0,

    /// Rewrites of where an import resolves to.
    Resolve = 10,

    /// Content transformation (MDX).
    Transform = 20,

    /// Output post-processing (HTML emission).
    PostProcess = 100,
}

/// A Rolldown plugin that knows its phase.
pub trait PreviewPlugin: Plugin {
    fn phase(&self) -> PluginPhase {
        PluginPhase::Transform
    }
}

/// Plugins kept in phase order.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<(PluginPhase, SharedPluginable)>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<P: PreviewPlugin + 'static>(&mut self, plugin: P) {
        let phase = plugin.phase();
        self.plugins.push((phase, Arc::new(plugin)));
    }

    /// Add a plugin that does not implement [`PreviewPlugin`].
    pub fn add_with_phase(&mut self, plugin: SharedPluginable, phase: PluginPhase) {
        self.plugins.push((phase, plugin));
    }

    /// Plugins sorted by phase. Plugins sharing a phase keep insertion order.
    pub fn into_rolldown_plugins(mut self) -> Vec<SharedPluginable> {
        self.plugins.sort_by_key(|(phase, _)| *phase);
        self.plugins.into_iter().map(|(_, plugin)| plugin).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
