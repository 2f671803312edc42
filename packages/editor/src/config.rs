//! Editor tuning knobs, loadable from the host's JSON config.

use crate::clock::Millis;
use crate::drag::ResolverConfig;
use crate::undo_stack::{DEFAULT_COALESCE_MS, DEFAULT_MAX_LEVELS};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Undo levels kept (0 = unlimited)
    pub history_limit: usize,

    /// Quiet period before a burst of edits becomes one undo entry
    pub coalesce_ms: Millis,

    /// Vertical band inside a container that counts as "inside"
    pub container_padding: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_MAX_LEVELS,
            coalesce_ms: DEFAULT_COALESCE_MS,
            container_padding: ResolverConfig::DEFAULT_PADDING,
        }
    }
}

impl EditorConfig {
    pub fn resolver(&self) -> ResolverConfig {
        ResolverConfig {
            container_padding: self.container_padding,
        }
    }
}
