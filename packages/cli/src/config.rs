use formsmith_editor::EditorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_NAME: &str = "formsmith.config.json";

/// Formsmith configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory holding saved forms, one JSON file per form
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,

    /// History and drag settings for editing sessions
    #[serde(default)]
    pub editor: EditorConfig,
}

fn default_storage_dir() -> String {
    ".formsmith/forms".to_string()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> anyhow::Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Get absolute path to the storage directory
    pub fn get_storage_dir(&self, cwd: &Path) -> PathBuf {
        cwd.join(&self.storage_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            editor: EditorConfig::default(),
        }
    }
}
