use quire_model::{Document, DocumentOptions, DEFAULT_SEPARATOR};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "quire.config.json";

/// Quire configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Separator between operations in a log
    #[serde(default = "default_separator")]
    pub separator: String,

    /// Roots created before replaying; the first one is the main root
    #[serde(default = "default_roots")]
    pub roots: Vec<RootConfig>,

    /// Delay between replayed operations
    #[serde(default)]
    pub replay_delay_ms: u64,
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

fn default_roots() -> Vec<RootConfig> {
    vec![RootConfig {
        name: "main".to_string(),
        element: default_root_element(),
    }]
}

fn default_root_element() -> String {
    "$root".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootConfig {
    pub name: String,

    #[serde(default = "default_root_element")]
    pub element: String,
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn replay_delay(&self) -> Duration {
        Duration::from_millis(self.replay_delay_ms)
    }

    /// Empty document with the configured roots
    pub fn build_document(&self) -> anyhow::Result<Document> {
        let Some((main, rest)) = self.roots.split_first() else {
            return Ok(Document::new());
        };
        let mut doc = Document::with_options(DocumentOptions {
            root_name: main.name.clone(),
            root_element: main.element.clone(),
        });
        for root in rest {
            doc.create_root(&root.element, &root.name)?;
        }
        Ok(doc)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            roots: default_roots(),
            replay_delay_ms: 0,
        }
    }
}
