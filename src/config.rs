use serde::Deserialize;
use std::path::Path;

/// Application configuration, loaded from TOML. Every section defaults so a
/// missing or partial file yields a working local-only setup.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub cloud: CloudConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StateConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_db_path() -> String {
    "mooderia.db".to_string()
}

impl Default for StateConfig {
    fn default() -> Self {
        Self { db_path: default_db_path() }
    }
}

/// Cloud sync backend. Disabled (local-only) unless a base URL is set.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CloudConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

impl CloudConfig {
    pub fn enabled(&self) -> bool {
        !self.base_url.is_empty()
    }
}

/// Generative-text backend (content safety + assistant persona).
#[derive(Debug, Deserialize, Clone)]
pub struct AssistantConfig {
    #[serde(default = "default_assistant_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_assistant_model")]
    pub model: String,
}

fn default_assistant_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_assistant_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: default_assistant_base_url(),
            api_key: String::new(),
            model: default_assistant_model(),
        }
    }
}

impl AppConfig {
    /// Load from `path`; a missing file is the default (local-only) config.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}
