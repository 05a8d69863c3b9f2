//! TOML configuration for the `csync` binary.
//!
//! ```toml
//! [project]
//! id = "11a3492b-cd32-0054-51d2-8234ec4244a6"
//! languages = ["default", "cz"]
//! item_types = ["article", "author"]
//!
//! [db]
//! path = "./data/nodes.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:7340"
//! ```
//!
//! See `config/csync.example.toml` for every option.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use content_sync_core::reconcile::ReconcileSettings;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    pub db: DbConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProjectConfig {
    pub id: String,
    pub languages: Vec<String>,
    pub item_types: Vec<String>,
    #[serde(default)]
    pub include_raw_content: bool,
    #[serde(default)]
    pub include_taxonomies: bool,
    #[serde(default)]
    pub include_types: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeliveryConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_preview_base_url")]
    pub preview_base_url: String,
    #[serde(default)]
    pub use_preview: bool,
    #[serde(default = "default_preview_api_key_env")]
    pub preview_api_key_env: String,
    #[serde(default = "default_secure_api_key_env")]
    pub secure_api_key_env: String,
    #[serde(default = "default_depth")]
    pub depth: u32,
    #[serde(default = "default_include_components")]
    pub include_components: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            preview_base_url: default_preview_base_url(),
            use_preview: false,
            preview_api_key_env: default_preview_api_key_env(),
            secure_api_key_env: default_secure_api_key_env(),
            depth: default_depth(),
            include_components: default_include_components(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://deliver.kontent.ai".to_string()
}
fn default_preview_base_url() -> String {
    "https://preview-deliver.kontent.ai".to_string()
}
fn default_preview_api_key_env() -> String {
    "KONTENT_PREVIEW_API_KEY".to_string()
}
fn default_secure_api_key_env() -> String {
    "KONTENT_SECURE_API_KEY".to_string()
}
fn default_depth() -> u32 {
    1
}
fn default_include_components() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    #[serde(default = "default_webhook_path")]
    pub webhook_path: String,
}

fn default_webhook_path() -> String {
    "/webhook".to_string()
}

impl Config {
    /// Settings handed to the reconciler.
    pub fn reconcile_settings(&self) -> ReconcileSettings {
        ReconcileSettings {
            project_id: self.project.id.clone(),
            languages: self.project.languages.clone(),
            item_types: self.project.item_types.clone(),
            include_raw_content: self.project.include_raw_content,
            include_taxonomies: self.project.include_taxonomies,
            include_types: self.project.include_types,
            include_components: self.delivery.include_components,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.project.id.trim().is_empty() {
        anyhow::bail!("project.id must not be empty");
    }

    if config.project.languages.is_empty() {
        anyhow::bail!("project.languages must list at least one language");
    }
    let mut seen = HashSet::new();
    for language in &config.project.languages {
        if language.trim().is_empty() {
            anyhow::bail!("project.languages must not contain empty codenames");
        }
        if !seen.insert(language.as_str()) {
            anyhow::bail!("project.languages contains '{}' more than once", language);
        }
    }

    if config.project.item_types.is_empty() {
        anyhow::bail!("project.item_types must list at least one content type");
    }

    if config.delivery.timeout_secs == 0 {
        anyhow::bail!("delivery.timeout_secs must be > 0");
    }

    if !config.server.webhook_path.starts_with('/') {
        anyhow::bail!(
            "server.webhook_path must start with '/', got '{}'",
            config.server.webhook_path
        );
    }

    Ok(())
}
