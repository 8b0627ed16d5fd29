//! Application configuration.

use crate::platform::get_default_mirror_dir;
use crate::{InventoryError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_REMOTE_URL: &str = "AUTOLOT_REMOTE_URL";
pub const ENV_API_KEY: &str = "AUTOLOT_API_KEY";
pub const ENV_MIRROR_DIR: &str = "AUTOLOT_MIRROR_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the hosted backend (the `/rest/v1` prefix is added by the client).
    pub remote_url: String,
    pub api_key: String,
    pub table: String,
    pub mirror_dir: PathBuf,
    /// Origin pasted into generated embed snippets.
    pub embed_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            remote_url: "http://127.0.0.1:54321".to_string(),
            api_key: String::new(),
            table: "vehicles".to_string(),
            mirror_dir: get_default_mirror_dir(),
            embed_base_url: "http://localhost:5173".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| InventoryError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load `path` when it exists, defaults otherwise; environment overrides
    /// are applied in both cases.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            tracing::info!("No config file at {:?}, using defaults", path);
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in practice).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_REMOTE_URL) {
            self.remote_url = url;
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api_key = key;
        }
        if let Some(dir) = lookup(ENV_MIRROR_DIR) {
            self.mirror_dir = PathBuf::from(dir);
        }
    }
}
