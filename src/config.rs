use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const URL_VARS: [&str; 2] = ["SUPABASE_URL", "VITE_SUPABASE_URL"];
pub const KEY_VARS: [&str; 2] = ["SUPABASE_ANON_KEY", "VITE_SUPABASE_ANON_KEY"];
pub const DEBUG_VAR: &str = "TAREAS_DEBUG";

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("tareas")
        .join("config.json")
}

/// Connection settings, read once at startup.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub supabase_url: String,
    #[serde(default)]
    pub supabase_anon_key: String,
    #[serde(default)]
    pub debug_logging: bool,
}

impl AppConfig {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file(&default_config_path())?;
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// A missing file yields defaults; a malformed one is an error.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let first = |names: &[&str]| {
            names
                .iter()
                .filter_map(|n| lookup(*n))
                .find(|v| !v.trim().is_empty())
        };
        if let Some(url) = first(&URL_VARS[..]) {
            self.supabase_url = url;
        }
        if let Some(key) = first(&KEY_VARS[..]) {
            self.supabase_anon_key = key;
        }
        if let Some(debug) = lookup(DEBUG_VAR) {
            self.debug_logging = matches!(debug.trim(), "1" | "true" | "yes");
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.supabase_url.trim();
        if url.is_empty() {
            return Err(ConfigError::Missing(URL_VARS[0]));
        }
        if self.supabase_anon_key.trim().is_empty() {
            return Err(ConfigError::Missing(KEY_VARS[0]));
        }
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(ConfigError::InvalidUrl(url.to_string()));
        }
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.supabase_url.trim().trim_end_matches('/')
    }

    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.base_url())
    }

    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.base_url())
    }
}
