//! Runtime settings
//!
//! Precedence, lowest first: defaults, `~/.vxf-reports/config.json`,
//! environment (`VXF_API_KEY`, `VXF_API_BASE`), command-line flags.

use crate::services::paginator::{DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};
use crate::types::{Result, VxfError};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.konacash.com/v1/";
pub const ENV_API_KEY: &str = "VXF_API_KEY";
pub const ENV_API_BASE: &str = "VXF_API_BASE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_key: Option<String>,
    pub api_base: String,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub page_size: u32,
    pub max_pages: u32,
    /// Defaults to ~/.vxf-reports/cache
    pub cache_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: 30,
            cache_ttl_secs: 3600,
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            cache_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from `path` (must exist) or the default config file
    /// (optional), then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        settings.apply_env(|name| std::env::var(name).ok());
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            VxfError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| VxfError::Config(format!("invalid {}: {}", path.display(), e)))
    }

    /// Override fields from environment variables found by `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY).filter(|k| !k.is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(base) = lookup(ENV_API_BASE).filter(|b| !b.is_empty()) {
            self.api_base = base;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(VxfError::Config("page_size must be at least 1".into()));
        }
        if self.max_pages == 0 {
            return Err(VxfError::Config("max_pages must be at least 1".into()));
        }
        if self.api_base.trim().is_empty() {
            return Err(VxfError::Config("api_base must not be empty".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// API key reduced to its first 6 characters for display
    pub fn masked_api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(|k| format!("{}...", k.chars().take(6).collect::<String>()))
    }
}

/// ~/.vxf-reports/config.json
pub fn default_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|d| d.home_dir().join(".vxf-reports").join("config.json"))
}
