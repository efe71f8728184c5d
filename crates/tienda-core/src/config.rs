//! Client configuration
//!
//! Stored as JSON in the platform config directory. `TIENDA_CONFIG_PATH`
//! overrides the file location; `TIENDA_API_URL` and `TIENDA_API_TOKEN`
//! override the corresponding fields after the file is read.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::ExportFormat;

/// Default reports backend
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECONDS: u32 = 30;

/// Keys accepted by [`TiendaConfig::get`] / [`TiendaConfig::set`]
pub const CONFIG_KEYS: [&str; 6] = [
    "api_base_url",
    "auth_type",
    "auth_token",
    "timeout_seconds",
    "default_export_format",
    "cache_stale_after_secs",
];

/// How requests to the reports backend authenticate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    #[default]
    None,
    Bearer,
    Basic,
}

impl std::fmt::Display for AuthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthType::None => write!(f, "none"),
            AuthType::Bearer => write!(f, "bearer"),
            AuthType::Basic => write!(f, "basic"),
        }
    }
}

impl std::str::FromStr for AuthType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "" => Ok(AuthType::None),
            "bearer" => Ok(AuthType::Bearer),
            "basic" => Ok(AuthType::Basic),
            _ => Err(format!("Unknown auth type: {}. Use none, bearer or basic", s)),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TiendaConfig {
    pub api_base_url: String,
    pub auth_type: AuthType,
    pub auth_token: Option<String>,
    pub timeout_seconds: u32,
    pub default_export_format: ExportFormat,
    /// Ready report entries older than this refetch; unset keeps them for
    /// the whole session
    pub cache_stale_after_secs: Option<u64>,
}

impl Default for TiendaConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_type: AuthType::None,
            auth_token: None,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            default_export_format: ExportFormat::Csv,
            cache_stale_after_secs: None,
        }
    }
}

impl TiendaConfig {
    /// Load from the default location, then apply env overrides
    pub fn load() -> Result<Self> {
        let path = get_config_path()?;
        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides();
        Ok(config.validate())
    }

    /// Load from a specific file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("[config] {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let config: TiendaConfig = serde_json::from_str(&raw)
            .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?;
        log::info!("[config] Loaded configuration from {}", path.display());
        Ok(config.validate())
    }

    /// Write to the default location
    pub fn save(&self) -> Result<PathBuf> {
        let path = get_config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Write to a specific file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("[config] Saved configuration to {}", path.display());
        Ok(())
    }

    /// Apply `TIENDA_API_URL` / `TIENDA_API_TOKEN`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("TIENDA_API_URL") {
            if !url.trim().is_empty() {
                self.api_base_url = url;
            }
        }
        if let Ok(token) = std::env::var("TIENDA_API_TOKEN") {
            if !token.trim().is_empty() {
                self.auth_token = Some(token);
                if self.auth_type == AuthType::None {
                    self.auth_type = AuthType::Bearer;
                }
            }
        }
    }

    /// Normalize the configuration
    pub fn validate(&self) -> Self {
        Self {
            api_base_url: self.api_base_url.trim().trim_end_matches('/').to_string(),
            auth_type: self.auth_type,
            auth_token: self
                .auth_token
                .as_ref()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            timeout_seconds: self.timeout_seconds.max(1),
            default_export_format: self.default_export_format,
            cache_stale_after_secs: self.cache_stale_after_secs.filter(|s| *s > 0),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.timeout_seconds))
    }

    pub fn cache_stale_after(&self) -> Option<Duration> {
        self.cache_stale_after_secs.map(Duration::from_secs)
    }

    /// Read a value by key; secrets come back masked
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key.to_lowercase().as_str() {
            "api_base_url" => self.api_base_url.clone(),
            "auth_type" => self.auth_type.to_string(),
            "auth_token" => mask_token(&self.auth_token),
            "timeout_seconds" => self.timeout_seconds.to_string(),
            "default_export_format" => self.default_export_format.to_string(),
            "cache_stale_after_secs" => self
                .cache_stale_after_secs
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
            _ => return None,
        };
        Some(value)
    }

    /// Update a value by key
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key.to_lowercase().as_str() {
            "api_base_url" => {
                if !value.starts_with("http://") && !value.starts_with("https://") {
                    return Err(Error::validation(format!(
                        "api_base_url must start with http:// or https://, got {}",
                        value
                    )));
                }
                self.api_base_url = value.to_string();
            }
            "auth_type" => self.auth_type = value.parse().map_err(Error::Validation)?,
            "auth_token" => self.auth_token = Some(value.to_string()),
            "timeout_seconds" => {
                self.timeout_seconds = value
                    .parse()
                    .map_err(|_| Error::validation(format!("timeout_seconds: not a number: {}", value)))?;
            }
            "default_export_format" => {
                self.default_export_format = value.parse().map_err(Error::Validation)?;
            }
            "cache_stale_after_secs" => {
                self.cache_stale_after_secs = match value.trim() {
                    "" | "-" | "none" => None,
                    v => Some(v.parse().map_err(|_| {
                        Error::validation(format!("cache_stale_after_secs: not a number: {}", v))
                    })?),
                };
            }
            _ => {
                return Err(Error::config(format!(
                    "Unknown config key: {}. Available keys: {}",
                    key,
                    CONFIG_KEYS.join(", ")
                )))
            }
        }
        *self = self.validate();
        Ok(())
    }
}

/// Config file location
pub fn get_config_path() -> Result<PathBuf> {
    // Check for environment variable override
    if let Ok(path) = std::env::var("TIENDA_CONFIG_PATH") {
        return Ok(PathBuf::from(path));
    }

    let dirs = directories::ProjectDirs::from("com", "tienda", "Tienda")
        .ok_or_else(|| Error::config("Could not determine project directories"))?;

    Ok(dirs.config_dir().join("config.json"))
}

fn mask_token(token: &Option<String>) -> String {
    match token {
        Some(t) if t.chars().count() > 8 => format!("{}****", t.chars().take(4).collect::<String>()),
        Some(_) => "****".to_string(),
        None => "-".to_string(),
    }
}
