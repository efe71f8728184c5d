//! Config commands
//!
//! Commands for managing CLI configuration.

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;
use tienda_core::config::CONFIG_KEYS;
use tienda_core::{get_config_path, TiendaConfig};

use super::Context;
use crate::output::{print_info, print_output, print_success};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Configuration value
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Print the config file location
    Path,
}

/// Config row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

pub async fn execute(ctx: &Context, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => show_config(ctx),
        ConfigAction::Set { key, value } => set_config(ctx, &key, &value),
        ConfigAction::Get { key } => get_config(ctx, &key),
        ConfigAction::Path => {
            println!("{}", get_config_path()?.display());
            Ok(())
        }
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let rows = config_rows(&ctx.config);
    print_output(&rows, ctx.format)
}

fn get_config(ctx: &Context, key: &str) -> Result<()> {
    let Some(value) = ctx.config.get(key) else {
        anyhow::bail!(
            "Unknown config key: {}. Available keys: {}",
            key,
            CONFIG_KEYS.join(", ")
        );
    };
    print_info(&format!("{} = {}", key.to_lowercase(), value), ctx.quiet);
    Ok(())
}

fn set_config(ctx: &Context, key: &str, value: &str) -> Result<()> {
    // Start from the file, not the env-overridden context config
    let path = get_config_path()?;
    let mut config = TiendaConfig::load_from(&path)?;
    config.set(key, value)?;
    config.save_to(&path)?;

    let shown = config.get(key).unwrap_or_else(|| value.to_string());
    print_success(&format!("Set {} = {}", key.to_lowercase(), shown), ctx.quiet);
    Ok(())
}

fn config_rows(config: &TiendaConfig) -> Vec<ConfigRow> {
    let mut rows = Vec::new();

    let config_path = get_config_path()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| "Unknown".to_string());
    rows.push(ConfigRow {
        key: "TIENDA_CONFIG_PATH".to_string(),
        value: config_path,
        source: env_source("TIENDA_CONFIG_PATH", "default"),
    });

    for key in CONFIG_KEYS.iter() {
        let source = match *key {
            "api_base_url" => env_source("TIENDA_API_URL", "file"),
            "auth_token" => env_source("TIENDA_API_TOKEN", "file"),
            _ => "file".to_string(),
        };
        rows.push(ConfigRow {
            key: key.to_string(),
            value: config.get(key).unwrap_or_else(|| "-".to_string()),
            source,
        });
    }

    rows
}

fn env_source(var: &str, fallback: &str) -> String {
    if std::env::var(var).is_ok() { "env" } else { fallback }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_rows_cover_every_key() {
        let rows = config_rows(&TiendaConfig::default());
        assert_eq!(rows.len(), CONFIG_KEYS.len() + 1);
        assert!(rows.iter().any(|r| r.key == "api_base_url"));
    }

    #[test]
    fn test_config_rows_mask_token() {
        let config = TiendaConfig {
            auth_token: Some("super-secret-token".to_string()),
            ..Default::default()
        };
        let rows = config_rows(&config);
        let token = rows.iter().find(|r| r.key == "auth_token").unwrap();
        assert!(!token.value.contains("secret"));
    }
}
