//! Tienda CLI - admin reports and location lookups
//!
//! A command-line front end for the Tienda admin data layer: view and export
//! sales/products/orders reports, inspect the Costa Rica location catalog,
//! price carts and manage client configuration.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tienda")]
#[command(author, version, about = "Tienda admin reports CLI", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: table (default) or json
    #[arg(long, global = true, default_value = "table")]
    format: output::OutputFormat,

    /// Suppress progress messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Override config file path (or set TIENDA_CONFIG_PATH env var)
    #[arg(long, env = "TIENDA_CONFIG_PATH", global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// View and export reports
    Report {
        #[command(subcommand)]
        action: commands::report::ReportAction,
    },

    /// Inspect a Costa Rica location catalog
    Location {
        #[command(subcommand)]
        action: commands::location::LocationAction,
    },

    /// Price cart snapshots
    Cart {
        #[command(subcommand)]
        action: commands::cart::CartAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    // Set up config path if provided
    if let Some(config_path) = &cli.config {
        let expanded = shellexpand::tilde(config_path).to_string();
        std::env::set_var("TIENDA_CONFIG_PATH", expanded);
    }

    let config = tienda_core::TiendaConfig::load()?;
    log::debug!(
        "[cli] Loaded config, backend {} ({} auth)",
        config.api_base_url,
        config.auth_type
    );

    // Create context for commands
    let ctx = commands::Context {
        config,
        format: cli.format,
        quiet: cli.quiet,
    };

    // Execute command
    match cli.command {
        Commands::Report { action } => commands::report::execute(&ctx, action).await,
        Commands::Location { action } => commands::location::execute(&ctx, action).await,
        Commands::Cart { action } => commands::cart::execute(&ctx, action).await,
        Commands::Config { action } => commands::config::execute(&ctx, action).await,
    }
}
