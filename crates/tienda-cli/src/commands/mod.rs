//! CLI commands module
//!
//! Contains all CLI command implementations.

pub mod cart;
pub mod config;
pub mod location;
pub mod report;

use crate::output::OutputFormat;
use tienda_core::TiendaConfig;

/// Shared context for all commands
pub struct Context {
    pub config: TiendaConfig,
    pub format: OutputFormat,
    pub quiet: bool,
}

impl Context {
    /// Progress messages go to stdout, so JSON output silences them too
    pub fn progress_quiet(&self) -> bool {
        self.quiet || self.format == OutputFormat::Json
    }
}
