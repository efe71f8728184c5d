//! # tienda-core
//!
//! Data layer for the Tienda admin panel - shared by the CLI and any UI shell.
//!
//! This crate provides:
//! - Data models: cart lines, Costa Rica locations, reports (`models` module)
//! - Cached report reads and exports (`services` module)
//! - Client configuration (`config` module)
//! - Unified error handling (`error` module)

pub mod config;
pub mod error;
pub mod models;
pub mod services;

// Re-exports for convenience
pub use config::{get_config_path, AuthType, TiendaConfig};
pub use error::{Error, Result};

// Re-export commonly used types from models
pub use models::{
    cart_subtotal, ArtifactLocation, CartItem, CrCanton, CrDistrict, CrProvince, ExportArtifact,
    ExportFormat, HierarchyViolation, LocationCatalog, LocationSelection, OrdersReport,
    ProductsReport, Report, ReportFilters, ReportSelection, ReportType, ResolvedLocation,
    SalesReport,
};

// Re-export commonly used types from services
pub use services::{
    CacheStats, ExportMutation, ExportState, HttpReportsClient, QueryCache, QueryKey, QueryState,
    ReportQuery, Reports, ReportsClient,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version
pub fn version() -> &'static str {
    VERSION
}
