//! Services module

pub mod client;
pub mod export;
pub mod query_cache;
pub mod reports;

pub use client::{HttpReportsClient, ReportsClient};
pub use export::{ExportMutation, ExportState};
pub use query_cache::{settle, CacheStats, QueryCache, QueryKey, QueryState};
pub use reports::{query_key, ReportQuery, Reports};
