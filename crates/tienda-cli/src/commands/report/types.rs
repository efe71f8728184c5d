//! Report types
//!
//! Types for report commands.

use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;
use tienda_core::{ExportFormat, ReportType};

#[derive(Subcommand)]
pub enum ReportAction {
    /// Show a report for a date range
    Show {
        /// Report type: sales, products, orders
        #[arg(short = 't', long = "type")]
        report_type: ReportType,

        /// Start date (YYYY-MM-DD, today, yesterday)
        #[arg(short, long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD, today, yesterday)
        #[arg(short, long)]
        end: Option<String>,

        /// Extra filter field as key=value (repeatable)
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,
    },

    /// Export a report file (csv, pdf, xlsx)
    Export {
        /// Report type: sales, products, orders
        #[arg(short = 't', long = "type")]
        report_type: ReportType,

        /// Export format, defaults to default_export_format from config
        #[arg(long = "export-format")]
        export_format: Option<ExportFormat>,

        /// Start date (YYYY-MM-DD, today, yesterday)
        #[arg(short, long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD, today, yesterday)
        #[arg(short, long)]
        end: Option<String>,

        /// Extra filter field as key=value (repeatable)
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,

        /// Where to write an inline export (default: the file name the
        /// backend suggests)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Headline metric row
#[derive(Debug, Serialize, Tabled)]
pub struct MetricRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl MetricRow {
    pub fn new(metric: &str, value: impl ToString) -> Self {
        Self {
            metric: metric.to_string(),
            value: value.to_string(),
        }
    }
}

/// Daily sales row
#[derive(Debug, Serialize, Tabled)]
pub struct DailySalesRow {
    #[tabled(rename = "Date")]
    pub date: String,
    #[tabled(rename = "Revenue")]
    pub revenue: String,
    #[tabled(rename = "Orders")]
    pub orders: u64,
}

/// Sales per category
#[derive(Debug, Serialize, Tabled)]
pub struct CategoryRow {
    #[tabled(rename = "Category")]
    pub category: String,
    #[tabled(rename = "Revenue")]
    pub revenue: String,
    #[tabled(rename = "Units")]
    pub units: u64,
}

/// Best-selling product
#[derive(Debug, Serialize, Tabled)]
pub struct TopSellerRow {
    #[tabled(rename = "Product")]
    pub name: String,
    #[tabled(rename = "SKU")]
    pub sku: String,
    #[tabled(rename = "Units")]
    pub units_sold: u64,
    #[tabled(rename = "Revenue")]
    pub revenue: String,
}

#[derive(Debug, Serialize, Tabled)]
pub struct StockRow {
    #[tabled(rename = "Product")]
    pub name: String,
    #[tabled(rename = "Stock")]
    pub stock: i64,
}

/// Order count per group (status, province)
#[derive(Debug, Serialize, Tabled)]
pub struct CountRow {
    #[tabled(rename = "Group")]
    pub group: String,
    #[tabled(rename = "Orders")]
    pub orders: u64,
}

/// Export result row
#[derive(Debug, Serialize, Tabled)]
pub struct ExportRow {
    #[tabled(rename = "File")]
    pub file_name: String,
    #[tabled(rename = "Content-Type")]
    pub content_type: String,
    #[tabled(rename = "Location")]
    pub location: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_row_serialization() {
        let row = MetricRow::new("Total orders", 61);

        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("Total orders"));
        assert!(json.contains("\"61\""));
    }

    #[test]
    fn test_export_row_serialization() {
        let row = ExportRow {
            file_name: "sales-report.csv".to_string(),
            content_type: "text/csv".to_string(),
            location: "./sales-report.csv".to_string(),
        };

        let json = serde_json::to_string(&row).unwrap();
        assert!(json.contains("sales-report.csv"));
        assert!(json.contains("text/csv"));
    }
}
