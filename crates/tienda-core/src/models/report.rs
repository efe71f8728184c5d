//! Report types, filters and payloads
//!
//! Payload shapes mirror the reports backend (camelCase JSON). Every
//! aggregate field defaults so partial responses still decode.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Report Type / Export Format
// ============================================================================

/// Which aggregate dataset is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    #[default]
    Sales,
    Products,
    Orders,
}

impl ReportType {
    pub const ALL: [ReportType; 3] = [ReportType::Sales, ReportType::Products, ReportType::Orders];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Sales => "sales",
            ReportType::Products => "products",
            ReportType::Orders => "orders",
        }
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sales" | "ventas" => Ok(ReportType::Sales),
            "products" | "productos" => Ok(ReportType::Products),
            "orders" | "pedidos" => Ok(ReportType::Orders),
            _ => Err(format!(
                "Unknown report type: {}. Use sales, products or orders",
                s
            )),
        }
    }
}

/// Encoding the backend should produce for an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Csv,
    Pdf,
    Xlsx,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "pdf" => Ok(ExportFormat::Pdf),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            _ => Err(format!("Unknown export format: {}. Use csv, pdf or xlsx", s)),
        }
    }
}

// ============================================================================
// Filters
// ============================================================================

const RESERVED_FIELDS: [&str; 2] = ["startDate", "endDate"];

/// Caller-supplied constraints narrowing a report query
///
/// Empty filters mean "no filtering". Serialization is canonical (fixed
/// field order, sorted extra fields) so equal filters always produce the
/// same query key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Report-specific fields (category, status, province, ...)
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl ReportFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start_date: Some(start),
            end_date: Some(end),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none() && self.fields.is_empty()
    }

    /// Reject filters the backend could never satisfy
    pub fn validate(&self) -> Result<()> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(Error::validation(format!(
                    "start date {} is after end date {}",
                    start, end
                )));
            }
        }
        for key in self.fields.keys() {
            if key.trim().is_empty() {
                return Err(Error::validation("filter field name is empty"));
            }
            if RESERVED_FIELDS.contains(&key.as_str()) {
                return Err(Error::validation(format!(
                    "filter field '{}' is reserved, set the date range instead",
                    key
                )));
            }
        }
        Ok(())
    }

    /// Flatten into query-string pairs; null fields are dropped
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(start) = self.start_date {
            params.push(("startDate".to_string(), start.to_string()));
        }
        if let Some(end) = self.end_date {
            params.push(("endDate".to_string(), end.to_string()));
        }
        for (key, value) in &self.fields {
            let rendered = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            params.push((key.clone(), rendered));
        }
        params
    }
}

// ============================================================================
// Payloads
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SalesPoint {
    pub date: String,
    pub revenue: f64,
    pub orders: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategorySales {
    pub category: String,
    pub revenue: f64,
    pub units: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SalesReport {
    pub total_revenue: f64,
    pub total_orders: u64,
    pub average_order_value: f64,
    pub currency: String,
    pub daily: Vec<SalesPoint>,
    pub by_category: Vec<CategorySales>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductSales {
    pub product_id: String,
    pub name: String,
    pub sku: Option<String>,
    pub units_sold: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StockLevel {
    pub product_id: String,
    pub name: String,
    pub stock: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductsReport {
    pub total_products: u64,
    pub active_products: u64,
    pub out_of_stock: u64,
    pub top_sellers: Vec<ProductSales>,
    pub low_stock: Vec<StockLevel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrdersReport {
    pub total_orders: u64,
    pub pending: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub average_fulfillment_hours: Option<f64>,
    pub by_status: BTreeMap<String, u64>,
    /// Order counts keyed by shipping province
    pub by_province: BTreeMap<String, u64>,
}

/// A report payload of one of the three shapes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Report {
    Sales(SalesReport),
    Products(ProductsReport),
    Orders(OrdersReport),
}

impl Report {
    pub fn report_type(&self) -> ReportType {
        match self {
            Report::Sales(_) => ReportType::Sales,
            Report::Products(_) => ReportType::Products,
            Report::Orders(_) => ReportType::Orders,
        }
    }

    /// Decode a backend payload as the shape `report_type` selects
    pub fn from_value(report_type: ReportType, value: serde_json::Value) -> Result<Self> {
        let decoded = match report_type {
            ReportType::Sales => serde_json::from_value(value).map(Report::Sales),
            ReportType::Products => serde_json::from_value(value).map(Report::Products),
            ReportType::Orders => serde_json::from_value(value).map(Report::Orders),
        };
        decoded.map_err(|e| {
            Error::invalid_response(format!("{} report payload: {}", report_type, e))
        })
    }

    pub fn as_sales(&self) -> Option<&SalesReport> {
        match self {
            Report::Sales(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_products(&self) -> Option<&ProductsReport> {
        match self {
            Report::Products(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_orders(&self) -> Option<&OrdersReport> {
        match self {
            Report::Orders(r) => Some(r),
            _ => None,
        }
    }
}

// ============================================================================
// Export Artifact
// ============================================================================

/// Where an exported file can be obtained
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactLocation {
    /// Downloadable URL handed out by the backend
    Url { url: String },
    /// File contents returned in the response body
    Inline {
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
}

/// Output of an export request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportArtifact {
    pub file_name: String,
    pub content_type: String,
    pub location: ArtifactLocation,
}

impl ExportArtifact {
    pub fn url(&self) -> Option<&str> {
        match &self.location {
            ArtifactLocation::Url { url } => Some(url),
            ArtifactLocation::Inline { .. } => None,
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.location {
            ArtifactLocation::Inline { data } => Some(data),
            ArtifactLocation::Url { .. } => None,
        }
    }

    /// No usable reference to the exported file
    pub fn is_empty(&self) -> bool {
        match &self.location {
            ArtifactLocation::Url { url } => url.trim().is_empty(),
            ArtifactLocation::Inline { data } => data.is_empty(),
        }
    }
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Selection
// ============================================================================

/// Report view state owned by the caller (selected type, filters, format)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSelection {
    pub report_type: ReportType,
    pub filters: ReportFilters,
    pub export_format: ExportFormat,
}
