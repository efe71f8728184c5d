//! Report helper functions
//!
//! Shared utilities for report commands.

use anyhow::Result;
use chrono::NaiveDate;
use tienda_core::ReportFilters;

/// Build report filters from CLI arguments
///
/// No dates means no date filtering, not a default range.
pub fn build_filters(
    start: Option<String>,
    end: Option<String>,
    fields: &[String],
) -> Result<ReportFilters> {
    let mut filters = ReportFilters::new();
    filters.start_date = start.as_deref().map(parse_date).transpose()?;
    filters.end_date = end.as_deref().map(parse_date).transpose()?;

    for raw in fields {
        let (key, value) = parse_filter(raw)?;
        filters = filters.with_field(key, value);
    }

    filters.validate()?;
    Ok(filters)
}

/// Parse date string supporting common formats
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    if s == "today" {
        return Ok(chrono::Local::now().date_naive());
    }
    if s == "yesterday" {
        return Ok(chrono::Local::now().date_naive() - chrono::Duration::days(1));
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("Invalid date format: {}. Use YYYY-MM-DD", s))
}

/// Parse `key=value`; numbers and booleans keep their JSON type
pub fn parse_filter(raw: &str) -> Result<(String, serde_json::Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Invalid filter: {}. Use key=value", raw))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Invalid filter: {}. Key is empty", raw);
    }

    let value = value.trim();
    let parsed = match serde_json::from_str::<serde_json::Value>(value) {
        Ok(v @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_))) => v,
        _ => serde_json::Value::String(value.to_string()),
    };
    Ok((key.to_string(), parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parse_date_valid() {
        let date = parse_date("2025-01-15").unwrap();
        assert_eq!(date.year(), 2025);
        assert_eq!(date.month(), 1);
        assert_eq!(date.day(), 15);
    }

    #[test]
    fn test_parse_date_today() {
        let today = chrono::Local::now().date_naive();
        let parsed = parse_date("today").unwrap();
        assert_eq!(parsed, today);
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date("invalid").is_err());
        assert!(parse_date("2025/01/15").is_err());
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(
            parse_filter("status=paid").unwrap(),
            ("status".to_string(), serde_json::json!("paid"))
        );
        assert_eq!(
            parse_filter("minTotal = 5000").unwrap(),
            ("minTotal".to_string(), serde_json::json!(5000))
        );
        assert_eq!(
            parse_filter("onlyActive=true").unwrap(),
            ("onlyActive".to_string(), serde_json::json!(true))
        );
        assert_eq!(
            parse_filter("dateRange=2024-01").unwrap(),
            ("dateRange".to_string(), serde_json::json!("2024-01"))
        );
        assert!(parse_filter("status").is_err());
        assert!(parse_filter("=paid").is_err());
    }

    #[test]
    fn test_build_filters() {
        let filters = build_filters(
            Some("2024-01-01".to_string()),
            Some("2024-01-31".to_string()),
            &["province=Heredia".to_string()],
        )
        .unwrap();
        assert_eq!(filters.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(filters.fields.get("province"), Some(&serde_json::json!("Heredia")));

        assert!(build_filters(None, None, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_build_filters_rejects_inverted_range() {
        let result = build_filters(
            Some("2024-02-01".to_string()),
            Some("2024-01-01".to_string()),
            &[],
        );
        assert!(result.is_err());
    }
}
