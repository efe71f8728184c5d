//! Reports service client
//!
//! The `ReportsClient` trait is the seam between the reports layer and the
//! backend. `HttpReportsClient` talks to the admin API over HTTP:
//!
//! - `GET {base}/reports/{type}?startDate=..&endDate=..&<fields>`
//! - `GET {base}/reports/{type}/export?format=<fmt>&<filters>`
//!
//! Exports come back either as JSON `{"url": ..., "fileName": ...}` or as
//! the file body itself.

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;

use crate::config::{AuthType, TiendaConfig};
use crate::error::{Error, Result};
use crate::models::{
    ArtifactLocation, ExportArtifact, ExportFormat, Report, ReportFilters, ReportType,
};

/// Longest response body excerpt carried in an error
const ERROR_BODY_LIMIT: usize = 500;

/// Backend operations the reports layer depends on
#[async_trait]
pub trait ReportsClient: Send + Sync + 'static {
    /// Fetch the aggregate for one report type
    async fn fetch_report(&self, report_type: ReportType, filters: &ReportFilters) -> Result<Report>;

    /// Ask the backend to encode a report in `format`
    async fn request_export(
        &self,
        report_type: ReportType,
        filters: &ReportFilters,
        format: ExportFormat,
    ) -> Result<ExportArtifact>;
}

// ============================================================================
// HTTP Client
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportLink {
    url: String,
    #[serde(default)]
    file_name: Option<String>,
}

/// Reports client for the admin HTTP API
#[derive(Debug, Clone)]
pub struct HttpReportsClient {
    base_url: String,
    client: Client,
}

impl HttpReportsClient {
    /// Create a client from configuration
    pub fn new(config: &TiendaConfig) -> Result<Self> {
        let config = config.validate();
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        match (config.auth_type, &config.auth_token) {
            (AuthType::Bearer, Some(token)) => {
                headers.insert(
                    header::AUTHORIZATION,
                    header::HeaderValue::from_str(&format!("Bearer {}", token))
                        .map_err(|e| Error::config(format!("Invalid bearer token: {}", e)))?,
                );
            }
            (AuthType::Basic, Some(token)) => {
                let encoded = base64::Engine::encode(
                    &base64::engine::general_purpose::STANDARD,
                    token.as_bytes(),
                );
                headers.insert(
                    header::AUTHORIZATION,
                    header::HeaderValue::from_str(&format!("Basic {}", encoded))
                        .map_err(|e| Error::config(format!("Invalid basic auth: {}", e)))?,
                );
            }
            (AuthType::Bearer | AuthType::Basic, None) => {
                log::warn!(
                    "[reports:http] auth_type is {} but no auth_token is set",
                    config.auth_type
                );
            }
            (AuthType::None, _) => {}
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.api_base_url,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn report_url(&self, report_type: ReportType) -> String {
        format!("{}/reports/{}", self.base_url, report_type)
    }
}

#[async_trait]
impl ReportsClient for HttpReportsClient {
    async fn fetch_report(&self, report_type: ReportType, filters: &ReportFilters) -> Result<Report> {
        let url = self.report_url(report_type);
        let params = filters.query_params();
        log::info!("[reports:http] GET {} ({} params)", url, params.len());

        let response = self.client.get(&url).query(&params).send().await?;
        let response = check_status(response).await?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::invalid_response(format!("{} report body: {}", report_type, e)))?;

        Report::from_value(report_type, unwrap_envelope(body))
    }

    async fn request_export(
        &self,
        report_type: ReportType,
        filters: &ReportFilters,
        format: ExportFormat,
    ) -> Result<ExportArtifact> {
        let url = format!("{}/export", self.report_url(report_type));
        let mut params = filters.query_params();
        params.push(("format".to_string(), format.to_string()));
        log::info!("[reports:http] GET {} as {}", url, format);

        let response = self.client.get(&url).query(&params).send().await?;
        let response = check_status(response).await?;

        let content_type = header_str(&response, header::CONTENT_TYPE);
        let default_name = format!("{}-report.{}", report_type, format.extension());
        let disposition_name = header_str(&response, header::CONTENT_DISPOSITION)
            .and_then(|value| filename_from_disposition(&value));

        let is_json = content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let link: ExportLink = response
                .json()
                .await
                .map_err(|e| Error::invalid_response(format!("export link: {}", e)))?;
            return Ok(ExportArtifact {
                file_name: link
                    .file_name
                    .or(disposition_name)
                    .unwrap_or(default_name),
                content_type: format.content_type().to_string(),
                location: ArtifactLocation::Url { url: link.url },
            });
        }

        let data = response.bytes().await?;
        log::info!("[reports:http] Export returned {} bytes inline", data.len());
        Ok(ExportArtifact {
            file_name: disposition_name.unwrap_or(default_name),
            content_type: content_type.unwrap_or_else(|| format.content_type().to_string()),
            location: ArtifactLocation::Inline {
                data: data.to_vec(),
            },
        })
    }
}

/// Map non-success responses onto the error taxonomy
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(ERROR_BODY_LIMIT)
        .collect::<String>();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    log::warn!("[reports:http] HTTP {}: {}", status.as_u16(), message);

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Err(Error::Validation(message)),
        _ => Err(Error::server(status.as_u16(), message)),
    }
}

/// Pull a human message out of a JSON error body, or use the raw text
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for field in ["message", "error", "detail"] {
            if let Some(text) = value.get(field).and_then(|v| v.as_str()) {
                return Some(text.to_string());
            }
        }
    }
    Some(trimmed.to_string())
}

/// Accept both a bare payload and `{"data": {...}}`
fn unwrap_envelope(body: serde_json::Value) -> serde_json::Value {
    match body {
        serde_json::Value::Object(mut map) if map.get("data").is_some_and(|d| d.is_object()) => {
            map.remove("data").unwrap_or_default()
        }
        other => other,
    }
}

fn header_str(response: &Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// `attachment; filename="sales.csv"` → `sales.csv`
fn filename_from_disposition(value: &str) -> Option<String> {
    value.split(';').map(str::trim).find_map(|part| {
        let (key, raw) = part.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let name = raw.trim().trim_matches('"');
        // Only keep the final path component
        let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
        (!name.is_empty()).then(|| name.to_string())
    })
}
