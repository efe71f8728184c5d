//! Reports layer
//!
//! Composes a [`ReportsClient`] with a keyed [`QueryCache`] for reads and an
//! [`ExportMutation`] for exports. Reads are keyed by the exact
//! `(ReportType, ReportFilters)` pair; exports never touch the cache.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::client::{HttpReportsClient, ReportsClient};
use super::export::{ExportMutation, ExportState};
use super::query_cache::{settle, CacheStats, QueryCache, QueryKey, QueryState};
use crate::config::TiendaConfig;
use crate::error::{Error, Result};
use crate::models::{ExportFormat, Report, ReportFilters, ReportSelection, ReportType};

const KEY_PREFIX: &str = "reports";

/// Cache key for a `(type, filters)` pair
///
/// Filters serialize canonically, so equal filters give equal keys.
pub fn query_key(report_type: ReportType, filters: &ReportFilters) -> Result<QueryKey> {
    let filters = serde_json::to_string(filters)?;
    Ok(QueryKey::new(format!(
        "{}:{}:{}",
        KEY_PREFIX, report_type, filters
    )))
}

fn type_prefix(report_type: ReportType) -> String {
    format!("{}:{}:", KEY_PREFIX, report_type)
}

// ============================================================================
// Reports
// ============================================================================

/// Report reads and exports over one client
pub struct Reports<C: ReportsClient + ?Sized> {
    client: Arc<C>,
    cache: QueryCache<Report>,
    export: ExportMutation,
}

impl<C: ReportsClient + ?Sized> Clone for Reports<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            cache: self.cache.clone(),
            export: self.export.clone(),
        }
    }
}

impl Reports<HttpReportsClient> {
    /// HTTP-backed reports using the configured base URL, auth and cache window
    pub fn from_config(config: &TiendaConfig) -> Result<Self> {
        let client = HttpReportsClient::new(config)?;
        log::info!("[reports] Using backend {}", client.base_url());
        Ok(Self::with_stale_after(
            Arc::new(client),
            config.cache_stale_after(),
        ))
    }
}

impl<C: ReportsClient + ?Sized> Reports<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self::with_stale_after(client, None)
    }

    pub fn with_stale_after(client: Arc<C>, stale_after: Option<Duration>) -> Self {
        Self {
            client,
            cache: QueryCache::with_stale_after(stale_after),
            export: ExportMutation::new(),
        }
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Resolve a report, reusing the cached result for an unchanged pair
    ///
    /// Never panics on client failure; errors come back as `Failed`.
    pub async fn get_report(
        &self,
        report_type: ReportType,
        filters: &ReportFilters,
    ) -> QueryState<Report> {
        self.query(report_type, filters).wait().await
    }

    /// Start (or join) the fetch for a pair and return an observable handle
    ///
    /// Must be called from within a tokio runtime.
    pub fn query(&self, report_type: ReportType, filters: &ReportFilters) -> ReportQuery {
        let key = match filters.validate().and_then(|_| query_key(report_type, filters)) {
            Ok(key) => key,
            Err(err) => {
                log::warn!("[reports] Rejected {} filters: {}", report_type, err);
                return ReportQuery::rejected(report_type, filters.clone(), err);
            }
        };

        let client = Arc::clone(&self.client);
        let request_filters = filters.clone();
        let rx = self.cache.start(key.clone(), move || async move {
            log::info!("[reports] Fetching {} report", report_type);
            let report = client.fetch_report(report_type, &request_filters).await?;
            if report.report_type() != report_type {
                return Err(Error::invalid_response(format!(
                    "requested {} report, got {}",
                    report_type,
                    report.report_type()
                )));
            }
            Ok(report)
        });

        ReportQuery {
            report_type,
            filters: filters.clone(),
            key: Some(key),
            rx,
        }
    }

    /// Cached state for a pair without fetching
    pub fn cached(&self, report_type: ReportType, filters: &ReportFilters) -> Option<QueryState<Report>> {
        let key = query_key(report_type, filters).ok()?;
        self.cache.peek(&key)
    }

    /// When the cached result for a pair was produced
    pub fn updated_at(&self, report_type: ReportType, filters: &ReportFilters) -> Option<DateTime<Utc>> {
        let key = query_key(report_type, filters).ok()?;
        self.cache.updated_at(&key)
    }

    pub fn invalidate(&self, report_type: ReportType, filters: &ReportFilters) -> bool {
        match query_key(report_type, filters) {
            Ok(key) => self.cache.invalidate(&key),
            Err(_) => false,
        }
    }

    /// Drop every cached entry of one report type
    pub fn invalidate_type(&self, report_type: ReportType) -> usize {
        let prefix = type_prefix(report_type);
        let removed = self.cache.invalidate_where(|key| key.starts_with(&prefix));
        log::info!("[reports] Invalidated {} {} entries", removed, report_type);
        removed
    }

    pub fn clear(&self) -> usize {
        self.cache.clear()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Request one export; every call issues its own request
    pub async fn export_report(
        &self,
        report_type: ReportType,
        filters: &ReportFilters,
        format: ExportFormat,
    ) -> ExportState {
        let client = Arc::clone(&self.client);
        let outcome = self
            .export
            .run(async move {
                filters.validate()?;
                log::info!("[reports] Exporting {} report as {}", report_type, format);
                client.request_export(report_type, filters, format).await
            })
            .await;

        match outcome {
            Ok(artifact) => {
                log::info!("[reports] Export ready: {}", artifact.file_name);
                ExportState::Succeeded(artifact)
            }
            Err(err) => {
                log::warn!("[reports] Export of {} failed: {}", report_type, err);
                ExportState::Failed(err)
            }
        }
    }

    /// Export using caller-owned selection state
    pub async fn export_selection(&self, selection: &ReportSelection) -> ExportState {
        self.export_report(
            selection.report_type,
            &selection.filters,
            selection.export_format,
        )
        .await
    }

    pub fn export_state(&self) -> ExportState {
        self.export.state()
    }

    pub fn subscribe_export(&self) -> watch::Receiver<ExportState> {
        self.export.subscribe()
    }

    pub fn reset_export(&self) {
        self.export.reset();
    }
}

// ============================================================================
// ReportQuery
// ============================================================================

/// Observable handle bound to one `(type, filters)` pair
#[derive(Debug, Clone)]
pub struct ReportQuery {
    report_type: ReportType,
    filters: ReportFilters,
    key: Option<QueryKey>,
    rx: watch::Receiver<QueryState<Report>>,
}

impl ReportQuery {
    fn rejected(report_type: ReportType, filters: ReportFilters, err: Error) -> Self {
        let (_tx, rx) = watch::channel(QueryState::Failed(err));
        Self {
            report_type,
            filters,
            key: None,
            rx,
        }
    }

    pub fn report_type(&self) -> ReportType {
        self.report_type
    }

    pub fn filters(&self) -> &ReportFilters {
        &self.filters
    }

    /// `None` when the filters were rejected before reaching the cache
    pub fn key(&self) -> Option<&QueryKey> {
        self.key.as_ref()
    }

    pub fn state(&self) -> QueryState<Report> {
        self.rx.borrow().clone()
    }

    /// Wait for the next state change; `false` once no more can arrive
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until the query leaves `Pending`
    pub async fn wait(&self) -> QueryState<Report> {
        let current = self.state();
        if !current.is_pending() {
            return current;
        }
        settle(self.rx.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArtifactLocation, ExportArtifact, OrdersReport, ProductsReport, SalesReport};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory backend counting every request
    #[derive(Default)]
    struct MockClient {
        fetches: AtomicUsize,
        exports: AtomicUsize,
        delay: Option<Duration>,
        /// Seen filter sets, in call order
        seen: Mutex<Vec<ReportFilters>>,
    }

    impl MockClient {
        fn slow(delay_ms: u64) -> Self {
            Self {
                delay: Some(Duration::from_millis(delay_ms)),
                ..Default::default()
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReportsClient for MockClient {
        async fn fetch_report(&self, report_type: ReportType, filters: &ReportFilters) -> Result<Report> {
            let call = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
            self.seen.lock().unwrap().push(filters.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if report_type == ReportType::Orders && filters.fields.contains_key("dateRange") {
                return Err(Error::server(500, "orders aggregation failed"));
            }

            Ok(match report_type {
                ReportType::Sales => Report::Sales(SalesReport {
                    total_orders: call as u64,
                    total_revenue: 1000.0 * call as f64,
                    ..Default::default()
                }),
                ReportType::Products => Report::Products(ProductsReport {
                    total_products: 42,
                    ..Default::default()
                }),
                ReportType::Orders => Report::Orders(OrdersReport {
                    total_orders: call as u64,
                    ..Default::default()
                }),
            })
        }

        async fn request_export(
            &self,
            report_type: ReportType,
            _filters: &ReportFilters,
            format: ExportFormat,
        ) -> Result<ExportArtifact> {
            let call = self.exports.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(ExportArtifact {
                file_name: format!("{}-{}.{}", report_type, call, format.extension()),
                content_type: format.content_type().to_string(),
                location: ArtifactLocation::Url {
                    url: format!("https://files.example.cr/{}/{}", report_type, call),
                },
            })
        }
    }

    /// Returns the wrong shape for every request
    struct MismatchedClient;

    #[async_trait]
    impl ReportsClient for MismatchedClient {
        async fn fetch_report(&self, _: ReportType, _: &ReportFilters) -> Result<Report> {
            Ok(Report::Products(ProductsReport::default()))
        }

        async fn request_export(
            &self,
            _: ReportType,
            _: &ReportFilters,
            _: ExportFormat,
        ) -> Result<ExportArtifact> {
            Err(Error::Network("connection refused".to_string()))
        }
    }

    fn january() -> ReportFilters {
        ReportFilters::between(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    fn february() -> ReportFilters {
        ReportFilters::between(
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
        )
    }

    #[test]
    fn test_query_key_is_canonical() {
        let a = ReportFilters::new()
            .with_field("status", "paid")
            .with_field("category", "shoes");
        let b = ReportFilters::new()
            .with_field("category", "shoes")
            .with_field("status", "paid");
        assert_eq!(
            query_key(ReportType::Sales, &a).unwrap(),
            query_key(ReportType::Sales, &b).unwrap()
        );
        assert_ne!(
            query_key(ReportType::Sales, &a).unwrap(),
            query_key(ReportType::Orders, &a).unwrap()
        );
        assert!(query_key(ReportType::Orders, &a)
            .unwrap()
            .starts_with(&type_prefix(ReportType::Orders)));
    }

    #[tokio::test]
    async fn test_same_pair_hits_cache() {
        let client = Arc::new(MockClient::default());
        let reports = Reports::new(Arc::clone(&client));

        let first = reports.get_report(ReportType::Sales, &january()).await;
        let second = reports.get_report(ReportType::Sales, &january()).await;

        assert_eq!(client.fetches(), 1);
        let first = first.into_result().unwrap();
        let second = second.into_result().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(reports.cache_stats().hits, 1);
    }

    #[tokio::test]
    async fn test_empty_filters_still_fetch() {
        let client = Arc::new(MockClient::default());
        let reports = Reports::new(Arc::clone(&client));

        let state = reports.get_report(ReportType::Products, &ReportFilters::new()).await;
        assert!(state.is_ready());
        assert_eq!(client.fetches(), 1);
    }

    #[tokio::test]
    async fn test_changed_filters_fetch_again() {
        let client = Arc::new(MockClient::default());
        let reports = Reports::new(Arc::clone(&client));

        let jan = reports
            .get_report(ReportType::Sales, &january())
            .await
            .into_result()
            .unwrap();
        let feb = reports
            .get_report(ReportType::Sales, &february())
            .await
            .into_result()
            .unwrap();

        assert_eq!(client.fetches(), 2);
        assert_ne!(jan, feb);
        assert_eq!(client.seen.lock().unwrap().last(), Some(&february()));

        // The old pair is still cached and served without a request
        let jan_again = reports
            .get_report(ReportType::Sales, &january())
            .await
            .into_result()
            .unwrap();
        assert!(Arc::ptr_eq(&jan, &jan_again));
        assert_eq!(client.fetches(), 2);
    }

    #[tokio::test]
    async fn test_query_handle_stays_bound_to_its_pair() {
        let client = Arc::new(MockClient::slow(30));
        let reports = Reports::new(Arc::clone(&client));

        let jan = reports.query(ReportType::Sales, &january());
        let feb = reports.query(ReportType::Sales, &february());
        assert!(jan.state().is_pending());

        let jan_state = jan.wait().await;
        let feb_state = feb.wait().await;
        assert_eq!(jan.filters(), &january());
        assert_eq!(feb.filters(), &february());
        assert_ne!(jan_state.data(), feb_state.data());
        assert_ne!(jan.key(), feb.key());
    }

    #[test]
    #[should_panic]
    fn test_query_outside_runtime_panics() {
        let reports = Reports::new(Arc::new(MockClient::default()));
        let _ = reports.query(ReportType::Sales, &january());
    }

    #[test]
    fn test_rejected_query_needs_no_runtime() {
        let client = Arc::new(MockClient::default());
        let reports = Reports::new(Arc::clone(&client));
        let filters = ReportFilters::new().with_field("", "x");

        let query = reports.query(ReportType::Sales, &filters);
        assert!(matches!(query.state().error(), Some(Error::Validation(_))));
        assert_eq!(client.fetches(), 0);
    }

    #[tokio::test]
    async fn test_failing_orders_resolve_to_failed() {
        let client = Arc::new(MockClient::default());
        let reports = Reports::new(Arc::clone(&client));
        let filters = ReportFilters::new().with_field("dateRange", "2024-01");

        let state = reports.get_report(ReportType::Orders, &filters).await;
        assert!(state.is_failed());
        assert_eq!(
            state.error(),
            Some(&Error::server(500, "orders aggregation failed"))
        );

        // No automatic retry, but the next read is a new attempt
        let retry = reports.get_report(ReportType::Orders, &filters).await;
        assert!(retry.is_failed());
        assert_eq!(client.fetches(), 2);
    }

    #[tokio::test]
    async fn test_invalid_filters_fail_without_request() {
        let client = Arc::new(MockClient::default());
        let reports = Reports::new(Arc::clone(&client));

        let state = reports.get_report(ReportType::Sales, &ReportFilters::between(
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        ))
        .await;

        assert!(matches!(state.error(), Some(Error::Validation(_))));
        assert_eq!(client.fetches(), 0);
        assert_eq!(reports.cache_len(), 0);
    }

    #[tokio::test]
    async fn test_mismatched_shape_is_invalid_response() {
        let reports = Reports::new(Arc::new(MismatchedClient));
        let state = reports.get_report(ReportType::Sales, &january()).await;
        assert!(matches!(state.error(), Some(Error::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_concurrent_identical_requests_share_one_fetch() {
        let client = Arc::new(MockClient::slow(50));
        let reports = Reports::new(Arc::clone(&client));

        let jan = january();
        let (a, b, c) = tokio::join!(
            reports.get_report(ReportType::Orders, &jan),
            reports.get_report(ReportType::Orders, &jan),
            reports.get_report(ReportType::Orders, &jan),
        );

        assert_eq!(client.fetches(), 1);
        let a = a.into_result().unwrap();
        assert!(Arc::ptr_eq(&a, &b.into_result().unwrap()));
        assert!(Arc::ptr_eq(&a, &c.into_result().unwrap()));
        assert_eq!(reports.cache_stats().shared, 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let client = Arc::new(MockClient::default());
        let reports = Reports::new(Arc::clone(&client));

        reports.get_report(ReportType::Sales, &january()).await;
        reports.get_report(ReportType::Sales, &february()).await;
        reports.get_report(ReportType::Orders, &january()).await;
        assert!(reports.cached(ReportType::Sales, &january()).is_some());
        assert!(reports.updated_at(ReportType::Sales, &january()).is_some());

        assert!(reports.invalidate(ReportType::Sales, &january()));
        assert!(reports.cached(ReportType::Sales, &january()).is_none());
        reports.get_report(ReportType::Sales, &january()).await;
        assert_eq!(client.fetches(), 4);

        assert_eq!(reports.invalidate_type(ReportType::Sales), 2);
        assert!(reports.cached(ReportType::Orders, &january()).is_some());

        assert_eq!(reports.clear(), 1);
        assert_eq!(reports.cache_len(), 0);
    }

    #[tokio::test]
    async fn test_csv_export_succeeds() {
        let client = Arc::new(MockClient::default());
        let reports = Reports::new(Arc::clone(&client));
        assert!(reports.export_state().is_idle());

        let state = reports
            .export_report(ReportType::Sales, &january(), ExportFormat::Csv)
            .await;

        let artifact = state.artifact().unwrap();
        assert!(!artifact.is_empty());
        assert_eq!(artifact.file_name, "sales-1.csv");
        assert_eq!(reports.export_state(), state);

        reports.reset_export();
        assert!(reports.export_state().is_idle());
    }

    #[tokio::test]
    async fn test_export_failure_is_reported() {
        let reports = Reports::new(Arc::new(MismatchedClient));
        let state = reports
            .export_report(ReportType::Sales, &january(), ExportFormat::Pdf)
            .await;
        assert_eq!(
            state.error(),
            Some(&Error::Network("connection refused".to_string()))
        );
    }

    #[tokio::test]
    async fn test_exports_are_not_deduplicated_and_skip_cache() {
        let client = Arc::new(MockClient::slow(20));
        let reports = Reports::new(Arc::clone(&client));

        let cached = reports
            .get_report(ReportType::Sales, &january())
            .await
            .into_result()
            .unwrap();

        let jan = january();
        let (a, b) = tokio::join!(
            reports.export_report(ReportType::Sales, &jan, ExportFormat::Csv),
            reports.export_report(ReportType::Sales, &jan, ExportFormat::Csv),
        );
        assert!(a.artifact().is_some());
        assert!(b.artifact().is_some());
        assert_ne!(a, b);
        assert_eq!(client.exports.load(Ordering::SeqCst), 2);

        // Read cache untouched
        let after = reports
            .get_report(ReportType::Sales, &january())
            .await
            .into_result()
            .unwrap();
        assert!(Arc::ptr_eq(&cached, &after));
        assert_eq!(client.fetches(), 1);
        assert_eq!(reports.cache_len(), 1);
    }

    #[tokio::test]
    async fn test_export_selection_uses_caller_state() {
        let client = Arc::new(MockClient::default());
        let reports = Reports::new(Arc::clone(&client));
        let selection = ReportSelection {
            report_type: ReportType::Products,
            filters: ReportFilters::new().with_field("category", "calzado"),
            export_format: ExportFormat::Xlsx,
        };

        let state = reports.export_selection(&selection).await;
        assert_eq!(
            state.artifact().map(|a| a.file_name.as_str()),
            Some("products-1.xlsx")
        );
    }

    #[tokio::test]
    async fn test_stale_entries_refetch() {
        let client = Arc::new(MockClient::default());
        let reports = Reports::with_stale_after(Arc::clone(&client), Some(Duration::from_millis(10)));

        reports.get_report(ReportType::Sales, &january()).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        reports.get_report(ReportType::Sales, &january()).await;
        assert_eq!(client.fetches(), 2);
    }
}
