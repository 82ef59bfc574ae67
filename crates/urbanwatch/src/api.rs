//! # API Facade
//!
//! [`UrbanApi`] is the single entry point for every UI client. It owns one shared
//! backend and the components that live on it:
//!
//! - [`ReportStore`] for the report list,
//! - [`DraftStore`] for the creation form's draft,
//! - [`LocationCache`] for the last known position,
//!
//! plus the [`AppConfig`] they were built from.
//!
//! ## What the API Does NOT Do
//!
//! - **Business logic**: normalization lives in `model`, list invariants in
//!   `store`, projections in `views`.
//! - **Presentation**: no stdout, no formatting; every method returns data.
//!
//! ## Views Read the Cache
//!
//! [`UrbanApi::query`] and friends take the origin from the cached location fix.
//! They never trigger a resolution: refreshing the position is a separate call
//! ([`UrbanApi::resolve_location`]) that the UI makes when it sees fit.
//!
//! ## Generic Over KvBackend
//!
//! - Production: `UrbanApi<FsBackend>`
//! - Testing: `UrbanApi<MemBackend>`

use crate::config::AppConfig;
use crate::draft::{Draft, DraftAutosave, DraftStore};
use crate::error::{Result, UrbanError};
use crate::location::{
    IpApiClient, IpLocator, LocationCache, LocationFix, LocationResolver, PositionProvider,
};
use crate::model::{Report, ReportInput, Status};
use crate::store::report_store::parse_report_list;
use crate::store::{KvBackend, LoadOutcome, ReportStore, SaveOutcome};
use crate::views::{self, Analytics, Coordinates, DashboardStats, ReportQuery};
use std::sync::Arc;

pub struct UrbanApi<B: KvBackend> {
    backend: Arc<B>,
    config: AppConfig,
    reports: ReportStore<B>,
    drafts: Arc<DraftStore<B>>,
    location: LocationCache<B>,
}

impl<B: KvBackend> UrbanApi<B> {
    pub fn new(backend: B, config: AppConfig) -> Self {
        let backend = Arc::new(backend);
        let reports = ReportStore::with_settings(
            backend.clone(),
            config.store.reports_key.clone(),
            config.store.max_reports,
        );
        let drafts = Arc::new(DraftStore::with_key(
            backend.clone(),
            config.store.draft_key.clone(),
        ));
        let location = LocationCache::with_key(backend.clone(), config.store.location_key.clone());
        Self {
            backend,
            config,
            reports,
            drafts,
            location,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn report_store(&self) -> &ReportStore<B> {
        &self.reports
    }

    // --- Reports ---

    pub async fn list_reports(&self) -> Vec<Report> {
        self.reports.list_reports().await
    }

    pub async fn load_reports(&self) -> LoadOutcome {
        self.reports.load_reports().await
    }

    pub async fn get_report_by_id(&self, id: &str) -> Option<Report> {
        self.reports.get_report_by_id(id).await
    }

    /// Like [`get_report_by_id`](Self::get_report_by_id), but a missing id is an error.
    pub async fn require_report(&self, id: &str) -> Result<Report> {
        self.get_report_by_id(id)
            .await
            .ok_or_else(|| UrbanError::ReportNotFound(id.to_string()))
    }

    pub async fn save_report(&self, input: ReportInput) -> Result<SaveOutcome> {
        self.reports.save_report(input).await
    }

    pub async fn update_report_status(&self, id: &str, status: Status) -> Result<Option<Report>> {
        self.reports.update_report_status(id, status).await
    }

    pub async fn delete_report(&self, id: &str) -> Result<bool> {
        self.reports.delete_report(id).await
    }

    pub async fn replace_all(&self, inputs: Vec<ReportInput>) -> Result<usize> {
        self.reports.replace_all(inputs).await
    }

    /// Replaces the whole list with a JSON array in the persisted format.
    pub async fn import_json(&self, raw: &str) -> Result<usize> {
        let inputs = parse_report_list(raw)?;
        self.replace_all(inputs).await
    }

    /// The current list as pretty-printed JSON, in the persisted format.
    pub async fn export_json(&self) -> Result<String> {
        let reports = self.list_reports().await;
        Ok(serde_json::to_string_pretty(&reports)?)
    }

    pub async fn clear_reports(&self) -> Result<()> {
        self.reports.clear_reports().await
    }

    // --- Views ---

    /// Filters and sorts the list, measuring distances from the cached fix.
    pub async fn query(&self, query: &ReportQuery) -> Vec<Report> {
        let reports = self.list_reports().await;
        let origin = self.origin().await;
        query.apply(reports, origin)
    }

    pub async fn analytics(&self) -> Analytics {
        views::compute_analytics(&self.list_reports().await)
    }

    pub async fn dashboard_stats(&self) -> DashboardStats {
        views::dashboard_stats(&self.list_reports().await)
    }

    /// Distance from the cached fix to `report`, if both have a position.
    pub async fn distance_to(&self, report: &Report) -> Option<f64> {
        let origin = self.origin().await?;
        views::report_distance(report, origin)
    }

    async fn origin(&self) -> Option<Coordinates> {
        self.location.load().await.map(|fix| fix.coordinates())
    }

    // --- Drafts ---

    pub async fn load_draft(&self) -> Option<Draft> {
        self.drafts.load().await
    }

    pub async fn save_draft(&self, draft: &Draft) -> Result<()> {
        self.drafts.save(draft).await
    }

    pub async fn clear_draft(&self) -> Result<()> {
        self.drafts.clear().await
    }

    /// Saves the stored draft as a new report and clears it.
    /// Returns `None` when there is no draft to submit.
    pub async fn submit_draft(&self) -> Result<Option<SaveOutcome>> {
        let Some(draft) = self.drafts.load().await else {
            return Ok(None);
        };
        if !crate::draft::has_any_draft_data(&draft) {
            self.drafts.clear().await?;
            return Ok(None);
        }
        let outcome = self.reports.save_report(draft.into_input()).await?;
        self.drafts.clear().await?;
        Ok(Some(outcome))
    }

    // --- Location ---

    pub async fn get_cached_location(&self) -> Option<LocationFix> {
        self.location.load().await
    }

    pub async fn clear_cached_location(&self) -> Result<()> {
        self.location.clear().await
    }

    /// A resolver over this API's cache, configured from `location` settings.
    pub fn location_resolver<P: PositionProvider, I: IpLocator>(
        &self,
        precise: P,
        ip: I,
    ) -> LocationResolver<'_, B, P, I> {
        LocationResolver::new(
            &self.location,
            precise,
            ip,
            self.config.location.fallback_fix(),
        )
        .with_precise_timeout(self.config.location.precise_timeout())
    }

    /// Runs the full fallback chain with `precise` and the configured IP endpoint.
    pub async fn resolve_location<P: PositionProvider>(&self, precise: P) -> Result<LocationFix> {
        let ip = IpApiClient::new(
            self.config.location.ip_lookup_url.clone(),
            self.config.location.http_timeout(),
        )?;
        Ok(self.location_resolver(precise, ip).resolve().await)
    }
}

impl<B: KvBackend + 'static> UrbanApi<B> {
    /// Starts a debounced autosave session on this API's draft key.
    pub fn start_autosave(&self) -> DraftAutosave {
        DraftAutosave::start(self.drafts.clone(), self.config.draft.debounce())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{FixedPosition, LocationSource, NoPrecisePosition};
    use crate::model::{Category, ReportLocation};
    use crate::store::mem_backend::MemBackend;
    use crate::views::{CategoryFilter, RadiusFilter, SortMode};

    struct NoIp;

    impl IpLocator for NoIp {
        async fn locate(&self) -> Result<LocationFix> {
            Err(UrbanError::Location("offline".to_string()))
        }
    }

    fn api() -> UrbanApi<MemBackend> {
        UrbanApi::new(MemBackend::new(), AppConfig::default())
    }

    #[tokio::test]
    async fn keys_come_from_config() {
        let mut config = AppConfig::default();
        config.store.reports_key = "@urban_reports".to_string();
        config.store.max_reports = 2;
        let api = UrbanApi::new(MemBackend::new(), config);

        for title in ["a", "b", "c"] {
            api.save_report(ReportInput::new().with_title(title))
                .await
                .unwrap();
        }
        assert!(api.backend().raw("@urban_reports").is_some());
        assert!(api.backend().raw("reports").is_none());
        assert_eq!(api.list_reports().await.len(), 2);
    }

    #[tokio::test]
    async fn require_report_errors_on_unknown_id() {
        let api = api();
        assert!(matches!(
            api.require_report("missing").await,
            Err(UrbanError::ReportNotFound(id)) if id == "missing"
        ));
    }

    #[tokio::test]
    async fn query_uses_cached_location() {
        let api = api();
        api.save_report(
            ReportInput::new()
                .with_id("near")
                .with_category(Category::Environment)
                .with_location(ReportLocation::new(42.6629, 21.1655)),
        )
        .await
        .unwrap();
        api.save_report(
            ReportInput::new()
                .with_id("far")
                .with_category(Category::Environment)
                .with_location(ReportLocation::new(41.0, 20.0)),
        )
        .await
        .unwrap();

        let query = ReportQuery::new()
            .with_category(CategoryFilter::Only(Category::Environment))
            .with_radius(RadiusFilter::from_selector(10))
            .with_sort(SortMode::Nearest);

        // No fix yet: radius filtering is skipped
        assert_eq!(api.query(&query).await.len(), 2);

        let fix = api
            .location_resolver(FixedPosition::new(42.6629, 21.1655), NoIp)
            .resolve()
            .await;
        assert_eq!(fix.source, LocationSource::Gps);

        let result = api.query(&query).await;
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "near");
        assert_eq!(api.distance_to(&result[0]).await, Some(0.0));
    }

    #[tokio::test]
    async fn fallback_location_is_returned_but_not_cached() {
        let api = api();
        let fix = api.location_resolver(NoPrecisePosition, NoIp).resolve().await;
        assert_eq!(fix.source, LocationSource::Fallback);
        assert_eq!(fix.city.as_deref(), Some("Pristina"));
        assert_eq!(api.get_cached_location().await, None);
    }

    #[tokio::test]
    async fn submit_draft_saves_and_clears() {
        let api = api();
        assert!(api.submit_draft().await.unwrap().is_none());

        api.save_draft(&Draft::new().with_title("Overflowing bin"))
            .await
            .unwrap();
        let outcome = api.submit_draft().await.unwrap().unwrap();
        assert_eq!(outcome.report.title, "Overflowing bin");
        assert_eq!(api.load_draft().await, None);
        assert_eq!(api.list_reports().await.len(), 1);
    }

    #[tokio::test]
    async fn import_and_export_use_persisted_format() {
        let api = api();
        let imported = api
            .import_json(r#"[{"id":"x","title":"Legacy","location":{"lat":"42.1","lng":21.2},"status":"done"}]"#)
            .await
            .unwrap();
        assert_eq!(imported, 1);

        let exported = api.export_json().await.unwrap();
        assert!(exported.contains("\"latitude\": 42.1"));
        assert!(exported.contains("\"status\": \"resolved\""));
        assert!(api.import_json("{}").await.is_err());
    }

    #[tokio::test]
    async fn stats_and_analytics_follow_the_list() {
        let api = api();
        api.save_report(ReportInput::new().with_status(Status::Resolved))
            .await
            .unwrap();
        api.save_report(ReportInput::new()).await.unwrap();

        let stats = api.dashboard_stats().await;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(api.analytics().await.resolved_rate, 50);
    }

    #[tokio::test]
    async fn reports_and_draft_survive_restart() {
        let env = crate::test_utils::TestEnv::new();
        let saved = env
            .api
            .save_report(ReportInput::new().with_title("Street light out"))
            .await
            .unwrap();
        env.api
            .save_draft(&Draft::new().with_description("half typed"))
            .await
            .unwrap();

        let reopened = env.reopen();
        let report = reopened.require_report(&saved.report.id).await.unwrap();
        assert_eq!(report.title, "Street light out");
        let draft = reopened.load_draft().await.unwrap();
        assert_eq!(draft.description.as_deref(), Some("half typed"));
    }
}
