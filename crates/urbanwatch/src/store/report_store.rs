use super::backend::KvBackend;
use crate::error::{Result, UrbanError};
use crate::model::{Report, ReportInput, Status};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const DEFAULT_REPORTS_KEY: &str = "reports";
pub const DEFAULT_MAX_REPORTS: usize = 200;

/// What a read of the report key found.
///
/// [`ReportStore::list_reports`] collapses every variant to a plain list;
/// callers that care about the difference use [`ReportStore::load_reports`].
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Vec<Report>),
    /// The key is absent.
    Empty,
    /// The key holds something that is not a JSON array.
    Corrupt(UrbanError),
    /// The backend failed to read.
    Unavailable(UrbanError),
}

impl LoadOutcome {
    pub fn into_reports(self) -> Vec<Report> {
        match self {
            LoadOutcome::Loaded(reports) => reports,
            _ => Vec::new(),
        }
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, LoadOutcome::Corrupt(_))
    }
}

/// Result of [`ReportStore::save_report`].
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    /// The report as stored, after normalization and merging.
    pub report: Report,
    /// Ids dropped to keep the store within its cap, oldest last.
    pub evicted: Vec<String>,
}

/// Sole reader and writer of the persisted report list.
///
/// Every mutation is a read-modify-write of the whole list under a
/// single-writer lock, so concurrent calls on the same store are applied one
/// after another and none is lost. Readers never take the lock: the backend's
/// `set` is atomic, so they always see a complete list.
pub struct ReportStore<B: KvBackend> {
    backend: Arc<B>,
    key: String,
    max_reports: usize,
    write_lock: Mutex<()>,
}

impl<B: KvBackend> ReportStore<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_settings(backend, DEFAULT_REPORTS_KEY, DEFAULT_MAX_REPORTS)
    }

    pub fn with_settings(backend: Arc<B>, key: impl Into<String>, max_reports: usize) -> Self {
        Self {
            backend,
            key: key.into(),
            max_reports: max_reports.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn max_reports(&self) -> usize {
        self.max_reports
    }

    /// Read the list, telling apart "absent", "corrupt" and "unreadable".
    pub async fn load_reports(&self) -> LoadOutcome {
        let raw = match self.backend.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return LoadOutcome::Empty,
            Err(e) => return LoadOutcome::Unavailable(e),
        };

        match parse_report_list(&raw) {
            Ok(inputs) => {
                let reports =
                    canonicalize(inputs.into_iter().map(ReportInput::normalize).collect());
                debug!(key = %self.key, count = reports.len(), "loaded reports");
                LoadOutcome::Loaded(reports)
            }
            Err(e) => LoadOutcome::Corrupt(e),
        }
    }

    /// All reports, newest first. Never fails: unreadable or corrupt data
    /// yields an empty list.
    pub async fn list_reports(&self) -> Vec<Report> {
        match self.load_reports().await {
            LoadOutcome::Loaded(reports) => reports,
            LoadOutcome::Empty => Vec::new(),
            LoadOutcome::Corrupt(e) => {
                warn!(key = %self.key, error = %e, "stored report list is corrupt");
                Vec::new()
            }
            LoadOutcome::Unavailable(e) => {
                warn!(key = %self.key, error = %e, "failed to read reports");
                Vec::new()
            }
        }
    }

    pub async fn get_report_by_id(&self, id: &str) -> Option<Report> {
        self.list_reports().await.into_iter().find(|r| r.id == id)
    }

    /// Create or update a report.
    ///
    /// A new report is prepended; an input whose id already exists is merged
    /// into that entry, overwriting only the fields it carries. The list is
    /// then re-sorted and capped, and written back with a single `set`.
    pub async fn save_report(&self, input: ReportInput) -> Result<SaveOutcome> {
        let _guard = self.write_lock.lock().await;
        let mut reports = self.read_for_update().await?;

        let existing = input
            .id
            .as_deref()
            .filter(|id| !id.is_empty())
            .and_then(|id| reports.iter().position(|r| r.id == id));

        let saved = match existing {
            Some(pos) => {
                reports[pos].merge(input);
                reports[pos].clone()
            }
            None => {
                let report = input.normalize();
                reports.insert(0, report.clone());
                report
            }
        };

        let mut reports = canonicalize(reports);
        let evicted = self.enforce_cap(&mut reports);
        self.write(&reports).await?;

        debug!(id = %saved.id, "saved report");
        Ok(SaveOutcome {
            report: saved,
            evicted,
        })
    }

    /// Set the status of one report. Returns the updated report, or `None`
    /// when no report has that id (nothing is written in that case).
    pub async fn update_report_status(&self, id: &str, status: Status) -> Result<Option<Report>> {
        let _guard = self.write_lock.lock().await;
        let mut reports = self.read_for_update().await?;

        let Some(report) = reports.iter_mut().find(|r| r.id == id) else {
            debug!(id, "status update for unknown report");
            return Ok(None);
        };
        report.status = status;
        let updated = report.clone();

        self.write(&reports).await?;
        Ok(Some(updated))
    }

    /// Remove one report. Returns whether anything was removed.
    pub async fn delete_report(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut reports = self.read_for_update().await?;

        let before = reports.len();
        reports.retain(|r| r.id != id);
        if reports.len() == before {
            return Ok(false);
        }

        self.write(&reports).await?;
        Ok(true)
    }

    /// Overwrite the whole store. Returns how many reports were kept.
    pub async fn replace_all(&self, inputs: Vec<ReportInput>) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        let mut reports = canonicalize(inputs.into_iter().map(ReportInput::normalize).collect());
        self.enforce_cap(&mut reports);
        self.write(&reports).await?;
        Ok(reports.len())
    }

    /// Drop the report key entirely.
    pub async fn clear_reports(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.backend.remove(&self.key).await
    }

    /// Reads the current list for a mutation. A corrupt value is replaced on
    /// the next write; an unreadable backend aborts the mutation so nothing
    /// gets overwritten blindly.
    async fn read_for_update(&self) -> Result<Vec<Report>> {
        match self.load_reports().await {
            LoadOutcome::Loaded(reports) => Ok(reports),
            LoadOutcome::Empty => Ok(Vec::new()),
            LoadOutcome::Corrupt(e) => {
                warn!(key = %self.key, error = %e, "replacing corrupt report list");
                Ok(Vec::new())
            }
            LoadOutcome::Unavailable(e) => Err(e),
        }
    }

    fn enforce_cap(&self, reports: &mut Vec<Report>) -> Vec<String> {
        if reports.len() <= self.max_reports {
            return Vec::new();
        }
        let evicted: Vec<String> = reports
            .split_off(self.max_reports)
            .into_iter()
            .map(|r| r.id)
            .collect();
        info!(
            count = evicted.len(),
            max = self.max_reports,
            "evicted oldest reports"
        );
        evicted
    }

    async fn write(&self, reports: &[Report]) -> Result<()> {
        let content = serde_json::to_string(reports)?;
        self.backend.set(&self.key, &content).await
    }
}

/// Parses a serialized report list into inputs. Elements that are not
/// objects are skipped; anything other than a JSON array is an error.
pub fn parse_report_list(raw: &str) -> Result<Vec<ReportInput>> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Array(items) = value else {
        return Err(UrbanError::Backend(
            "expected a JSON array of reports".to_string(),
        ));
    };

    let inputs: Vec<ReportInput> = items.iter().filter_map(ReportInput::from_value).collect();
    if inputs.len() != items.len() {
        debug!(
            skipped = items.len() - inputs.len(),
            "skipped non-object report entries"
        );
    }
    Ok(inputs)
}

/// Dedupe by id (last one wins, in the slot of the first) and sort newest
/// first. The sort is stable, so equal timestamps keep their relative order.
pub fn canonicalize(reports: Vec<Report>) -> Vec<Report> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(reports.len());
    let mut unique: Vec<Report> = Vec::with_capacity(reports.len());

    for report in reports {
        match positions.get(&report.id) {
            Some(&pos) => unique[pos] = report,
            None => {
                positions.insert(report.id.clone(), unique.len());
                unique.push(report);
            }
        }
    }

    unique.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, Priority};
    use crate::store::mem_backend::MemBackend;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::collections::HashSet;

    fn store() -> (Arc<MemBackend>, ReportStore<MemBackend>) {
        let backend = Arc::new(MemBackend::new());
        (backend.clone(), ReportStore::new(backend))
    }

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    #[tokio::test]
    async fn save_into_empty_store() {
        let (_, store) = store();
        store
            .save_report(
                ReportInput::new()
                    .with_title("Pothole")
                    .with_category(Category::Infrastructure),
            )
            .await
            .unwrap();

        let reports = store.list_reports().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status, Status::Pending);
        assert_eq!(reports[0].priority, Priority::Normal);
        assert!(!reports[0].id.is_empty());
    }

    #[tokio::test]
    async fn save_merges_existing_id() {
        let (_, store) = store();
        store
            .save_report(
                ReportInput::new()
                    .with_id("X")
                    .with_title("A")
                    .with_status(Status::Pending),
            )
            .await
            .unwrap();
        store
            .save_report(ReportInput::new().with_id("X").with_status(Status::Resolved))
            .await
            .unwrap();

        let reports = store.list_reports().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, "X");
        assert_eq!(reports[0].title, "A");
        assert_eq!(reports[0].status, Status::Resolved);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let (_, store) = store();
        for (id, minutes) in [("a", 5), ("b", 1), ("c", 9), ("d", 3)] {
            store
                .save_report(ReportInput::new().with_id(id).with_timestamp(at(minutes)))
                .await
                .unwrap();
        }

        let ids: Vec<String> = store.list_reports().await.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["c", "a", "d", "b"]);
    }

    #[tokio::test]
    async fn cap_keeps_most_recent() {
        let backend = Arc::new(MemBackend::new());
        let store = ReportStore::with_settings(backend, "reports", 3);

        // Saved out of chronological order: eviction must follow timestamps.
        let mut evicted = Vec::new();
        for (id, minutes) in [("m5", 5), ("m1", 1), ("m4", 4), ("m2", 2), ("m3", 3)] {
            let outcome = store
                .save_report(ReportInput::new().with_id(id).with_timestamp(at(minutes)))
                .await
                .unwrap();
            evicted.extend(outcome.evicted);
        }

        let ids: Vec<String> = store.list_reports().await.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["m5", "m4", "m3"]);
        assert_eq!(evicted, vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn update_status_only_touches_match() {
        let (_, store) = store();
        store
            .save_report(ReportInput::new().with_id("a").with_timestamp(at(1)))
            .await
            .unwrap();
        store
            .save_report(ReportInput::new().with_id("b").with_timestamp(at(2)))
            .await
            .unwrap();

        let updated = store
            .update_report_status("a", Status::Resolved)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, Status::Resolved);

        let b = store.get_report_by_id("b").await.unwrap();
        assert_eq!(b.status, Status::Pending);
    }

    #[tokio::test]
    async fn update_status_unknown_id_is_noop() {
        let (backend, store) = store();
        store
            .save_report(ReportInput::new().with_id("a"))
            .await
            .unwrap();
        let writes = backend.write_count("reports");

        let result = store
            .update_report_status("missing", Status::Resolved)
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(backend.write_count("reports"), writes);
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let (_, store) = store();
        store
            .save_report(ReportInput::new().with_id("a"))
            .await
            .unwrap();

        assert!(store.delete_report("a").await.unwrap());
        assert!(!store.delete_report("a").await.unwrap());
        assert!(store.list_reports().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_value_reads_as_empty() {
        let (backend, store) = store();
        backend.insert_raw("reports", "{not json");

        assert!(store.load_reports().await.is_corrupt());
        assert!(store.list_reports().await.is_empty());
        assert!(store.get_report_by_id("x").await.is_none());

        // A save replaces the corrupt value
        store
            .save_report(ReportInput::new().with_id("fresh"))
            .await
            .unwrap();
        assert_eq!(store.list_reports().await.len(), 1);
    }

    #[tokio::test]
    async fn non_array_value_is_corrupt() {
        let (backend, store) = store();
        backend.insert_raw("reports", r#"{"id": "a"}"#);
        assert!(store.load_reports().await.is_corrupt());
    }

    #[tokio::test]
    async fn absent_key_is_empty_not_corrupt() {
        let (_, store) = store();
        assert!(matches!(store.load_reports().await, LoadOutcome::Empty));
    }

    #[tokio::test]
    async fn unreadable_backend_fails_mutations() {
        let (backend, store) = store();
        store
            .save_report(ReportInput::new().with_id("keep"))
            .await
            .unwrap();

        backend.set_simulate_read_error(true);
        assert!(matches!(
            store.load_reports().await,
            LoadOutcome::Unavailable(_)
        ));
        assert!(store.list_reports().await.is_empty());
        assert!(store.save_report(ReportInput::new()).await.is_err());
        assert!(store.delete_report("keep").await.is_err());

        backend.set_simulate_read_error(false);
        assert_eq!(store.list_reports().await.len(), 1);
    }

    #[tokio::test]
    async fn write_failure_is_reported() {
        let (backend, store) = store();
        backend.set_simulate_write_error(true);

        assert!(store.save_report(ReportInput::new()).await.is_err());
        assert!(store.replace_all(vec![ReportInput::new()]).await.is_err());
        assert!(store.list_reports().await.is_empty());
    }

    #[tokio::test]
    async fn persisted_duplicates_collapse() {
        let (backend, store) = store();
        backend.insert_raw(
            "reports",
            r#"[
                {"id": "a", "title": "first", "timestamp": "2025-06-01T10:00:00Z"},
                {"id": "b", "title": "other", "timestamp": "2025-06-01T11:00:00Z"},
                {"id": "a", "title": "second", "timestamp": "2025-06-01T09:00:00Z"},
                42
            ]"#,
        );

        let reports = store.list_reports().await;
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].id, "b");
        assert_eq!(reports[1].id, "a");
        assert_eq!(reports[1].title, "second");
    }

    #[tokio::test]
    async fn replace_all_overwrites_and_caps() {
        let backend = Arc::new(MemBackend::new());
        let store = ReportStore::with_settings(backend, "reports", 2);
        store
            .save_report(ReportInput::new().with_id("old"))
            .await
            .unwrap();

        let kept = store
            .replace_all(vec![
                ReportInput::new().with_id("x").with_timestamp(at(1)),
                ReportInput::new().with_id("y").with_timestamp(at(2)),
                ReportInput::new().with_id("x").with_timestamp(at(3)),
                ReportInput::new().with_id("z").with_timestamp(at(0)),
            ])
            .await
            .unwrap();

        assert_eq!(kept, 2);
        let ids: Vec<String> = store.list_reports().await.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["x", "y"]);
    }

    #[tokio::test]
    async fn clear_removes_key() {
        let (backend, store) = store();
        store
            .save_report(ReportInput::new().with_id("a"))
            .await
            .unwrap();
        store.clear_reports().await.unwrap();

        assert!(backend.raw("reports").is_none());
        assert!(store.list_reports().await.is_empty());
    }

    #[tokio::test]
    async fn concurrent_saves_are_not_lost() {
        let (_, store) = store();
        let store = Arc::new(store);

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..10 {
            let store = store.clone();
            tasks.spawn(async move {
                store
                    .save_report(ReportInput::new().with_id(format!("r{}", i)))
                    .await
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap().unwrap();
        }

        let ids: HashSet<String> = store.list_reports().await.into_iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), 10);
    }

    #[tokio::test]
    async fn concurrent_status_and_delete_both_apply() {
        let (_, store) = store();
        store
            .replace_all(vec![
                ReportInput::new().with_id("a"),
                ReportInput::new().with_id("b"),
            ])
            .await
            .unwrap();

        let (updated, deleted) = tokio::join!(
            store.update_report_status("a", Status::Resolved),
            store.delete_report("b"),
        );
        assert!(updated.unwrap().is_some());
        assert!(deleted.unwrap());

        let reports = store.list_reports().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].id, "a");
        assert_eq!(reports[0].status, Status::Resolved);
    }
}
