use super::mem_backend::MemBackend;
use super::report_store::ReportStore;
use std::sync::Arc;

pub type InMemoryStore = ReportStore<MemBackend>;

impl InMemoryStore {
    pub fn in_memory() -> Self {
        ReportStore::new(Arc::new(MemBackend::new()))
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;
    use crate::model::{Category, Priority, ReportInput, ReportLocation, Status};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    /// Fixed reference instant so fixture timestamps are deterministic.
    pub fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    /// Builds a list of inputs that can be loaded into any store in one go.
    #[derive(Default)]
    pub struct StoreFixture {
        pub inputs: Vec<ReportInput>,
    }

    impl StoreFixture {
        pub fn new() -> Self {
            Self::default()
        }

        /// `count` plain reports, one minute apart, the last one newest.
        pub fn with_reports(mut self, count: usize) -> Self {
            let offset = self.inputs.len();
            for i in 0..count {
                let n = offset + i;
                self.inputs.push(
                    ReportInput::new()
                        .with_id(format!("report-{}", n + 1))
                        .with_title(format!("Report {}", n + 1))
                        .with_timestamp(base_time() + Duration::minutes(n as i64)),
                );
            }
            self
        }

        pub fn with_report(mut self, id: &str, category: Category, priority: Priority) -> Self {
            let minutes = self.inputs.len() as i64;
            self.inputs.push(
                ReportInput::new()
                    .with_id(id)
                    .with_title(id)
                    .with_category(category)
                    .with_priority(priority)
                    .with_timestamp(base_time() + Duration::minutes(minutes)),
            );
            self
        }

        pub fn with_located_report(mut self, id: &str, latitude: f64, longitude: f64) -> Self {
            let minutes = self.inputs.len() as i64;
            self.inputs.push(
                ReportInput::new()
                    .with_id(id)
                    .with_title(id)
                    .with_location(ReportLocation::new(latitude, longitude))
                    .with_timestamp(base_time() + Duration::minutes(minutes)),
            );
            self
        }

        pub fn with_status(mut self, id: &str, status: Status) -> Self {
            let minutes = self.inputs.len() as i64;
            self.inputs.push(
                ReportInput::new()
                    .with_id(id)
                    .with_status(status)
                    .with_timestamp(base_time() + Duration::minutes(minutes)),
            );
            self
        }

        /// Normalized reports, newest first, without touching a store.
        pub fn reports(&self) -> Vec<crate::model::Report> {
            crate::store::report_store::canonicalize(
                self.inputs
                    .iter()
                    .cloned()
                    .map(ReportInput::normalize)
                    .collect(),
            )
        }

        pub async fn into_store(self) -> crate::error::Result<InMemoryStore> {
            let store = InMemoryStore::in_memory();
            store.replace_all(self.inputs).await?;
            Ok(store)
        }
    }
}
