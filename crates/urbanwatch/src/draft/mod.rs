//! # Drafts
//!
//! A draft is the creation form's unsaved state. It lives under its own key,
//! separate from the report list, so an abandoned form never shows up as a
//! report and a half-typed title survives an app restart.
//!
//! [`DraftStore`] is the plain load/save/clear layer used for restore-on-open.
//! [`autosave::DraftAutosave`] sits on top of it and turns a stream of form edits
//! into debounced writes.

pub mod autosave;

use crate::error::Result;
use crate::model::{Category, Priority, ReportInput, ReportLocation};
use crate::store::KvBackend;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

pub use autosave::{DraftAutosave, DraftState, DEFAULT_DEBOUNCE};

pub const DEFAULT_DRAFT_KEY: &str = "reportDraft";

/// An in-progress report. Every field is optional; `timestamp` is when the
/// draft was last written, not a report timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ReportLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Draft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_location(mut self, location: ReportLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// The report this draft would become. The draft timestamp is not carried
    /// over; the report gets its own when it is saved.
    pub fn into_input(self) -> ReportInput {
        ReportInput {
            title: self.title,
            description: self.description,
            image: self.image,
            location: self.location,
            category: self.category,
            priority: self.priority,
            ..ReportInput::default()
        }
    }
}

/// True iff the draft holds anything worth keeping: non-blank text in a text
/// field, a chosen category or priority, or a location.
pub fn has_any_draft_data(draft: &Draft) -> bool {
    let has_text = |field: &Option<String>| field.as_deref().is_some_and(|s| !s.trim().is_empty());
    has_text(&draft.title)
        || has_text(&draft.description)
        || has_text(&draft.image)
        || draft.category.is_some()
        || draft.priority.is_some()
        || draft.location.is_some()
}

pub struct DraftStore<B: KvBackend> {
    backend: Arc<B>,
    key: String,
}

impl<B: KvBackend> DraftStore<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_key(backend, DEFAULT_DRAFT_KEY)
    }

    pub fn with_key(backend: Arc<B>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The saved draft, if any. Unreadable or corrupt values read as `None`.
    pub async fn load(&self) -> Option<Draft> {
        let raw = match self.backend.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %self.key, error = %e, "draft unreadable");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(draft) => Some(draft),
            Err(e) => {
                warn!(key = %self.key, error = %e, "draft is corrupt, ignoring");
                None
            }
        }
    }

    /// Writes `draft`, stamped with the current time.
    pub async fn save(&self, draft: &Draft) -> Result<()> {
        let mut stamped = draft.clone();
        stamped.timestamp = Some(Utc::now());
        let raw = serde_json::to_string(&stamped)?;
        self.backend.set(&self.key, &raw).await?;
        debug!(key = %self.key, "draft saved");
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.backend.remove(&self.key).await?;
        debug!(key = %self.key, "draft cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mem_backend::MemBackend;

    #[test]
    fn blank_text_is_not_data() {
        assert!(!has_any_draft_data(&Draft::new()));
        assert!(!has_any_draft_data(
            &Draft::new().with_title("   ").with_description("\n\t")
        ));
        assert!(has_any_draft_data(&Draft::new().with_title(" x ")));
        assert!(has_any_draft_data(&Draft::new().with_image("file:///a.jpg")));
        assert!(has_any_draft_data(
            &Draft::new().with_priority(Priority::High)
        ));
        assert!(has_any_draft_data(
            &Draft::new().with_location(ReportLocation::new(1.0, 2.0))
        ));
    }

    #[tokio::test]
    async fn save_load_clear() {
        let backend = Arc::new(MemBackend::new());
        let store = DraftStore::new(backend.clone());
        assert_eq!(store.load().await, None);

        let draft = Draft::new()
            .with_title("Broken bench")
            .with_category(Category::Infrastructure);
        store.save(&draft).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.title.as_deref(), Some("Broken bench"));
        assert_eq!(loaded.category, Some(Category::Infrastructure));
        assert!(loaded.timestamp.is_some());

        store.clear().await.unwrap();
        assert_eq!(store.load().await, None);
        assert_eq!(backend.raw(DEFAULT_DRAFT_KEY), None);
    }

    #[tokio::test]
    async fn lenient_tags_and_corrupt_values() {
        let backend = Arc::new(MemBackend::new());
        let store = DraftStore::new(backend.clone());

        backend.insert_raw(DEFAULT_DRAFT_KEY, r#"{"title":"x","category":"safety"}"#);
        let draft = store.load().await.unwrap();
        assert_eq!(draft.category, Some(Category::Security));

        backend.insert_raw(DEFAULT_DRAFT_KEY, "[1, 2");
        assert_eq!(store.load().await, None);
    }

    #[test]
    fn into_input_drops_draft_timestamp() {
        let mut draft = Draft::new().with_title("Leak");
        draft.timestamp = Some(Utc::now());
        let input = draft.into_input();
        assert_eq!(input.title.as_deref(), Some("Leak"));
        assert_eq!(input.timestamp, None);
        assert_eq!(input.id, None);
    }
}
