//! # Domain Model: Reports and Normalization
//!
//! This module defines the core data types for urbanwatch: [`Report`], the partial
//! [`ReportInput`], and the tags [`Category`], [`Priority`] and [`Status`].
//!
//! ## The Problem
//!
//! Reports arrive from several places with several shapes:
//! - The creation form, with some fields still unset.
//! - Older app versions, which wrote `lat`/`lng` instead of `latitude`/`longitude`,
//!   free-form status words (`done`, `submitted`) and categories the app no longer offers.
//! - Bulk imports, where any field may be missing or have the wrong JSON type.
//!
//! Readers of the store must never see any of that. Every [`Report`] handed out is
//! complete. Category and priority are always members of their closed sets;
//! an unknown status word is kept as [`Status::Other`].
//!
//! ## Normalization Pipeline
//!
//! 1. **Parsing** ([`ReportInput::from_value`]): lenient extraction from arbitrary JSON.
//!    Strings, numbers and booleans are all accepted for text fields; coordinates may be
//!    numbers or numeric strings; tags are coerced (unknown → default, except status).
//! 2. **Completion** ([`ReportInput::normalize`]): every missing field gets its default.
//!    A missing id is generated, a missing timestamp becomes "now".
//! 3. **Merging** ([`Report::merge`]): only the fields present in an input overwrite an
//!    existing report. The id never changes.
//!
//! ## Defaults
//!
//! | Field | Missing | Unrecognized |
//! |-------|---------|--------------|
//! | `id` | generated | kept verbatim |
//! | `category` | `other` | `other` |
//! | `priority` | `normal` | `normal` |
//! | `status` | `pending` | kept verbatim as [`Status::Other`] |
//! | `timestamp` | now | Unix epoch |
//!
//! An unparseable timestamp maps to the epoch rather than "now" so that a damaged
//! record sinks to the bottom of the list instead of posing as the newest one.
//!
//! Normalization is idempotent: `normalize(from(normalize(x))) == normalize(x)`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Issue category. Closed set; anything else is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Infrastructure,
    Environment,
    Security,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Infrastructure,
        Category::Environment,
        Category::Security,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Infrastructure => "infrastructure",
            Category::Environment => "environment",
            Category::Security => "security",
            Category::Other => "other",
        }
    }

    /// Lenient conversion used by normalization. `safety` is the label older
    /// forms used for `security`.
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "infrastructure" => Category::Infrastructure,
            "environment" => Category::Environment,
            "security" | "safety" => Category::Security,
            _ => Category::Other,
        }
    }
}

/// Strict parsing: only the exact stored value is accepted.
impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Unknown category: {}", s))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Normal,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Priority::Low,
            "high" => Priority::High,
            "urgent" => Priority::Urgent,
            _ => Priority::Normal,
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("Unknown priority: {}", s))
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow status of a report.
///
/// Words written by other clients that fit none of the known states are kept
/// as [`Status::Other`] so they survive a round trip and are not mistaken for
/// open reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Pending,
    InProgress,
    Resolved,
    Rejected,
    Other(String),
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Pending,
        Status::InProgress,
        Status::Resolved,
        Status::Rejected,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Status::Pending => "pending",
            Status::InProgress => "in_progress",
            Status::Resolved => "resolved",
            Status::Rejected => "rejected",
            Status::Other(raw) => raw,
        }
    }

    /// Folds the status words used across app versions onto the known states.
    /// Only a blank status means pending; unknown words are kept lowercased.
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "pending" | "open" | "new" | "submitted" => Status::Pending,
            "in_progress" | "in-progress" | "inprogress" => Status::InProgress,
            "resolved" | "done" | "fixed" | "closed" => Status::Resolved,
            "rejected" => Status::Rejected,
            other => Status::Other(other.to_string()),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| format!("Unknown status: {}", s))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Persisted tags are read through `coerce`, so old or foreign values never fail
// a load. `FromStr` stays strict for user input.
macro_rules! deserialize_coerced {
    ($($ty:ident),*) => {$(
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                String::deserialize(deserializer).map(|raw| $ty::coerce(&raw))
            }
        }
    )*};
}

deserialize_coerced!(Category, Priority, Status);

/// Where a report was filed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl ReportLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            address: None,
            city: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    fn from_value(value: &Value, top_level_city: Option<String>) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        let latitude = pick_num(value, &["latitude", "lat"])?;
        let longitude = pick_num(value, &["longitude", "lng", "lon"])?;
        Some(Self {
            latitude,
            longitude,
            address: pick_str(value, &["address"]),
            city: pick_str(value, &["city"]).or(top_level_city),
        })
    }
}

/// A normalized report. Only ever produced by [`ReportInput::normalize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub location: Option<ReportLocation>,
    pub category: Category,
    pub priority: Priority,
    pub status: Status,
    pub timestamp: DateTime<Utc>,
}

impl Report {
    /// Applies every field present in `input`, leaving the rest untouched.
    /// The id is immutable and is never taken from the input.
    pub fn merge(&mut self, input: ReportInput) {
        if let Some(title) = input.title {
            self.title = title;
        }
        if let Some(description) = input.description {
            self.description = description;
        }
        if let Some(image) = input.image {
            self.image = Some(image);
        }
        if let Some(location) = input.location {
            self.location = Some(location);
        }
        if let Some(category) = input.category {
            self.category = category;
        }
        if let Some(priority) = input.priority {
            self.priority = priority;
        }
        if let Some(status) = input.status {
            self.status = status;
        }
        if let Some(timestamp) = input.timestamp {
            self.timestamp = timestamp;
        }
    }

    pub fn city(&self) -> Option<&str> {
        self.location.as_ref().and_then(|l| l.city.as_deref())
    }
}

/// A partial report: what callers hand to the store, and what persisted JSON
/// is parsed into before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportInput {
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub location: Option<ReportLocation>,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ReportInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
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

    pub fn with_location(mut self, location: ReportLocation) -> Self {
        self.location = Some(location);
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

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Lenient parse of one persisted or imported element.
    ///
    /// Returns `None` only when the value is not a JSON object. Individual
    /// fields that are missing, `null` or of the wrong type are left unset and
    /// filled in by [`normalize`](Self::normalize).
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }

        let top_level_city = pick_str(value, &["city"]);
        let location = value
            .get("location")
            .and_then(|loc| ReportLocation::from_value(loc, top_level_city));

        Some(Self {
            id: pick_str(value, &["id"]),
            title: pick_text(value, "title"),
            description: pick_text(value, "description"),
            image: pick_str(value, &["image"]),
            location,
            category: pick_str(value, &["category"]).map(|s| Category::coerce(&s)),
            priority: pick_str(value, &["priority"]).map(|s| Priority::coerce(&s)),
            status: pick_str(value, &["status"]).map(|s| Status::coerce(&s)),
            timestamp: pick_timestamp(value, &["timestamp", "createdAt", "date"]),
        })
    }

    /// Completes the input into a [`Report`], generating an id and timestamp
    /// when they are absent.
    pub fn normalize(self) -> Report {
        Report {
            id: self
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(generate_report_id),
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            image: self.image,
            location: self.location,
            category: self.category.unwrap_or_default(),
            priority: self.priority.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
        }
    }
}

impl From<Report> for ReportInput {
    fn from(report: Report) -> Self {
        Self {
            id: Some(report.id),
            title: Some(report.title),
            description: Some(report.description),
            image: report.image,
            location: report.location,
            category: Some(report.category),
            priority: Some(report.priority),
            status: Some(report.status),
            timestamp: Some(report.timestamp),
        }
    }
}

/// Millisecond clock component followed by a random suffix. Unique enough for
/// a single device; not meant to be unguessable.
pub fn generate_report_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{}", Utc::now().timestamp_millis(), &suffix[..9])
}

/// Parses a timestamp the way the stored data has historically written it:
/// RFC 3339, `YYYY-MM-DD HH:MM:SS`, a bare date, or epoch milliseconds
/// (as a number or a numeric string).
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = s.parse::<DateTime<Utc>>() {
                return Some(dt);
            }
            if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(Utc.from_utc_datetime(&ndt));
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return date.and_hms_opt(0, 0, 0).map(|ndt| Utc.from_utc_datetime(&ndt));
            }
            s.parse::<i64>()
                .ok()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        }
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

/// First non-empty value among `keys`, stringified if it is a number or bool.
fn pick_str(value: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match value.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            Some(Value::Bool(b)) => return Some(b.to_string()),
            _ => {}
        }
    }
    None
}

/// Like [`pick_str`] but keeps empty strings: an explicit empty title is a value.
fn pick_text(value: &Value, key: &str) -> Option<String> {
    match value.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    }
}

fn pick_num(value: &Value, keys: &[&str]) -> Option<f64> {
    for key in keys {
        let found = match value.get(*key) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        if let Some(n) = found.filter(|n| n.is_finite()) {
            return Some(n);
        }
    }
    None
}

/// First readable timestamp among `keys`. If keys are present but none of
/// them parses, the epoch; if none is present, `None`.
fn pick_timestamp(value: &Value, keys: &[&str]) -> Option<DateTime<Utc>> {
    let mut unreadable = false;
    for key in keys {
        match value.get(*key) {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) if s.trim().is_empty() => {}
            Some(raw) => match parse_timestamp(raw) {
                Some(ts) => return Some(ts),
                None => unreadable = true,
            },
        }
    }
    unreadable.then_some(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_fills_defaults() {
        let report = ReportInput::new()
            .with_title("Pothole")
            .with_category(Category::Infrastructure)
            .normalize();

        assert!(!report.id.is_empty());
        assert_eq!(report.title, "Pothole");
        assert_eq!(report.description, "");
        assert_eq!(report.image, None);
        assert_eq!(report.category, Category::Infrastructure);
        assert_eq!(report.priority, Priority::Normal);
        assert_eq!(report.status, Status::Pending);
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = vec![
            ReportInput::new(),
            ReportInput::new().with_title("Lamp out").with_priority(Priority::Urgent),
            ReportInput::from_value(&json!({
                "id": 42,
                "title": "  spaced  ",
                "location": {"lat": "42.1", "lng": 21.0, "address": "Main St"},
                "category": "Safety",
                "status": "done",
                "timestamp": "not a date"
            }))
            .unwrap(),
        ];

        for input in inputs {
            let once = input.normalize();
            let twice = ReportInput::from(once.clone()).normalize();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn empty_id_is_replaced() {
        let report = ReportInput::new().with_id("").normalize();
        assert!(!report.id.is_empty());
    }

    #[test]
    fn generated_ids_differ() {
        assert_ne!(generate_report_id(), generate_report_id());
    }

    #[test]
    fn coerce_unknown_tags_to_defaults() {
        assert_eq!(Category::coerce("lighting"), Category::Other);
        assert_eq!(Category::coerce("safety"), Category::Security);
        assert_eq!(Category::coerce("Environment"), Category::Environment);
        assert_eq!(Priority::coerce("critical"), Priority::Normal);
        assert_eq!(Status::coerce("submitted"), Status::Pending);
        assert_eq!(Status::coerce("fixed"), Status::Resolved);
        assert_eq!(Status::coerce("in-progress"), Status::InProgress);
        assert_eq!(Status::coerce("  "), Status::Pending);
    }

    #[test]
    fn unknown_status_is_kept() {
        let input = ReportInput::from_value(&json!({"status": "Archived"})).unwrap();
        let report = input.normalize();
        assert_eq!(report.status, Status::Other("archived".to_string()));

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "archived");
        let back: Report = serde_json::from_value(value).unwrap();
        assert_eq!(back.status, report.status);

        assert!("archived".parse::<Status>().is_err());
    }

    #[test]
    fn stored_tags_deserialize_leniently() {
        let report: Report = serde_json::from_value(json!({
            "id": "r1",
            "title": "t",
            "description": "",
            "image": null,
            "location": null,
            "category": "safety",
            "priority": "critical",
            "status": "done",
            "timestamp": "2024-01-15T10:30:00Z"
        }))
        .unwrap();
        assert_eq!(report.category, Category::Security);
        assert_eq!(report.priority, Priority::Normal);
        assert_eq!(report.status, Status::Resolved);
    }

    #[test]
    fn strict_parse_requires_exact_value() {
        assert_eq!("security".parse::<Category>(), Ok(Category::Security));
        assert!("Security".parse::<Category>().is_err());
        assert!("safety".parse::<Category>().is_err());
        assert_eq!("in_progress".parse::<Status>(), Ok(Status::InProgress));
    }

    #[test]
    fn from_value_reads_legacy_location_keys() {
        let input = ReportInput::from_value(&json!({
            "location": {"lat": 42.6629, "lng": 21.1655, "address": "Current Location"},
            "city": "Prishtina"
        }))
        .unwrap();

        let location = input.location.unwrap();
        assert_eq!(location.latitude, 42.6629);
        assert_eq!(location.longitude, 21.1655);
        assert_eq!(location.address.as_deref(), Some("Current Location"));
        assert_eq!(location.city.as_deref(), Some("Prishtina"));
    }

    #[test]
    fn from_value_drops_incomplete_location() {
        let input = ReportInput::from_value(&json!({"location": {"latitude": 42.0}})).unwrap();
        assert_eq!(input.location, None);
    }

    #[test]
    fn from_value_rejects_non_objects() {
        assert!(ReportInput::from_value(&json!(null)).is_none());
        assert!(ReportInput::from_value(&json!("report")).is_none());
    }

    #[test]
    fn from_value_stringifies_scalars() {
        let input = ReportInput::from_value(&json!({"id": 17, "title": 5, "description": true}))
            .unwrap();
        assert_eq!(input.id.as_deref(), Some("17"));
        assert_eq!(input.title.as_deref(), Some("5"));
        assert_eq!(input.description.as_deref(), Some("true"));
    }

    #[test]
    fn timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(
            parse_timestamp(&json!("2024-01-15T10:30:00Z")),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(&json!("2024-01-15 10:30:00")),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(&json!(expected.timestamp_millis())),
            Some(expected)
        );
        assert_eq!(parse_timestamp(&json!("Monday, January 15")), None);
    }

    #[test]
    fn unreadable_timestamp_maps_to_epoch() {
        let input = ReportInput::from_value(&json!({"timestamp": "garbage"})).unwrap();
        assert_eq!(input.timestamp, Some(DateTime::<Utc>::UNIX_EPOCH));

        let missing = ReportInput::from_value(&json!({"timestamp": null})).unwrap();
        assert_eq!(missing.timestamp, None);
    }

    #[test]
    fn unreadable_timestamp_falls_through_to_created_at() {
        let input = ReportInput::from_value(&json!({
            "timestamp": "garbage",
            "createdAt": "2024-01-15T10:30:00Z"
        }))
        .unwrap();
        assert_eq!(
            input.timestamp,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap())
        );
    }

    #[test]
    fn created_at_is_used_when_timestamp_missing() {
        let input = ReportInput::from_value(&json!({"createdAt": "2024-01-15T10:30:00Z"}))
            .unwrap();
        assert_eq!(
            input.timestamp,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap())
        );
    }

    #[test]
    fn merge_keeps_unset_fields() {
        let mut report = ReportInput::new()
            .with_id("X")
            .with_title("A")
            .with_status(Status::Pending)
            .normalize();

        report.merge(ReportInput::new().with_id("Y").with_status(Status::Resolved));

        assert_eq!(report.id, "X");
        assert_eq!(report.title, "A");
        assert_eq!(report.status, Status::Resolved);
    }

    #[test]
    fn serialized_tags_use_snake_case() {
        let report = ReportInput::new()
            .with_id("r1")
            .with_status(Status::InProgress)
            .normalize();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "in_progress");
        assert_eq!(value["category"], "other");
        assert_eq!(value["image"], Value::Null);
    }
}
