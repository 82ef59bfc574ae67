//! # Configuration
//!
//! Urbanwatch configuration is loaded with [`confique`] from layered sources and
//! then passed down explicitly; nothing reads preferences from storage at use time.
//!
//! ## Sources
//!
//! In priority order:
//! 1. **Environment variables**: `URBANWATCH_MAX_REPORTS`, `URBANWATCH_LANGUAGE`, etc.
//! 2. **Config file**: `urbanwatch.toml` in the data directory.
//! 3. **Compiled defaults**: via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `language` | `sq` | UI language (`sq` or `en`) |
//! | `theme` | `system` | `light`, `dark` or `system` |
//! | `store.reports_key` | `reports` | Backend key of the report list |
//! | `store.draft_key` | `reportDraft` | Backend key of the draft |
//! | `store.location_key` | `userLocation` | Backend key of the cached fix |
//! | `store.max_reports` | `200` | Report cap; the oldest are evicted |
//! | `draft.debounce_ms` | `650` | Autosave quiet period |
//! | `location.precise_timeout_ms` | `8000` | Precise provider timeout |
//! | `location.ip_lookup_url` | `https://ipapi.co/json/` | IP geolocation endpoint |
//! | `location.http_timeout_secs` | `10` | IP lookup HTTP timeout |
//! | `location.fallback_*` | Pristina | Last-resort position |

use crate::error::Result;
use crate::location::{LocationFix, LocationSource};
use confique::Config;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "urbanwatch.toml";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Sq,
    En,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// Configuration for urbanwatch, stored in `urbanwatch.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AppConfig {
    #[config(default = "sq", env = "URBANWATCH_LANGUAGE")]
    pub language: Language,

    #[config(default = "system", env = "URBANWATCH_THEME")]
    pub theme: Theme,

    #[config(nested)]
    pub store: StoreConfig,

    #[config(nested)]
    pub draft: DraftConfig,

    #[config(nested)]
    pub location: LocationConfig,
}

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    #[config(default = "reports")]
    pub reports_key: String,

    #[config(default = "reportDraft")]
    pub draft_key: String,

    #[config(default = "userLocation")]
    pub location_key: String,

    /// Maximum number of reports kept. Values below 1 are treated as 1.
    #[config(default = 200, env = "URBANWATCH_MAX_REPORTS")]
    pub max_reports: usize,
}

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DraftConfig {
    #[config(default = 650, env = "URBANWATCH_DRAFT_DEBOUNCE_MS")]
    pub debounce_ms: u64,
}

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LocationConfig {
    #[config(default = 8000)]
    pub precise_timeout_ms: u64,

    #[config(default = "https://ipapi.co/json/", env = "URBANWATCH_IP_LOOKUP_URL")]
    pub ip_lookup_url: String,

    #[config(default = 10)]
    pub http_timeout_secs: u64,

    #[config(default = 42.6629)]
    pub fallback_latitude: f64,

    #[config(default = 21.1655)]
    pub fallback_longitude: f64,

    #[config(default = "Pristina")]
    pub fallback_city: String,

    #[config(default = "Kosovo")]
    pub fallback_country: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            language: Language::Sq,
            theme: Theme::System,
            store: StoreConfig::default(),
            draft: DraftConfig::default(),
            location: LocationConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            reports_key: "reports".to_string(),
            draft_key: "reportDraft".to_string(),
            location_key: "userLocation".to_string(),
            max_reports: 200,
        }
    }
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self { debounce_ms: 650 }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            precise_timeout_ms: 8000,
            ip_lookup_url: "https://ipapi.co/json/".to_string(),
            http_timeout_secs: 10,
            fallback_latitude: 42.6629,
            fallback_longitude: 21.1655,
            fallback_city: "Pristina".to_string(),
            fallback_country: "Kosovo".to_string(),
        }
    }
}

impl AppConfig {
    /// Loads from the environment, then `file` (if it exists), then defaults.
    pub fn load(file: &Path) -> Result<Self> {
        let config = AppConfig::builder().env().file(file).load()?;
        Ok(config)
    }

    /// Loads `urbanwatch.toml` from `data_dir`.
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        Self::load(&data_dir.join(CONFIG_FILE_NAME))
    }
}

impl DraftConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl LocationConfig {
    pub fn precise_timeout(&self) -> Duration {
        Duration::from_millis(self.precise_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn fallback_fix(&self) -> LocationFix {
        LocationFix::new(
            self.fallback_latitude,
            self.fallback_longitude,
            LocationSource::Fallback,
        )
        .with_city(self.fallback_city.clone())
        .with_country(self.fallback_country.clone())
    }
}
