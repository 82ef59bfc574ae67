//! # Location
//!
//! The current position is needed by two things: the distance views (radius
//! filter, nearest sort) and the "near <city>" header. Neither may block on a
//! slow GPS or a dead network, so the position is split in two:
//!
//! - [`LocationCache`]: the last known [`LocationFix`], persisted under its own
//!   key. Views only ever read this.
//! - [`resolver::LocationResolver`]: produces a fresh fix through a fallback chain
//!   and writes every real fix back to the cache.
//!
//! ## Fallback Chain
//!
//! 1. Cached fix (instant, possibly stale).
//! 2. Precise provider (GPS or platform geolocation), bounded by a timeout.
//! 3. IP geolocation ([`ip_api::IpApiClient`]).
//! 4. A fixed fallback position. This one is returned but never cached, so a
//!    later run still tries the real providers first.
//!
//! Failing to locate is never an error: the chain always ends with a fix.

pub mod ip_api;
pub mod resolver;

use crate::error::Result;
use crate::store::KvBackend;
use crate::views::Coordinates;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

pub use ip_api::IpApiClient;
pub use resolver::{FixedPosition, IpLocator, LocationResolver, NoPrecisePosition, PositionProvider};

pub const DEFAULT_LOCATION_KEY: &str = "userLocation";

/// How a fix was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Gps,
    WebGeolocation,
    IpApi,
    Fallback,
}

impl LocationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationSource::Gps => "gps",
            LocationSource::WebGeolocation => "web_geolocation",
            LocationSource::IpApi => "ip_api",
            LocationSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for LocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A position plus what is known about how and when it was obtained.
/// Persisted with an epoch-milliseconds timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Horizontal accuracy in metres, when the provider reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    pub source: LocationSource,
    #[serde(with = "chrono::serde::ts_milliseconds", default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64, source: LocationSource) -> Self {
        Self {
            latitude,
            longitude,
            city: None,
            country: None,
            accuracy: None,
            ip: None,
            source,
            timestamp: Utc::now(),
        }
    }

    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }

    /// Fills a missing city or country from an older fix.
    pub fn inherit_place(mut self, previous: Option<&LocationFix>) -> Self {
        if let Some(previous) = previous {
            if self.city.is_none() {
                self.city = previous.city.clone();
            }
            if self.country.is_none() {
                self.country = previous.country.clone();
            }
        }
        self
    }
}

/// The persisted last-known fix.
pub struct LocationCache<B: KvBackend> {
    backend: Arc<B>,
    key: String,
}

impl<B: KvBackend> LocationCache<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_key(backend, DEFAULT_LOCATION_KEY)
    }

    pub fn with_key(backend: Arc<B>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    /// Last known fix. Absent, unreadable and corrupt values all read as `None`.
    pub async fn load(&self) -> Option<LocationFix> {
        let raw = match self.backend.get(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %self.key, error = %e, "cached location unreadable");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(fix) => Some(fix),
            Err(e) => {
                warn!(key = %self.key, error = %e, "cached location is corrupt, ignoring");
                None
            }
        }
    }

    pub async fn save(&self, fix: &LocationFix) -> Result<()> {
        let raw = serde_json::to_string(fix)?;
        self.backend.set(&self.key, &raw).await?;
        debug!(key = %self.key, source = %fix.source, "cached location updated");
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.backend.remove(&self.key).await
    }
}
