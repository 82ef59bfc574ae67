use super::{LocationCache, LocationFix, LocationSource};
use crate::error::{Result, UrbanError};
use crate::store::KvBackend;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_PRECISE_TIMEOUT: Duration = Duration::from_secs(8);

/// Precise positioning: device GPS or platform geolocation.
///
/// Denial, lack of hardware and errors are all reported as `Err`; the resolver
/// treats every error the same way and moves on to the next step.
pub trait PositionProvider: Send + Sync {
    fn current_position(&self) -> impl Future<Output = Result<LocationFix>> + Send;
}

/// Coarse positioning from the public IP address.
pub trait IpLocator: Send + Sync {
    fn locate(&self) -> impl Future<Output = Result<LocationFix>> + Send;
}

/// A precise provider that always reports the same position.
/// Used for manually entered coordinates.
pub struct FixedPosition {
    fix: LocationFix,
}

impl FixedPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            fix: LocationFix::new(latitude, longitude, LocationSource::Gps),
        }
    }
}

impl PositionProvider for FixedPosition {
    async fn current_position(&self) -> Result<LocationFix> {
        let mut fix = self.fix.clone();
        fix.timestamp = chrono::Utc::now();
        Ok(fix)
    }
}

/// Stand-in for platforms without any precise positioning.
pub struct NoPrecisePosition;

impl PositionProvider for NoPrecisePosition {
    async fn current_position(&self) -> Result<LocationFix> {
        Err(UrbanError::Location(
            "no precise position provider".to_string(),
        ))
    }
}

/// Walks the fallback chain: precise, IP, fixed fallback.
pub struct LocationResolver<'a, B: KvBackend, P: PositionProvider, I: IpLocator> {
    cache: &'a LocationCache<B>,
    precise: P,
    ip: I,
    precise_timeout: Duration,
    fallback: LocationFix,
}

impl<'a, B: KvBackend, P: PositionProvider, I: IpLocator> LocationResolver<'a, B, P, I> {
    pub fn new(cache: &'a LocationCache<B>, precise: P, ip: I, fallback: LocationFix) -> Self {
        Self {
            cache,
            precise,
            ip,
            precise_timeout: DEFAULT_PRECISE_TIMEOUT,
            fallback,
        }
    }

    pub fn with_precise_timeout(mut self, timeout: Duration) -> Self {
        self.precise_timeout = timeout;
        self
    }

    /// The last known fix, without any provider calls.
    pub async fn cached(&self) -> Option<LocationFix> {
        self.cache.load().await
    }

    /// Produces a fresh fix. Never fails.
    ///
    /// A precise fix that lacks a city or country keeps the ones from the
    /// previously cached fix. Every provider fix is written to the cache; the
    /// fixed fallback is not.
    pub async fn resolve(&self) -> LocationFix {
        let previous = self.cache.load().await;

        match tokio::time::timeout(self.precise_timeout, self.precise.current_position()).await {
            Ok(Ok(fix)) => {
                let fix = fix.inherit_place(previous.as_ref());
                return self.remember(fix).await;
            }
            Ok(Err(e)) => debug!(error = %e, "precise position unavailable"),
            Err(_) => debug!(timeout = ?self.precise_timeout, "precise position timed out"),
        }

        match self.ip.locate().await {
            Ok(fix) => return self.remember(fix).await,
            Err(e) => debug!(error = %e, "IP location unavailable"),
        }

        info!(source = %LocationSource::Fallback, "using fallback location");
        let mut fix = self.fallback.clone();
        fix.source = LocationSource::Fallback;
        fix.timestamp = chrono::Utc::now();
        fix
    }

    async fn remember(&self, fix: LocationFix) -> LocationFix {
        info!(source = %fix.source, "location resolved");
        if let Err(e) = self.cache.save(&fix).await {
            warn!(error = %e, "failed to cache location");
        }
        fix
    }
}
