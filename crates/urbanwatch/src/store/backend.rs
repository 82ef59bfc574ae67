use crate::error::Result;
use std::future::Future;

/// Abstract interface for raw key-value I/O.
///
/// This trait handles the "how" of storage (filesystem vs memory), while
/// [`ReportStore`](super::report_store::ReportStore), the draft store and the
/// location cache handle the "what". Keys are plain strings and values are
/// UTF-8 JSON text.
///
/// Implementations take `&self` everywhere and handle their own interior
/// mutability, so one backend can be shared (behind an `Arc`) by every
/// component of the app.
pub trait KvBackend: Send + Sync {
    /// Read the value stored under `key`.
    /// Returns Ok(None) if the key is absent.
    /// Returns Err only on actual I/O errors.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Store `value` under `key`, replacing any previous value.
    /// MUST be atomic: readers see either the old or the new value, never a mix.
    fn set(&self, key: &str, value: &str) -> impl Future<Output = Result<()>> + Send;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<()>> + Send;
}
