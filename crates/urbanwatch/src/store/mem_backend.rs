use super::backend::KvBackend;
use crate::error::{Result, UrbanError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-memory storage backend for testing and throwaway sessions.
///
/// Every read yields to the scheduler once before returning, so concurrent
/// read-modify-write cycles interleave the way they would against real I/O.
#[derive(Default)]
pub struct MemBackend {
    values: Mutex<HashMap<String, String>>,
    writes: Mutex<HashMap<String, usize>>,
    simulate_write_error: AtomicBool,
    simulate_read_error: AtomicBool,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    /// Enable read error simulation for testing error handling.
    pub fn set_simulate_read_error(&self, simulate: bool) {
        self.simulate_read_error.store(simulate, Ordering::SeqCst);
    }

    /// Number of successful `set` calls made for `key`.
    pub fn write_count(&self, key: &str) -> usize {
        lock(&self.writes).get(key).copied().unwrap_or(0)
    }

    /// Current raw value for `key`, bypassing the async interface.
    pub fn raw(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).cloned()
    }

    /// Test helper to seed a raw value without counting it as a write.
    pub fn insert_raw(&self, key: &str, value: &str) {
        lock(&self.values).insert(key.to_string(), value.to_string());
    }
}

impl KvBackend for MemBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        tokio::task::yield_now().await;
        if self.simulate_read_error.load(Ordering::SeqCst) {
            return Err(UrbanError::Backend("Simulated read error".to_string()));
        }
        Ok(lock(&self.values).get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(UrbanError::Backend("Simulated write error".to_string()));
        }
        lock(&self.values).insert(key.to_string(), value.to_string());
        *lock(&self.writes).entry(key.to_string()).or_insert(0) += 1;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(UrbanError::Backend("Simulated write error".to_string()));
        }
        lock(&self.values).remove(key);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
