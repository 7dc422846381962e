//! Per-chain client cache
//!
//! RPC clients are built lazily the first time a chain is touched and reused
//! afterwards. Backed by DashMap so concurrent chain scans never block each
//! other.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Thread-safe `chain_id -> Arc<T>` cache
pub struct ClientCache<T> {
    store: DashMap<u64, Arc<T>>,
}

impl<T> Default for ClientCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ClientCache<T> {
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    /// Cached client for `chain_id`, if one was built already
    pub fn get(&self, chain_id: u64) -> Option<Arc<T>> {
        self.store.get(&chain_id).map(|entry| entry.value().clone())
    }

    /// Return the cached client or build, store and return a new one
    ///
    /// A failed build leaves the cache untouched, so the next call retries.
    pub fn get_or_try_init<E, F>(&self, chain_id: u64, build: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(client) = self.get(chain_id) {
            return Ok(client);
        }

        let client = Arc::new(build()?);
        // Another task may have raced us; keep whichever landed first.
        let entry = self.store.entry(chain_id).or_insert(client);
        debug!("💾 CLIENT CACHED: chain {}", chain_id);
        Ok(entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
