//! The content-root cache
//!
//! Memoizes git resolution within a run, keyed by `(url, ref, subpath)`.
//! Failures are cached too: re-querying a key that already failed must not
//! reattempt the transport. Non-git sources never come through here.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::debug;

use crate::fetch::{GitCheckout, GitLoader};

/// The cache key: one git target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GitKey {
    /// normalized repository url
    pub url: String,
    /// the requested ref, if pinned
    pub reference: Option<String>,
    /// in-repo subdirectory
    pub subpath: Option<String>,
}

/// A per-run cache of git content roots
///
/// Values are write-once per key: the wave resolver groups the frontier by
/// id before fetching, so one key is never loaded twice concurrently, and a
/// completed entry (success or failure) is immutable after insert.
#[derive(Default)]
pub struct ContentRootCache {
    entries: Mutex<HashMap<GitKey, Result<GitCheckout, String>>>,
}

impl ContentRootCache {
    /// A fresh cache for one run
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a git target, consulting the cache first
    pub async fn resolve(
        &self,
        key: GitKey,
        loader: &dyn GitLoader,
    ) -> Result<GitCheckout, String> {
        if let Some(cached) = self.entries.lock().await.get(&key) {
            debug!("content-root cache hit for {}", key.url);
            return cached.clone();
        }
        let result = loader
            .load(&key.url, key.reference.as_deref(), key.subpath.as_deref())
            .await;
        self.entries.lock().await.insert(key, result.clone());
        result
    }

    /// How many keys (hits and misses both) this run has resolved
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether nothing has been resolved yet
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
