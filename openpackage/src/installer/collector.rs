//! Deferred index writes
//!
//! Strategies never touch the index file; they hand their package's record
//! to the collector, and the wave installer flushes everything queued in a
//! wave as one atomic index write under the wave barrier. Mutations are
//! keyed by package name, so queueing order within a wave doesn't matter.

use std::sync::Mutex;

use openpackage_schema::{IndexPackage, SortedMap};

/// The per-run queue of index mutations
#[derive(Debug, Default)]
pub struct IndexWriteCollector {
    mutations: Mutex<SortedMap<String, IndexPackage>>,
}

impl IndexWriteCollector {
    /// A fresh collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one package's record
    pub fn record(&self, package: impl Into<String>, record: IndexPackage) {
        self.mutations
            .lock()
            .unwrap()
            .insert(package.into(), record);
    }

    /// A snapshot of everything queued (for ownership contexts, which must
    /// see in-flight mutations as well as committed state)
    pub fn pending(&self) -> SortedMap<String, IndexPackage> {
        self.mutations.lock().unwrap().clone()
    }

    /// Take the queued mutations, leaving the collector empty
    pub fn take(&self) -> SortedMap<String, IndexPackage> {
        std::mem::take(&mut self.mutations.lock().unwrap())
    }

    /// Whether anything is queued
    pub fn is_empty(&self) -> bool {
        self.mutations.lock().unwrap().is_empty()
    }
}
