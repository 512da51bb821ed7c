//! Shared state for the HTTP lookups: an in-memory selector cache and a
//! consecutive-failure tracker that marks a service unavailable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use tracing::{debug, warn};

/// Acquire mutex lock, recovering from poisoned state if necessary.
macro_rules! lock_or_recover {
    ($mutex:expr) => {
        match $mutex.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    };
}

#[derive(Debug)]
pub struct SelectorCache {
    entries: Mutex<HashMap<String, Vec<String>>>,
    capacity: usize,
}

impl SelectorCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    pub fn get(&self, selector: &str) -> Option<Vec<String>> {
        lock_or_recover!(self.entries).get(selector).cloned()
    }

    /// New selectors are dropped once the cache is full.
    pub fn insert(&self, selector: &str, signatures: Vec<String>) {
        let mut entries = lock_or_recover!(self.entries);
        if entries.len() >= self.capacity && !entries.contains_key(selector) {
            debug!(%selector, capacity = self.capacity, "selector cache full");
            return;
        }
        entries.insert(selector.to_owned(), signatures);
    }

    pub fn contains(&self, selector: &str) -> bool {
        lock_or_recover!(self.entries).contains_key(selector)
    }

    pub fn len(&self) -> usize {
        lock_or_recover!(self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Counts consecutive connectivity failures (timeouts, connection errors,
/// 5xx) and trips after `limit` of them.
#[derive(Debug)]
pub struct FailureTracker {
    service: &'static str,
    failed: AtomicUsize,
    unavailable: AtomicBool,
    limit: usize,
}

impl FailureTracker {
    pub fn new(service: &'static str, limit: usize) -> Self {
        Self {
            service,
            failed: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
            limit: limit.max(1),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.unavailable.load(Ordering::Relaxed)
    }

    pub fn failed_count(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn on_success(&self) {
        self.failed.store(0, Ordering::SeqCst);
    }

    pub fn on_failure(&self, reason: &str) {
        let count = self.failed.fetch_add(1, Ordering::SeqCst) + 1;
        warn!(service = self.service, count, limit = self.limit, %reason, "request failed");
        if count >= self.limit {
            warn!(service = self.service, "marking service unavailable");
            self.unavailable.store(true, Ordering::Relaxed);
        }
    }

    pub fn reset(&self) {
        self.unavailable.store(false, Ordering::Relaxed);
        self.failed.store(0, Ordering::SeqCst);
    }
}

/// Whether a transport error says something about the service's health.
pub(crate) fn is_connectivity_error(err: &reqwest::Error) -> bool {
    err.is_timeout()
        || err.is_connect()
        || err.is_request()
        || err.status().is_some_and(|s| s.is_server_error())
}
