//! In-process cache of finished game reports.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::pipeline::{GameOptions, GameReport};

/// Default number of reports kept.
pub const DEFAULT_CAPACITY: usize = 100;

/// SHA-256 over normalised notation plus the options that change the result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Whitespace differences (line endings, runs of spaces, surrounding
    /// blanks) do not change the key. `cache_enabled` is not part of it.
    pub fn new(notation: &str, options: &GameOptions) -> Self {
        let normalized = notation.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut hasher = Sha256::new();
        hasher.update(normalized.as_bytes());
        hasher.update(b"\n");
        hasher.update(format!("depth={};movetime={}", options.depth, options.time_budget_ms).as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub report: Arc<GameReport>,
    pub inserted_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<CacheKey, CacheEntry>,
    /// Keys from oldest to newest insertion.
    order: VecDeque<CacheKey>,
}

/// Bounded report cache, evicting the oldest insertion first.
///
/// Lookups do not refresh an entry; only `put` does.
#[derive(Debug)]
pub struct ResultCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ResultCache {
    /// A capacity of zero stores nothing.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(CacheInner::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<GameReport>> {
        self.lock().entries.get(key).map(|e| Arc::clone(&e.report))
    }

    pub fn entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.lock().entries.get(key).cloned()
    }

    /// Stores `report` as the newest entry, evicting the oldest if full.
    pub fn put(&self, key: CacheKey, report: Arc<GameReport>) {
        if self.capacity == 0 {
            return;
        }
        let mut inner = self.lock();

        if inner.entries.contains_key(&key) {
            inner.order.retain(|k| k != &key);
        }
        while inner.order.len() >= self.capacity {
            match inner.order.pop_front() {
                Some(oldest) => {
                    tracing::debug!(key = %oldest, "Evicting cached report");
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }

        inner.order.push_back(key.clone());
        inner.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                report,
                inserted_at: Utc::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
