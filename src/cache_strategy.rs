//! Cache Strategy - Category policies and priority-tier keys
//!
//! Maps a logical category (`kanban`, `user`, `project`, `analytics`, ...) to a
//! TTL and a priority tier, and prefixes physical keys with the tier:
//!
//! ```text
//! set("kanban:board:P1:T1", v, "kanban")  →  SET high:kanban:board:P1:T1 v EX 300
//! ```
//!
//! The priority tier currently only shapes key names. No eviction acts on it;
//! an eviction policy would be a separate component consulted by the backend
//! under memory pressure.

use futures_util::future::join_all;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::kv_store::KvStore;

/// Well-known category names
pub mod categories {
    pub const KANBAN: &str = "kanban";
    pub const USER: &str = "user";
    pub const PROJECT: &str = "project";
    pub const ANALYTICS: &str = "analytics";
}

/// Priority tier of a cached entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CachePriority {
    High,
    Medium,
    Low,
}

impl CachePriority {
    /// Every tier, in the order reads probe them
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for CachePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TTL and priority for one category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPolicy {
    pub ttl_secs: u64,
    pub priority: CachePriority,
}

impl CategoryPolicy {
    #[must_use]
    pub const fn new(ttl_secs: u64, priority: CachePriority) -> Self {
        Self { ttl_secs, priority }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Policy used for categories missing from the table
pub const DEFAULT_POLICY: CategoryPolicy = CategoryPolicy::new(300, CachePriority::Medium);

fn default_categories() -> HashMap<String, CategoryPolicy> {
    HashMap::from([
        (categories::KANBAN.to_string(), CategoryPolicy::new(300, CachePriority::High)),
        (categories::USER.to_string(), CategoryPolicy::new(1800, CachePriority::High)),
        (categories::PROJECT.to_string(), CategoryPolicy::new(600, CachePriority::Medium)),
        (categories::ANALYTICS.to_string(), CategoryPolicy::new(60, CachePriority::Low)),
    ])
}

/// Cache strategy over a [`KvStore`]
pub struct CacheStrategy {
    store: Arc<KvStore>,
    categories: RwLock<HashMap<String, CategoryPolicy>>,
    hits: AtomicU64,
    misses: AtomicU64,
    sets: AtomicU64,
    deletes: AtomicU64,
}

impl CacheStrategy {
    /// Create a strategy seeded with the built-in category table
    pub fn new(store: Arc<KvStore>) -> Self {
        info!(backend = store.backend_name(), "Initializing Cache Strategy");
        Self {
            store,
            categories: RwLock::new(default_categories()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            sets: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
        }
    }

    /// The underlying store adapter
    pub fn store(&self) -> &Arc<KvStore> {
        &self.store
    }

    /// Policy for `category`, falling back to [`DEFAULT_POLICY`]
    pub fn policy_for(&self, category: &str) -> CategoryPolicy {
        self.categories
            .read()
            .get(category)
            .copied()
            .unwrap_or(DEFAULT_POLICY)
    }

    /// Replace (or add) the policy of one category
    pub fn update_category(&self, category: &str, policy: CategoryPolicy) {
        info!(category = %category, ttl_secs = policy.ttl_secs, priority = %policy.priority, "Updated cache category policy");
        self.categories.write().insert(category.to_string(), policy);
    }

    /// Snapshot of the category table
    pub fn categories(&self) -> HashMap<String, CategoryPolicy> {
        self.categories.read().clone()
    }

    /// Physical key for a logical key in a tier
    #[must_use]
    pub fn physical_key(priority: CachePriority, key: &str) -> String {
        format!("{priority}:{key}")
    }

    /// Read a logical key, whichever tier wrote it
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        for priority in CachePriority::ALL {
            if let Some(value) = self.store.get(&Self::physical_key(priority, key)).await {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, priority = %priority, "Cache hit");
                return Some(value);
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key = %key, "Cache miss");
        None
    }

    /// Store `value` under the tier and TTL of `category`
    ///
    /// Copies of the key under the other two tiers are removed, so a write made
    /// before the category changed tier cannot shadow this one on read.
    /// Returns `false` if the write failed or a stale copy could not be removed.
    pub async fn set<T>(&self, key: &str, value: &T, category: &str) -> bool
    where
        T: Serialize + ?Sized + Sync,
    {
        let policy = self.policy_for(category);
        let physical = Self::physical_key(policy.priority, key);
        let stored = self.store.set(&physical, value, policy.ttl()).await;
        if !stored {
            return false;
        }
        self.sets.fetch_add(1, Ordering::Relaxed);

        let cleared = join_all(
            CachePriority::ALL
                .iter()
                .filter(|priority| **priority != policy.priority)
                .map(|priority| {
                    let stale = Self::physical_key(*priority, key);
                    async move { self.store.delete(&stale).await }
                }),
        )
        .await;

        let ok = cleared.iter().all(|deleted| *deleted);
        if !ok {
            warn!(key = %key, priority = %policy.priority, "Stored key but could not clear it from other tiers");
        }
        ok
    }

    /// Delete a logical key under every tier
    ///
    /// The caller does not know which category last wrote the key, so all
    /// three prefixes are attempted. Returns `true` only if every delete succeeded.
    pub async fn delete(&self, key: &str) -> bool {
        let results = join_all(
            CachePriority::ALL
                .iter()
                .map(|priority| {
                    let physical = Self::physical_key(*priority, key);
                    async move { self.store.delete(&physical).await }
                }),
        )
        .await;

        self.deletes.fetch_add(1, Ordering::Relaxed);
        let ok = results.iter().all(|deleted| *deleted);
        if !ok {
            warn!(key = %key, "Cache delete failed under at least one priority tier");
        }
        ok
    }

    /// Delete every logical key matching `pattern` under every tier
    pub async fn delete_by_pattern(&self, pattern: &str) -> bool {
        let results = join_all(
            CachePriority::ALL
                .iter()
                .map(|priority| {
                    let physical = Self::physical_key(*priority, pattern);
                    async move { self.store.delete_by_pattern(&physical).await }
                }),
        )
        .await;

        self.deletes.fetch_add(1, Ordering::Relaxed);
        results.iter().all(|deleted| *deleted)
    }

    /// Get statistics
    pub fn stats(&self) -> CacheStrategyStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;

        #[allow(clippy::cast_precision_loss)]
        let hit_rate = if lookups > 0 {
            (hits as f64 / lookups as f64) * 100.0
        } else {
            0.0
        };

        CacheStrategyStats {
            hits,
            misses,
            sets: self.sets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            hit_rate,
        }
    }
}

/// Cache Strategy statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStrategyStats {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub deletes: u64,
    pub hit_rate: f64,
}
