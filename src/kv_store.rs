//! Key-Value Store Adapter
//!
//! Advisory front for a [`KvBackend`]. Every operation reports success as a
//! `bool` or a miss as `None`; nothing here returns an error. Callers treat a
//! failed operation as a cache miss or a no-op and keep a non-cache data path.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::codecs::CompactJsonCodec;
use crate::traits::{CacheCodec, KvBackend};

/// Escape glob metacharacters so `raw` matches only itself inside a pattern
///
/// Uses the backslash escapes understood by Redis `SCAN MATCH`.
#[must_use]
pub fn escape_glob(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Result of the liveness probe
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub backend: &'static str,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Serializing adapter over a key-value backend
///
/// Values are written through the codec `C`. The default
/// [`CompactJsonCodec`] drops empty fields to keep payloads small.
pub struct KvStore<C: CacheCodec = CompactJsonCodec> {
    backend: Arc<dyn KvBackend>,
    codec: C,
}

impl KvStore<CompactJsonCodec> {
    /// Create an adapter using the compacting JSON codec
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self::with_codec(backend, CompactJsonCodec)
    }
}

impl<C: CacheCodec> KvStore<C> {
    /// Create an adapter with a custom codec
    pub fn with_codec(backend: Arc<dyn KvBackend>, codec: C) -> Self {
        debug!(backend = backend.name(), codec = codec.name(), "KV store adapter created");
        Self { backend, codec }
    }

    /// Name of the underlying backend
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Serialize and store `value` under `key` for `ttl`
    ///
    /// Returns `false` if serialization fails or the backend is unreachable.
    pub async fn set<T>(&self, key: &str, value: &T, ttl: Duration) -> bool
    where
        T: Serialize + ?Sized + Sync,
    {
        let bytes = match self.codec.serialize(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize cache value");
                return false;
            }
        };

        match self.backend.set_with_ttl(key, &bytes, ttl).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, backend = self.backend.name(), error = %e, "Cache set failed");
                false
            }
        }
    }

    /// Fetch and deserialize the value stored under `key`
    ///
    /// Misses, backend failures and undecodable payloads all yield `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.backend.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, backend = self.backend.name(), error = %e, "Cache get failed");
                return None;
            }
        };

        match self.codec.deserialize(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to deserialize cached value, treating as miss");
                None
            }
        }
    }

    /// Delete `key`; deleting an absent key succeeds
    pub async fn delete(&self, key: &str) -> bool {
        match self.backend.remove(key).await {
            Ok(_) => true,
            Err(e) => {
                warn!(key = %key, backend = self.backend.name(), error = %e, "Cache delete failed");
                false
            }
        }
    }

    /// Delete every key matching a glob pattern
    ///
    /// Keys are listed first and then removed in one bulk request, so a failure
    /// at either step leaves nothing half-deleted on our side.
    pub async fn delete_by_pattern(&self, pattern: &str) -> bool {
        let keys = match self.backend.scan_keys(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Pattern scan failed, nothing deleted");
                return false;
            }
        };

        if keys.is_empty() {
            return true;
        }

        match self.backend.remove_bulk(&keys).await {
            Ok(count) => {
                debug!(pattern = %pattern, count = count, "Deleted keys by pattern");
                true
            }
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "Bulk delete failed");
                false
            }
        }
    }

    /// Lightweight liveness probe; never mutates data
    pub async fn health_check(&self) -> HealthStatus {
        let started = Instant::now();
        let result = self.backend.ping().await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(()) => HealthStatus {
                healthy: true,
                backend: self.backend.name(),
                latency_ms,
                error: None,
            },
            Err(e) => HealthStatus {
                healthy: false,
                backend: self.backend.name(),
                latency_ms,
                error: Some(e.to_string()),
            },
        }
    }
}
