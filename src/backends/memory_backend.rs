//! Memory Backend - In-process `DashMap` store
//!
//! A lightweight `KvBackend` for single-instance deployments and tests.
//! Expiry is evaluated against an injected [`Clock`], so TTL behaviour can be
//! exercised without sleeping.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use regex::Regex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};

/// Stored value with its expiry instant
#[derive(Debug, Clone)]
struct StoredEntry {
    value: Vec<u8>,
    expires_at: DateTime<Utc>,
}

impl StoredEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Concurrent in-memory key-value store
///
/// **Features**:
/// - Lock-free concurrent reads/writes
/// - Per-key TTL against an injectable clock
/// - Glob pattern listing (`*`, `?`, `[...]`, backslash escapes)
///
/// **Limitations**:
/// - No size limits; expired entries are dropped lazily on read or by
///   [`MemoryBackend::cleanup_expired`]
///
/// `set_available(false)` makes every operation fail, which is how tests
/// simulate an unreachable cache service.
pub struct MemoryBackend {
    map: Arc<DashMap<String, StoredEntry>>,
    clock: Arc<dyn Clock>,
    available: AtomicBool,
}

impl MemoryBackend {
    /// Create new memory backend on wall-clock time
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create new memory backend reading time from `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        info!("Initializing Memory KV backend (DashMap)");

        Self {
            map: Arc::new(DashMap::new()),
            clock,
            available: AtomicBool::new(true),
        }
    }

    /// Toggle simulated availability
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            anyhow::bail!("memory backend is marked unavailable")
        }
    }

    /// Remove expired entries, returning how many were dropped
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.map.retain(|_, entry| {
            if entry.is_expired(now) {
                removed += 1;
                false
            } else {
                true
            }
        });
        if removed > 0 {
            debug!(count = removed, "[Memory] Cleaned up expired entries");
        }
        removed
    }

    /// Number of stored entries, expired ones included
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Translate a Redis-style glob into an anchored regex
    ///
    /// Supports `*`, `?`, `[...]` / `[^...]` classes and backslash escapes.
    /// An unclosed `[` matches literally.
    fn glob_to_regex(pattern: &str) -> Result<Regex> {
        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push('^');
        let mut chars = pattern.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                '\\' => push_literal(&mut expr, chars.next().unwrap_or('\\')),
                '[' => {
                    let mut class = Vec::new();
                    let mut closed = false;
                    while let Some(inner) = chars.next() {
                        match inner {
                            ']' if !class.is_empty() => {
                                closed = true;
                                break;
                            }
                            '\\' => class.push((true, chars.next().unwrap_or('\\'))),
                            other => class.push((false, other)),
                        }
                    }
                    if closed {
                        push_class(&mut expr, &class);
                    } else {
                        push_literal(&mut expr, '[');
                        for (_, inner) in class {
                            push_literal(&mut expr, inner);
                        }
                    }
                }
                other => push_literal(&mut expr, other),
            }
        }
        expr.push('$');
        Regex::new(&expr).with_context(|| format!("Invalid key pattern: {pattern}"))
    }
}

fn push_literal(expr: &mut String, ch: char) {
    expr.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4])));
}

/// Emit a regex class; `(escaped, char)` pairs keep `^` and `-` literal when escaped
fn push_class(expr: &mut String, class: &[(bool, char)]) {
    expr.push('[');
    for (i, &(escaped, ch)) in class.iter().enumerate() {
        match ch {
            '^' if i == 0 && !escaped => expr.push('^'),
            '-' if !escaped && i > 0 && i + 1 < class.len() => expr.push('-'),
            other => push_literal(expr, other),
        }
    }
    expr.push(']');
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

// ===== Trait Implementations =====

use crate::traits::KvBackend;
use async_trait::async_trait;

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.ensure_available()?;
        let now = self.clock.now();

        let Some(entry) = self.map.get(key) else {
            return Ok(None);
        };
        if entry.is_expired(now) {
            drop(entry);
            self.map.remove(key);
            return Ok(None);
        }
        Ok(Some(entry.value.clone()))
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.ensure_available()?;
        let ttl = chrono::Duration::from_std(ttl).context("TTL out of range")?;
        let entry = StoredEntry {
            value: value.to_vec(),
            expires_at: self.clock.now() + ttl,
        };
        self.map.insert(key.to_string(), entry);
        debug!(key = %key, ttl_secs = %ttl.num_seconds(), "[Memory] Stored key with TTL");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        self.ensure_available()?;
        Ok(self.map.remove(key).is_some())
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.ensure_available()?;
        let matcher = Self::glob_to_regex(pattern)?;
        let now = self.clock.now();

        let keys: Vec<String> = self
            .map
            .iter()
            .filter(|entry| !entry.value().is_expired(now) && matcher.is_match(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        debug!(pattern = %pattern, count = keys.len(), "[Memory] Scanned keys matching pattern");
        Ok(keys)
    }

    async fn remove_bulk(&self, keys: &[String]) -> Result<usize> {
        self.ensure_available()?;
        let removed = keys.iter().filter(|key| self.map.remove(key.as_str()).is_some()).count();
        debug!(count = removed, "[Memory] Removed keys in bulk");
        Ok(removed)
    }

    async fn ping(&self) -> Result<()> {
        self.ensure_available()
    }

    fn name(&self) -> &'static str {
        "Memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn test_entry_expires_with_clock() {
        let clock = Arc::new(ManualClock::starting_now());
        let backend = MemoryBackend::with_clock(clock.clone());

        backend
            .set_with_ttl("k", b"v", Duration::from_secs(300))
            .await
            .unwrap();
        assert_eq!(backend.get("k").await.unwrap(), Some(b"v".to_vec()));

        clock.advance(chrono::Duration::seconds(301));
        assert_eq!(backend.get("k").await.unwrap(), None);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_scan_matches_glob() {
        let backend = MemoryBackend::new();
        for key in ["high:kanban:board:P1:T1", "high:kanban:board:P1:T2", "high:kanban:board:P10:T1"] {
            backend.set_with_ttl(key, b"x", Duration::from_secs(60)).await.unwrap();
        }

        let mut keys = backend.scan_keys("high:kanban:board:P1:*").await.unwrap();
        keys.sort();

        assert_eq!(keys, vec!["high:kanban:board:P1:T1", "high:kanban:board:P1:T2"]);
    }

    #[tokio::test]
    async fn test_scan_honours_classes_and_escapes() {
        let backend = MemoryBackend::new();
        for key in ["board:P1", "board:P2", "board:P3", "board:[P]", "board:P*"] {
            backend.set_with_ttl(key, b"x", Duration::from_secs(60)).await.unwrap();
        }

        let mut keys = backend.scan_keys("board:P[12]").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["board:P1", "board:P2"]);

        let mut keys = backend.scan_keys("board:P[^12]").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["board:P*", "board:P3"]);
        assert_eq!(backend.scan_keys("board:\\[P\\]").await.unwrap(), vec!["board:[P]"]);
        assert_eq!(backend.scan_keys("board:P\\*").await.unwrap(), vec!["board:P*"]);
    }

    #[tokio::test]
    async fn test_unavailable_backend_errors() {
        let backend = MemoryBackend::new();
        backend.set_available(false);

        assert!(backend.get("k").await.is_err());
        assert!(backend.ping().await.is_err());

        backend.set_available(true);
        assert!(backend.ping().await.is_ok());
    }
}
