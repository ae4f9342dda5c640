//! Redis Backend - Remote cache service
//!
//! The connection is established lazily on first use, bounded by a connect
//! timeout, and shared by every later call. A failed command drops the shared
//! handle so the next call builds a fresh connection.

use anyhow::{Context, Result, anyhow};
use redis::Client;
use redis::aio::ConnectionManager;
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Redis key-value backend with a lazily created, self-healing `ConnectionManager`
pub struct RedisBackend {
    client: Client,
    redis_url: String,
    connect_timeout: Duration,
    /// `None` until first use, and again after a failed command
    connection: Mutex<Option<ConnectionManager>>,
}

impl RedisBackend {
    /// Create a backend for `REDIS_URL` (default `redis://127.0.0.1:6379`)
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn new() -> Result<Self> {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        Self::with_url(&redis_url, Duration::from_secs(10))
    }

    /// Create a backend for a custom URL
    ///
    /// No network traffic happens here; the first command connects.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed.
    pub fn with_url(redis_url: &str, connect_timeout: Duration) -> Result<Self> {
        let client = Client::open(redis_url)
            .with_context(|| format!("Failed to create Redis client with URL: {redis_url}"))?;

        info!(redis_url = %redis_url, connect_timeout_secs = connect_timeout.as_secs(), "Redis KV backend configured (lazy connection)");

        Ok(Self {
            client,
            redis_url: redis_url.to_string(),
            connect_timeout,
            connection: Mutex::new(None),
        })
    }

    /// Whether a live handle is currently held
    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        let mut slot = self.connection.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let conn = tokio::time::timeout(
            self.connect_timeout,
            ConnectionManager::new(self.client.clone()),
        )
        .await
        .map_err(|_| {
            anyhow!(
                "Timed out after {}s connecting to Redis at {}",
                self.connect_timeout.as_secs(),
                self.redis_url
            )
        })?
        .context("Failed to establish Redis connection manager")?;

        info!(redis_url = %self.redis_url, "Redis connection established");
        *slot = Some(conn.clone());
        Ok(conn)
    }

    async fn reset(&self) {
        let mut slot = self.connection.lock().await;
        if slot.take().is_some() {
            warn!(redis_url = %self.redis_url, "Dropped Redis connection after command failure");
        }
    }

    /// Run one command, dropping the shared handle if it fails
    async fn run<T, F, Fut>(&self, op: &'static str, command: F) -> Result<T>
    where
        F: FnOnce(ConnectionManager) -> Fut + Send,
        Fut: Future<Output = redis::RedisResult<T>> + Send,
    {
        let conn = match self.connection().await {
            Ok(conn) => conn,
            Err(e) => {
                self.reset().await;
                return Err(e);
            }
        };

        match command(conn).await {
            Ok(value) => Ok(value),
            Err(e) => {
                self.reset().await;
                Err(anyhow::Error::new(e).context(format!("Redis {op} failed")))
            }
        }
    }
}

// ===== Trait Implementations =====

use crate::traits::KvBackend;
use async_trait::async_trait;

#[async_trait]
impl KvBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.run("GET", |mut conn| async move {
            let value: Option<Vec<u8>> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
            Ok(value)
        })
        .await
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        // Redis rejects EX 0
        let ttl_secs = ttl.as_secs().max(1);
        self.run("SET", |mut conn| async move {
            let (): () = redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl_secs)
                .query_async(&mut conn)
                .await?;
            Ok(())
        })
        .await?;
        debug!(key = %key, ttl_secs = %ttl_secs, "[Redis] Cached key with TTL");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        self.run("DEL", |mut conn| async move {
            let removed: usize = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
            Ok(removed > 0)
        })
        .await
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let keys = self
            .run("SCAN", |mut conn| async move {
                let mut keys = Vec::new();
                let mut cursor: u64 = 0;

                loop {
                    // SCAN cursor MATCH pattern COUNT 100
                    let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(100)
                        .query_async(&mut conn)
                        .await?;

                    cursor = next;
                    keys.extend(batch);

                    if cursor == 0 {
                        break;
                    }
                }
                Ok(keys)
            })
            .await?;

        debug!(pattern = %pattern, count = keys.len(), "[Redis] Scanned keys matching pattern");
        Ok(keys)
    }

    async fn remove_bulk(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }

        let count = self
            .run("DEL", |mut conn| async move {
                let count: usize = redis::cmd("DEL").arg(keys).query_async(&mut conn).await?;
                Ok(count)
            })
            .await?;
        debug!(count = count, "[Redis] Removed keys in bulk");
        Ok(count)
    }

    async fn ping(&self) -> Result<()> {
        self.run("PING", |mut conn| async move {
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }

    fn name(&self) -> &'static str {
        "Redis"
    }
}
