//! Workhub Cache
//!
//! Caching and security-monitoring core of a project-management backend:
//! - **KV Store**: advisory key-value adapter over Redis or an in-process map
//! - **Cache Strategy**: category-driven TTLs with `high`/`medium`/`low` priority tiers
//! - **Domain Caches**: key naming and bulk invalidation for boards and users
//! - **Cache-Aside**: reads that always answer, from cache, source, or an empty default
//! - **Monitoring**: threshold rules over security events with alert lifecycle
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use workhub_cache::{CoreConfig, WorkhubContext};
//! use workhub_cache::monitoring::SecurityEvent;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     workhub_cache::telemetry::init_tracing("workhub_cache=info");
//!
//!     let ctx = WorkhubContext::from_config(&CoreConfig::from_env())?;
//!     let cleanup = ctx.start_background_tasks();
//!     ctx.kanban.set_columns("P1", &[]).await;
//!
//!     ctx.monitoring
//!         .record_event(SecurityEvent::new("failed_login").with_user("dev@example.com"))
//!         .await;
//!
//!     let stats = ctx.strategy.stats();
//!     tracing::info!("Hit rate: {:.2}%", stats.hit_rate);
//!
//!     ctx.monitoring.shutdown();
//!     cleanup.await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! CacheAsideReader → KanbanCache / UserCache → CacheStrategy → KvStore → KvBackend
//!                                                 (category → ttl, "{priority}:{key}")
//! ```

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub mod backends;
pub mod cache_aside;
pub mod cache_strategy;
pub mod clock;
pub mod codecs;
pub mod config;
pub mod detached;
pub mod domain;
pub mod error;
pub mod kv_store;
pub mod monitoring;
pub mod telemetry;
pub mod traits;

pub use backends::MemoryBackend;
#[cfg(feature = "redis")]
pub use backends::RedisBackend;
pub use cache_aside::{CacheAsideReader, FetchResponse, ProjectDataSource, ReadOutcome, ReadPath};
pub use cache_strategy::{CachePriority, CacheStrategy, CacheStrategyStats, CategoryPolicy};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CoreConfig, KvStoreConfig, MonitoringConfig};
pub use domain::{InvalidationReport, KanbanCache, RelatedChange, UserCache, invalidate_related_caches};
pub use error::{ActionError, FetchError, MonitoringError};
pub use kv_store::{HealthStatus, KvStore};
pub use monitoring::MonitoringEngine;
pub use traits::{CacheCodec, KvBackend};

// Re-export async_trait for implementors of the collaborator traits
pub use async_trait::async_trait;

/// Wired-up cache stack plus monitoring engine
///
/// Cloning is cheap; every component is shared.
#[derive(Clone)]
pub struct WorkhubContext {
    pub store: Arc<KvStore>,
    pub strategy: Arc<CacheStrategy>,
    pub kanban: KanbanCache,
    pub users: UserCache,
    pub monitoring: Arc<MonitoringEngine>,
    lookup_timeout: Duration,
}

impl WorkhubContext {
    /// Build the context described by `config`
    ///
    /// A configured `redis_url` selects the Redis backend; otherwise the
    /// in-process backend is used. No connection is made here.
    ///
    /// # Errors
    ///
    /// Returns an error if the Redis URL cannot be parsed.
    pub fn from_config(config: &CoreConfig) -> Result<Self> {
        let backend = select_backend(&config.kv)?;
        let monitoring = MonitoringEngine::new(config.monitoring.clone());
        Ok(Self::with_backend(backend, monitoring, config.kv.lookup_timeout()))
    }

    /// Build the context from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if `REDIS_URL` cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_config(&CoreConfig::from_env())
    }

    /// Build the context over an explicit backend and engine
    pub fn with_backend(backend: Arc<dyn KvBackend>, monitoring: MonitoringEngine, lookup_timeout: Duration) -> Self {
        let store = Arc::new(KvStore::new(backend));
        let strategy = Arc::new(CacheStrategy::new(Arc::clone(&store)));

        info!(backend = store.backend_name(), "Workhub cache context initialized");

        Self {
            store,
            kanban: KanbanCache::new(Arc::clone(&strategy)),
            users: UserCache::new(Arc::clone(&strategy)),
            strategy,
            monitoring: Arc::new(monitoring),
            lookup_timeout,
        }
    }

    /// Start the periodic monitoring cleanup that keeps counters and alerts bounded
    ///
    /// Must be called inside a Tokio runtime. The task ends on
    /// `monitoring.shutdown()` or once the engine is dropped.
    pub fn start_background_tasks(&self) -> JoinHandle<()> {
        self.monitoring.spawn_cleanup_task()
    }

    /// Cache-aside reader over this context's caches
    pub fn reader(&self, source: Arc<dyn ProjectDataSource>) -> CacheAsideReader {
        CacheAsideReader::new(self.kanban.clone(), self.users.clone(), source, self.lookup_timeout)
    }

    /// See [`invalidate_related_caches`]
    pub async fn invalidate_related(&self, change: RelatedChange<'_>) -> InvalidationReport {
        invalidate_related_caches(&self.kanban, &self.users, change).await
    }

    /// Probe the key-value backend
    pub async fn health_check(&self) -> HealthStatus {
        let status = self.store.health_check().await;
        if status.healthy {
            info!(backend = status.backend, latency_ms = status.latency_ms, "Cache health check passed");
        } else {
            warn!(backend = status.backend, error = ?status.error, "Cache health check failed");
        }
        status
    }
}

fn select_backend(config: &KvStoreConfig) -> Result<Arc<dyn KvBackend>> {
    match config.redis_url.as_deref() {
        #[cfg(feature = "redis")]
        Some(url) => Ok(Arc::new(RedisBackend::with_url(url, config.connect_timeout())?)),
        #[cfg(not(feature = "redis"))]
        Some(_) => {
            warn!("REDIS_URL is set but the `redis` feature is disabled, using in-memory backend");
            Ok(Arc::new(MemoryBackend::new()))
        }
        None => Ok(Arc::new(MemoryBackend::new())),
    }
}
