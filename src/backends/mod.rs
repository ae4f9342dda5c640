//! Key-Value Backend Implementations
//!
//! # Available Backends
//!
//! - **Redis** - Remote cache service, shared across instances (feature: `redis`, default)
//! - **Memory** - In-process `DashMap` store with clock-driven TTL
//!
//! # Usage
//!
//! ```rust,no_run
//! use workhub_cache::backends::MemoryBackend;
//! use workhub_cache::KvStore;
//! use std::sync::Arc;
//!
//! let store = KvStore::new(Arc::new(MemoryBackend::new()));
//! ```

pub mod memory_backend;
#[cfg(feature = "redis")]
pub mod redis_backend;

pub use memory_backend::MemoryBackend;
#[cfg(feature = "redis")]
pub use redis_backend::RedisBackend;
