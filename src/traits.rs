//! Key-Value Backend Traits
//!
//! This module defines the trait abstractions that sit underneath the
//! [`KvStore`](crate::kv_store::KvStore) adapter.
//!
//! # Architecture
//!
//! - `CacheCodec`: Trait for pluggable serialization of cached payloads
//! - `KvBackend`: The generic expiring key-value protocol
//!   (GET / SET-with-expiry / DEL / SCAN-by-pattern / PING)
//!
//! Backends report failures through `anyhow::Result`. They are allowed to fail;
//! the adapter above them turns every failure into a miss or a no-op.
//!
//! # Example: Custom Backend
//!
//! ```rust,ignore
//! use workhub_cache::{KvBackend, async_trait};
//! use std::time::Duration;
//! use anyhow::Result;
//!
//! struct MyBackend;
//!
//! #[async_trait]
//! impl KvBackend for MyBackend {
//!     async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> { todo!() }
//!     async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> { todo!() }
//!     async fn remove(&self, key: &str) -> Result<bool> { todo!() }
//!     async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> { todo!() }
//!     async fn remove_bulk(&self, keys: &[String]) -> Result<usize> { todo!() }
//!     async fn ping(&self) -> Result<()> { todo!() }
//! }
//! ```

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::time::Duration;

/// Trait for cache value serialization/deserialization
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync + Debug` so a single codec can be shared
/// by every task that touches the store.
pub trait CacheCodec: Send + Sync + Debug {
    /// Serialize a value to bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented by this codec.
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>>;

    /// Deserialize bytes to a value
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid encoding of `T`.
    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;

    /// Name of the codec, used in log fields
    fn name(&self) -> &'static str;
}

/// Generic expiring key-value protocol
///
/// Any cache service exposing GET / SET-with-expiry / DEL / pattern listing / PING
/// can sit behind this trait.
///
/// # Error Semantics
///
/// - `get` returns `Ok(None)` on a miss and `Err` only when the store could not answer
/// - `remove` reports whether a key was actually deleted; removing a missing key is `Ok(false)`
/// - `remove_bulk` must delete all listed keys in one request so that a failure
///   leaves the store untouched
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Get the raw value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, expiring after `ttl`
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;

    /// Delete `key`
    async fn remove(&self, key: &str) -> Result<bool>;

    /// List keys matching a glob-style pattern (`*`, `?`)
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Delete several keys in a single request, returning how many existed
    async fn remove_bulk(&self, keys: &[String]) -> Result<usize>;

    /// Liveness probe that must not mutate data
    async fn ping(&self) -> Result<()>;

    /// Name of this backend, used in log fields and health reports
    fn name(&self) -> &'static str {
        "unknown"
    }
}
