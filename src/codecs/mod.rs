//! Cache Codec Implementations
//!
//! Built-in implementations of the [`CacheCodec`](crate::traits::CacheCodec) trait.
//! The store uses [`CompactJsonCodec`] unless told otherwise.

mod json;
pub use json::{CompactJsonCodec, JsonCodec};
