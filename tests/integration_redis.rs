//! Integration tests against a real Redis instance
//!
//! Ignored by default. Run with a reachable `REDIS_URL`:
//!
//! ```text
//! REDIS_URL=redis://127.0.0.1:6379 cargo test --test integration_redis -- --ignored
//! ```

#![cfg(feature = "redis")]

mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use workhub_cache::{CoreConfig, KvStoreConfig, RedisBackend, WorkhubContext};

fn redis_context() -> WorkhubContext {
    let config = CoreConfig {
        kv: KvStoreConfig {
            redis_url: Some(redis_url()),
            ..KvStoreConfig::default()
        },
        ..CoreConfig::default()
    };
    WorkhubContext::from_config(&config).expect("valid Redis URL")
}

#[tokio::test]
#[ignore = "requires a running Redis"]
async fn test_redis_roundtrip_and_pattern_invalidation() {
    let ctx = redis_context();
    assert!(ctx.health_check().await.healthy);

    let project = unique("P");
    for team in ["T1", "T2"] {
        assert!(ctx.kanban.set_board(&project, team, &[test_data::column(team, 1)]).await);
    }
    assert!(ctx.kanban.get_board(&project, "T1").await.is_some());

    let report = ctx.kanban.invalidate_project(&project).await;

    assert!(report.is_complete());
    assert!(ctx.kanban.get_board(&project, "T1").await.is_none());
    assert!(ctx.kanban.get_board(&project, "T2").await.is_none());
}

#[tokio::test]
#[ignore = "requires a running Redis"]
async fn test_redis_cache_aside_miss_then_hit() {
    let ctx = redis_context();
    let source = FakeDataSource::new();
    *source.board.lock() = vec![test_data::column("todo", 2)];
    let reader = ctx.reader(source.clone());
    let project = unique("P");

    assert_eq!(reader.board(&project, "T1").await.path, workhub_cache::ReadPath::Miss);
    settle().await;
    assert_eq!(reader.board(&project, "T1").await.path, workhub_cache::ReadPath::Hit);

    ctx.kanban.delete_board(&project, "T1").await;
}

/// An unreachable server degrades to misses instead of erroring
#[tokio::test]
async fn test_unreachable_redis_degrades_to_miss() {
    let backend = RedisBackend::with_url("redis://127.0.0.1:1", Duration::from_millis(200)).unwrap();
    let ctx = context_with_backend(Arc::new(backend), Duration::from_secs(1));

    assert!(!ctx.kanban.set_columns("P1", &[test_data::column("a", 0)]).await);
    assert!(ctx.kanban.get_columns("P1").await.is_none());
    assert!(!ctx.health_check().await.healthy);
}
