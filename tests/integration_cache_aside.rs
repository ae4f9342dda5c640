//! Integration tests for cache-aside reads
//!
//! Covers the three read paths (HIT, MISS, FALLBACK), the detached write after
//! a miss, and the freshness check on cached user projects.

mod common;

use common::*;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use workhub_cache::domain::DashboardSummary;
use workhub_cache::{MemoryBackend, ReadPath};

#[tokio::test]
async fn test_miss_then_hit() {
    let TestContext { ctx, .. } = memory_context();
    let source = FakeDataSource::new();
    *source.board.lock() = vec![test_data::column("todo", 3)];
    let reader = ctx.reader(source.clone());

    let first = reader.board("P1", "T1").await;
    assert_eq!(first.path, ReadPath::Miss);
    assert_eq!(first.value.len(), 1);

    settle().await;

    let second = reader.board("P1", "T1").await;
    assert_eq!(second.path, ReadPath::Hit);
    assert_eq!(second.value, first.value);
    assert_eq!(source.board_calls.load(Ordering::SeqCst), 1);
}

/// A fetch failure after a miss retries once and then answers empty
#[tokio::test]
async fn test_fetch_failure_falls_back_to_empty() {
    let TestContext { ctx, .. } = memory_context();
    let source = FakeDataSource::new();
    source.set_failing(true);
    let reader = ctx.reader(source.clone());

    let outcome = reader.dashboard("dev@example.com").await;

    assert_eq!(outcome.path, ReadPath::Fallback);
    assert_eq!(outcome.value, DashboardSummary::default());
    assert_eq!(source.dashboard_calls.load(Ordering::SeqCst), 2);

    settle().await;
    assert!(ctx.users.get_dashboard("dev@example.com").await.is_none());
}

/// With the cache service down every read still answers from the source
#[tokio::test]
async fn test_unavailable_cache_reads_from_source() {
    let TestContext { ctx, backend, .. } = memory_context();
    backend.set_available(false);
    let source = FakeDataSource::new();
    *source.board.lock() = vec![test_data::column("todo", 1)];
    let reader = ctx.reader(source.clone());

    for _ in 0..3 {
        let outcome = reader.board("P1", "T1").await;
        assert_eq!(outcome.value.len(), 1);
        assert_ne!(outcome.path, ReadPath::Hit);
    }
    assert_eq!(source.board_calls.load(Ordering::SeqCst), 3);
}

/// A lookup slower than the timeout is treated as a lookup error
#[tokio::test]
async fn test_slow_lookup_takes_fallback_path() {
    let backend = Arc::new(StallingBackend {
        inner: MemoryBackend::new(),
        delay: Duration::from_millis(500),
    });
    let ctx = context_with_backend(backend, Duration::from_millis(50));
    let source = FakeDataSource::new();
    let reader = ctx.reader(source.clone());

    let outcome = reader.board("P1", "T1").await;

    assert_eq!(outcome.path, ReadPath::Fallback);
    assert_eq!(source.board_calls.load(Ordering::SeqCst), 1);
}

/// Projects are enriched with their categories before they are cached
#[tokio::test]
async fn test_user_projects_are_enriched_and_cached() {
    let TestContext { ctx, .. } = memory_context();
    let source = FakeDataSource::new();
    *source.projects.lock() = vec![test_data::project("P1"), test_data::project("P2")];
    *source.categories.lock() = vec![test_data::category("area", 2)];
    let reader = ctx.reader(source.clone());

    let first = reader.user_projects("dev@example.com").await;
    assert_eq!(first.path, ReadPath::Miss);
    assert!(first.value.iter().all(|p| p.has_category_options()));
    assert_eq!(source.category_calls.load(Ordering::SeqCst), 2);

    settle().await;

    let second = reader.user_projects("DEV@example.com").await;
    assert_eq!(second.path, ReadPath::Hit);
    assert_eq!(source.project_calls.load(Ordering::SeqCst), 1);
}

/// Cached projects without any category options are stale and rebuilt
#[tokio::test]
async fn test_stale_user_projects_are_refreshed() {
    let TestContext { ctx, .. } = memory_context();
    assert!(ctx.users.set_projects("dev@example.com", &[test_data::project("P1")]).await);

    let source = FakeDataSource::new();
    *source.projects.lock() = vec![test_data::project("P1")];
    *source.categories.lock() = vec![test_data::category("area", 1)];
    let reader = ctx.reader(source.clone());

    let outcome = reader.user_projects("dev@example.com").await;

    assert_eq!(outcome.path, ReadPath::Miss);
    assert_eq!(source.project_calls.load(Ordering::SeqCst), 1);
    assert!(outcome.value[0].has_category_options());

    settle().await;
    let cached = ctx.users.get_projects("dev@example.com").await.unwrap();
    assert!(cached[0].has_category_options());
}

#[tokio::test]
async fn test_profile_and_team_reads() {
    let TestContext { ctx, .. } = memory_context();
    let source = FakeDataSource::new();
    let reader = ctx.reader(source);

    let profile = reader.profile("dev@example.com").await;
    assert_eq!(profile.path, ReadPath::Miss);
    assert_eq!(profile.value.email, "dev@example.com");

    let members = reader.team_members("T1").await;
    assert_eq!(members.path, ReadPath::Miss);
    assert!(members.into_value().is_empty());
}
