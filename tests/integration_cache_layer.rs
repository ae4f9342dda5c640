//! Integration tests for the KV store, cache strategy and domain caches
//!
//! Run against the in-memory backend with a manual clock, so TTL expiry is
//! exercised without sleeping.

mod common;

use chrono::Duration as ChronoDuration;
use common::*;
use std::sync::Arc;
use std::time::Duration;
use workhub_cache::cache_strategy::categories;
use workhub_cache::domain::{DashboardSummary, RelatedChange};
use workhub_cache::{CachePriority, CacheStrategy, CategoryPolicy, KvBackend};

/// A board is cached under the high tier for 300 seconds
#[tokio::test]
async fn test_board_expires_after_category_ttl() {
    let TestContext { ctx, backend, clock } = memory_context();
    let board = vec![test_data::column("todo", 2)];

    assert!(ctx.kanban.set_board("P1", "T1", &board).await);
    assert!(backend.get("high:kanban:board:P1:T1").await.unwrap().is_some());

    clock.advance(ChronoDuration::seconds(299));
    assert_eq!(ctx.kanban.get_board("P1", "T1").await, Some(board));

    clock.advance(ChronoDuration::seconds(2));
    assert_eq!(ctx.kanban.get_board("P1", "T1").await, None);
}

/// Dashboards live in the low tier for 60 seconds
#[tokio::test]
async fn test_dashboard_uses_analytics_category() {
    let TestContext { ctx, backend, clock } = memory_context();
    let dashboard = DashboardSummary {
        open_tickets: 3,
        ..DashboardSummary::default()
    };

    assert!(ctx.users.set_dashboard("dev@example.com", &dashboard).await);
    assert!(backend.get("low:user:dashboard:dev@example.com").await.unwrap().is_some());

    clock.advance(ChronoDuration::seconds(61));
    assert!(ctx.users.get_dashboard("dev@example.com").await.is_none());
}

/// Unknown categories fall back to a 300 second medium-tier policy
#[tokio::test]
async fn test_unknown_category_uses_default_policy() {
    let TestContext { ctx, backend, .. } = memory_context();

    assert!(ctx.strategy.set("misc:thing", &42_u32, "no-such-category").await);
    assert!(backend.get("medium:misc:thing").await.unwrap().is_some());
    assert_eq!(ctx.strategy.get::<u32>("misc:thing").await, Some(42));
}

/// Delete removes a logical key from every tier that holds it
#[tokio::test]
async fn test_delete_clears_every_priority_tier() {
    let TestContext { ctx, .. } = memory_context();
    let store = ctx.strategy.store();

    for priority in CachePriority::ALL {
        let physical = CacheStrategy::physical_key(priority, "kanban:columns:P1");
        assert!(store.set(&physical, &vec!["x"], Duration::from_secs(60)).await);
    }

    assert!(ctx.kanban.delete_columns("P1").await);

    for priority in CachePriority::ALL {
        let physical = CacheStrategy::physical_key(priority, "kanban:columns:P1");
        assert!(store.get::<Vec<String>>(&physical).await.is_none());
    }
}

/// Updating a category moves later writes to the new tier and TTL
#[tokio::test]
async fn test_category_update_changes_tier_and_ttl() {
    let TestContext { ctx, backend, clock } = memory_context();

    ctx.strategy
        .update_category(categories::KANBAN, CategoryPolicy::new(30, CachePriority::Low));
    assert!(ctx.kanban.set_columns("P1", &[test_data::column("a", 0)]).await);
    assert!(backend.get("low:kanban:columns:P1").await.unwrap().is_some());

    clock.advance(ChronoDuration::seconds(31));
    assert!(ctx.kanban.get_columns("P1").await.is_none());
}

/// A write after a tier change is what the next read sees
#[tokio::test]
async fn test_write_after_tier_change_is_read_back() {
    let TestContext { ctx, backend, .. } = memory_context();

    assert!(ctx.kanban.set_columns("P1", &[test_data::column("old", 0)]).await);
    ctx.strategy
        .update_category(categories::KANBAN, CategoryPolicy::new(300, CachePriority::Low));
    assert!(ctx.kanban.set_columns("P1", &[test_data::column("new", 0)]).await);

    let columns = ctx.kanban.get_columns("P1").await.unwrap();
    assert_eq!(columns[0].id, "new");
    assert!(backend.get("high:kanban:columns:P1").await.unwrap().is_none());
}

/// With the backend down, writes report false and reads miss; nothing errors
#[tokio::test]
async fn test_unavailable_backend_degrades_to_miss() {
    let TestContext { ctx, backend, .. } = memory_context();

    backend.set_available(false);
    assert!(!ctx.kanban.set_board("P1", "T1", &[test_data::column("a", 1)]).await);
    assert!(ctx.kanban.get_board("P1", "T1").await.is_none());
    assert!(!ctx.kanban.delete_board("P1", "T1").await);
    assert!(!ctx.health_check().await.healthy);

    backend.set_available(true);
    assert!(ctx.health_check().await.healthy);
}

/// Invalidating a project removes its boards and tickets for all teams and nothing else
#[tokio::test]
async fn test_project_invalidation_by_pattern() {
    let TestContext { ctx, .. } = memory_context();

    for team in ["T1", "T2", "T3"] {
        assert!(ctx.kanban.set_board("P1", team, &[test_data::column(team, 1)]).await);
        assert!(ctx.kanban.set_tickets("P1", team, &[test_data::ticket(team)]).await);
    }
    assert!(ctx.kanban.set_board("P2", "T1", &[test_data::column("keep", 0)]).await);

    let report = ctx.kanban.invalidate_project("P1").await;

    assert!(report.is_complete());
    for team in ["T1", "T2", "T3"] {
        assert!(ctx.kanban.get_board("P1", team).await.is_none());
        assert!(ctx.kanban.get_tickets("P1", team).await.is_none());
    }
    assert!(ctx.kanban.get_board("P2", "T1").await.is_some());
}

/// A failing delete is reported while the other targets are still removed
#[tokio::test]
async fn test_partial_invalidation_failure_is_reported() {
    let ctx = context_with_backend(Arc::new(FlakyBackend::new("high:kanban:columns:P1")), Duration::from_millis(200));

    assert!(ctx.kanban.set_columns("P1", &[test_data::column("a", 0)]).await);
    assert!(ctx.kanban.set_project_categories("P1", &[test_data::category("c", 1)]).await);
    assert!(ctx.kanban.set_board("P1", "T1", &[test_data::column("b", 0)]).await);

    let report = ctx.kanban.invalidate_project("P1").await;

    assert!(!report.is_complete());
    assert_eq!(report.failed, vec!["kanban:columns:P1".to_string()]);
    assert!(ctx.kanban.get_project_categories("P1").await.is_none());
    assert!(ctx.kanban.get_board("P1", "T1").await.is_none());
}

/// A ticket move touching a project, a team and two users clears all related entries
#[tokio::test]
async fn test_related_invalidation_through_context() {
    let TestContext { ctx, .. } = memory_context();
    let emails = vec!["a@example.com".to_string(), "B@Example.com".to_string()];

    assert!(ctx.kanban.set_board("P1", "T1", &[test_data::column("a", 1)]).await);
    assert!(ctx.users.set_dashboard("b@example.com", &DashboardSummary::default()).await);
    assert!(ctx.users.set_projects("a@example.com", &[test_data::project("P1")]).await);

    let report = ctx
        .invalidate_related(RelatedChange {
            project_id: Some("P1"),
            team_id: Some("T1"),
            user_emails: &emails,
        })
        .await;

    assert!(report.is_complete());
    assert!(ctx.kanban.get_board("P1", "T1").await.is_none());
    assert!(ctx.users.get_dashboard("b@example.com").await.is_none());
    assert!(ctx.users.get_projects("a@example.com").await.is_none());
}

/// Empty fields are dropped on write and restored as defaults on read
#[tokio::test]
async fn test_compact_payload_reads_back_with_defaults() {
    let TestContext { ctx, backend, .. } = memory_context();
    let column = test_data::column("empty", 0);

    assert!(ctx.kanban.set_columns("P1", &[column.clone()]).await);

    let raw = backend.get("high:kanban:columns:P1").await.unwrap().unwrap();
    let text = String::from_utf8(raw).unwrap();
    assert!(!text.contains("tickets"));
    assert!(!text.contains("wip_limit"));

    assert_eq!(ctx.kanban.get_columns("P1").await, Some(vec![column]));
}

#[tokio::test]
async fn test_strategy_stats_track_hits_and_misses() {
    let TestContext { ctx, .. } = memory_context();

    assert!(ctx.kanban.set_columns("P1", &[test_data::column("a", 0)]).await);
    assert!(ctx.kanban.get_columns("P1").await.is_some());
    assert!(ctx.kanban.get_columns("P2").await.is_none());

    let stats = ctx.strategy.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.sets, 1);
    assert!((stats.hit_rate - 50.0).abs() < f64::EPSILON);
}
