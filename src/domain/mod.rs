//! Domain Caches
//!
//! Deterministic key naming for board and user data, routed through the
//! [`CacheStrategy`](crate::cache_strategy::CacheStrategy) under the right category.
//!
//! Bulk invalidations attempt every key they derive from an entity, concurrently
//! and independently; a failing delete is logged and reported, never fatal.

pub mod kanban_cache;
pub mod models;
pub mod user_cache;

pub use kanban_cache::KanbanCache;
pub use models::*;
pub use user_cache::UserCache;

use futures_util::future::join_all;
use serde::Serialize;
use tracing::warn;

use crate::cache_strategy::CacheStrategy;

/// Outcome of a bulk invalidation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvalidationReport {
    /// Number of keys or patterns a delete was attempted for
    pub attempted: usize,
    /// Keys or patterns whose delete failed
    pub failed: Vec<String>,
}

impl InvalidationReport {
    /// Whether every attempted delete succeeded
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, target: String, deleted: bool) {
        self.attempted += 1;
        if !deleted {
            warn!(target = %target, "Cache invalidation failed");
            self.failed.push(target);
        }
    }

    fn merge(&mut self, other: Self) {
        self.attempted += other.attempted;
        self.failed.extend(other.failed);
    }

    /// Delete every key in `targets` concurrently and report the outcome
    async fn collect<I>(strategy: &CacheStrategy, targets: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let targets: Vec<String> = targets.into_iter().collect();
        let results = join_all(targets.iter().map(|key| strategy.delete(key))).await;

        let mut report = Self::default();
        for (target, deleted) in targets.into_iter().zip(results) {
            report.record(target, deleted);
        }
        report
    }
}

/// What changed, for [`invalidate_related_caches`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RelatedChange<'a> {
    pub project_id: Option<&'a str>,
    pub team_id: Option<&'a str>,
    pub user_emails: &'a [String],
}

/// Invalidate everything a write to a project, team or set of users can affect
///
/// A ticket move, for example, touches the project's boards, the team views and
/// the dashboards of everyone involved.
pub async fn invalidate_related_caches(
    kanban: &KanbanCache,
    users: &UserCache,
    change: RelatedChange<'_>,
) -> InvalidationReport {
    let project = async {
        match change.project_id {
            Some(project_id) => kanban.invalidate_project(project_id).await,
            None => InvalidationReport::default(),
        }
    };
    let team = async {
        match change.team_id {
            Some(team_id) => users.invalidate_team(team_id).await,
            None => InvalidationReport::default(),
        }
    };
    let people = join_all(change.user_emails.iter().map(|email| users.invalidate_user(email)));

    let (project, team, people) = tokio::join!(project, team, people);

    let mut report = project;
    report.merge(team);
    for user_report in people {
        report.merge(user_report);
    }
    report
}
