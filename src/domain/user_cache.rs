//! User Cache
//!
//! Key naming and routing for per-user and per-team data. Emails are trimmed
//! and lowercased before they become part of a key.

use std::sync::Arc;
use tracing::info;

use super::InvalidationReport;
use super::models::{DashboardSummary, TeamMember, TeamShift, UserProfile, UserProject};
use crate::cache_strategy::{CacheStrategy, categories};

/// Cache key builders
pub mod keys {
    fn normalize(email: &str) -> String {
        email.trim().to_lowercase()
    }

    #[must_use]
    pub fn projects(email: &str) -> String {
        format!("user:projects:{}", normalize(email))
    }

    #[must_use]
    pub fn dashboard(email: &str) -> String {
        format!("user:dashboard:{}", normalize(email))
    }

    #[must_use]
    pub fn profile(email: &str) -> String {
        format!("user:profile:{}", normalize(email))
    }

    #[must_use]
    pub fn team_members(team_id: &str) -> String {
        format!("user:team_members:{team_id}")
    }

    #[must_use]
    pub fn team_shifts(team_id: &str) -> String {
        format!("user:team_shifts:{team_id}")
    }
}

/// User-level cache over a [`CacheStrategy`]
#[derive(Clone)]
pub struct UserCache {
    strategy: Arc<CacheStrategy>,
}

impl UserCache {
    pub fn new(strategy: Arc<CacheStrategy>) -> Self {
        Self { strategy }
    }

    pub async fn get_projects(&self, email: &str) -> Option<Vec<UserProject>> {
        self.strategy.get(&keys::projects(email)).await
    }

    pub async fn set_projects(&self, email: &str, projects: &[UserProject]) -> bool {
        self.strategy
            .set(&keys::projects(email), projects, categories::USER)
            .await
    }

    pub async fn delete_projects(&self, email: &str) -> bool {
        self.strategy.delete(&keys::projects(email)).await
    }

    /// Dashboards change with every ticket move, so they use the short-lived
    /// analytics category.
    pub async fn get_dashboard(&self, email: &str) -> Option<DashboardSummary> {
        self.strategy.get(&keys::dashboard(email)).await
    }

    pub async fn set_dashboard(&self, email: &str, dashboard: &DashboardSummary) -> bool {
        self.strategy
            .set(&keys::dashboard(email), dashboard, categories::ANALYTICS)
            .await
    }

    pub async fn delete_dashboard(&self, email: &str) -> bool {
        self.strategy.delete(&keys::dashboard(email)).await
    }

    pub async fn get_profile(&self, email: &str) -> Option<UserProfile> {
        self.strategy.get(&keys::profile(email)).await
    }

    pub async fn set_profile(&self, email: &str, profile: &UserProfile) -> bool {
        self.strategy
            .set(&keys::profile(email), profile, categories::USER)
            .await
    }

    pub async fn get_team_members(&self, team_id: &str) -> Option<Vec<TeamMember>> {
        self.strategy.get(&keys::team_members(team_id)).await
    }

    pub async fn set_team_members(&self, team_id: &str, members: &[TeamMember]) -> bool {
        self.strategy
            .set(&keys::team_members(team_id), members, categories::USER)
            .await
    }

    pub async fn get_team_shifts(&self, team_id: &str) -> Option<Vec<TeamShift>> {
        self.strategy.get(&keys::team_shifts(team_id)).await
    }

    pub async fn set_team_shifts(&self, team_id: &str, shifts: &[TeamShift]) -> bool {
        self.strategy
            .set(&keys::team_shifts(team_id), shifts, categories::USER)
            .await
    }

    /// Drop projects, dashboard and profile of one user
    pub async fn invalidate_user(&self, email: &str) -> InvalidationReport {
        let targets = [keys::projects(email), keys::dashboard(email), keys::profile(email)];
        let report = InvalidationReport::collect(&self.strategy, targets).await;

        info!(
            user = %email,
            attempted = report.attempted,
            failed = report.failed.len(),
            "Invalidated user caches"
        );
        report
    }

    /// Drop member list and shifts of one team
    pub async fn invalidate_team(&self, team_id: &str) -> InvalidationReport {
        let targets = [keys::team_members(team_id), keys::team_shifts(team_id)];
        InvalidationReport::collect(&self.strategy, targets).await
    }
}
