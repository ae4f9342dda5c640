//! Cache-Aside Orchestrators
//!
//! Every read follows the same three-way flow:
//!
//! ```text
//! lookup ──hit──────────────────────────────────────────► HIT
//!    │ miss
//!    ▼
//! fetch ──ok──► spawn detached cache write ─────────────► MISS
//!    │ error                      (lookup error/timeout)
//!    ▼                                    │
//! fetch again, bypassing the cache ◄──────┘
//!    ├─ ok ─────────────────────────────────────────────► FALLBACK
//!    └─ error ─► empty default ─────────────────────────► FALLBACK
//! ```
//!
//! Reads never return an error. The cache write after a miss is not awaited.

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::detached::spawn_detached;
use crate::domain::{
    BoardColumn, BoardTicket, DashboardSummary, KanbanCache, ProjectCategory, TeamMember, TeamShift,
    UserCache, UserProfile, UserProject,
};
use crate::error::FetchError;

/// Envelope used by data sources that answer `{success, data?}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T: Default> FetchResponse<T> {
    /// `success = false` becomes an error; a successful answer without data is the empty value
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Unsuccessful`] when the source reported failure.
    pub fn into_result(self) -> Result<T, FetchError> {
        if self.success {
            Ok(self.data.unwrap_or_default())
        } else {
            Err(FetchError::Unsuccessful(
                self.error.unwrap_or_else(|| "unspecified error".to_string()),
            ))
        }
    }
}

/// Source of truth behind the caches
#[async_trait]
pub trait ProjectDataSource: Send + Sync {
    async fn fetch_board(&self, project_id: &str, team_id: &str) -> Result<Vec<BoardColumn>, FetchError>;

    async fn fetch_tickets(&self, project_id: &str, team_id: &str) -> Result<Vec<BoardTicket>, FetchError>;

    async fn fetch_columns(&self, project_id: &str) -> Result<Vec<BoardColumn>, FetchError>;

    /// Categories of a project with their options joined in
    async fn fetch_project_categories(&self, project_id: &str) -> Result<Vec<ProjectCategory>, FetchError>;

    /// Projects of a user, without categories
    async fn fetch_user_projects(&self, email: &str) -> Result<Vec<UserProject>, FetchError>;

    async fn fetch_dashboard(&self, email: &str) -> Result<DashboardSummary, FetchError>;

    async fn fetch_profile(&self, email: &str) -> Result<UserProfile, FetchError>;

    async fn fetch_team_members(&self, team_id: &str) -> Result<Vec<TeamMember>, FetchError>;

    async fn fetch_team_shifts(&self, team_id: &str) -> Result<Vec<TeamShift>, FetchError>;
}

/// Which path a read took
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadPath {
    Hit,
    Miss,
    Fallback,
}

/// Value returned by an orchestrated read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome<T> {
    pub value: T,
    pub path: ReadPath,
}

impl<T> ReadOutcome<T> {
    fn new(value: T, path: ReadPath) -> Self {
        Self { value, path }
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

/// Cache-aside reads over the kanban and user caches
#[derive(Clone)]
pub struct CacheAsideReader {
    kanban: KanbanCache,
    users: UserCache,
    source: Arc<dyn ProjectDataSource>,
    lookup_timeout: Duration,
}

impl CacheAsideReader {
    pub fn new(
        kanban: KanbanCache,
        users: UserCache,
        source: Arc<dyn ProjectDataSource>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            kanban,
            users,
            source,
            lookup_timeout,
        }
    }

    async fn read_through<T, Lookup, Fetch, FetchFut, Store, StoreFut>(
        &self,
        entity: &'static str,
        lookup: Lookup,
        fetch: Fetch,
        store: Store,
    ) -> ReadOutcome<T>
    where
        T: Clone + Default + Send + 'static,
        Lookup: Future<Output = Option<T>>,
        Fetch: Fn() -> FetchFut,
        FetchFut: Future<Output = Result<T, FetchError>>,
        Store: FnOnce(T) -> StoreFut,
        StoreFut: Future<Output = bool> + Send + 'static,
    {
        match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(Some(value)) => {
                debug!(entity = entity, "Cache-aside hit");
                return ReadOutcome::new(value, ReadPath::Hit);
            }
            Ok(None) => match fetch().await {
                Ok(value) => {
                    let write = store(value.clone());
                    spawn_detached(entity, async move {
                        if write.await {
                            Ok(())
                        } else {
                            anyhow::bail!("cache write-through was not stored")
                        }
                    });
                    debug!(entity = entity, "Cache-aside miss, fetched from source");
                    return ReadOutcome::new(value, ReadPath::Miss);
                }
                Err(e) => {
                    warn!(entity = entity, error = %e, "Fetch after cache miss failed, retrying without cache");
                }
            },
            Err(_) => {
                warn!(
                    entity = entity,
                    timeout_ms = u64::try_from(self.lookup_timeout.as_millis()).unwrap_or(u64::MAX),
                    "Cache lookup timed out, reading from source"
                );
            }
        }

        match fetch().await {
            Ok(value) => ReadOutcome::new(value, ReadPath::Fallback),
            Err(e) => {
                error!(entity = entity, error = %e, "Source read failed, returning empty result");
                ReadOutcome::new(T::default(), ReadPath::Fallback)
            }
        }
    }

    pub async fn board(&self, project_id: &str, team_id: &str) -> ReadOutcome<Vec<BoardColumn>> {
        let cache = self.kanban.clone();
        let (project, team) = (project_id.to_string(), team_id.to_string());
        self.read_through(
            "kanban_board",
            self.kanban.get_board(project_id, team_id),
            || self.source.fetch_board(project_id, team_id),
            move |board| async move { cache.set_board(&project, &team, &board).await },
        )
        .await
    }

    pub async fn tickets(&self, project_id: &str, team_id: &str) -> ReadOutcome<Vec<BoardTicket>> {
        let cache = self.kanban.clone();
        let (project, team) = (project_id.to_string(), team_id.to_string());
        self.read_through(
            "kanban_tickets",
            self.kanban.get_tickets(project_id, team_id),
            || self.source.fetch_tickets(project_id, team_id),
            move |tickets| async move { cache.set_tickets(&project, &team, &tickets).await },
        )
        .await
    }

    pub async fn columns(&self, project_id: &str) -> ReadOutcome<Vec<BoardColumn>> {
        let cache = self.kanban.clone();
        let project = project_id.to_string();
        self.read_through(
            "kanban_columns",
            self.kanban.get_columns(project_id),
            || self.source.fetch_columns(project_id),
            move |columns| async move { cache.set_columns(&project, &columns).await },
        )
        .await
    }

    pub async fn project_categories(&self, project_id: &str) -> ReadOutcome<Vec<ProjectCategory>> {
        let cache = self.kanban.clone();
        let project = project_id.to_string();
        self.read_through(
            "project_categories",
            self.kanban.get_project_categories(project_id),
            || self.source.fetch_project_categories(project_id),
            move |found| async move { cache.set_project_categories(&project, &found).await },
        )
        .await
    }

    /// Projects of a user, enriched with categories and their options
    ///
    /// A cached entry only counts as a hit if at least one project carries
    /// category options. Entries written before categories were joined in fail
    /// that check; they are deleted and rebuilt from the source.
    pub async fn user_projects(&self, email: &str) -> ReadOutcome<Vec<UserProject>> {
        let lookup = async {
            match self.users.get_projects(email).await {
                Some(projects) if projects.iter().any(UserProject::has_category_options) => Some(projects),
                Some(_) => {
                    debug!(user = %email, "Cached projects lack category options, refreshing");
                    self.users.delete_projects(email).await;
                    None
                }
                None => None,
            }
        };

        let cache = self.users.clone();
        let owner = email.to_string();
        self.read_through(
            "user_projects",
            lookup,
            || self.fetch_enriched_projects(email),
            move |projects| async move { cache.set_projects(&owner, &projects).await },
        )
        .await
    }

    async fn fetch_enriched_projects(&self, email: &str) -> Result<Vec<UserProject>, FetchError> {
        let mut projects = self.source.fetch_user_projects(email).await?;

        let categories = join_all(
            projects
                .iter()
                .map(|project| self.source.fetch_project_categories(&project.id)),
        )
        .await;

        for (project, found) in projects.iter_mut().zip(categories) {
            match found {
                Ok(found) => project.categories = found,
                Err(e) => {
                    warn!(project_id = %project.id, error = %e, "Could not load project categories");
                }
            }
        }
        Ok(projects)
    }

    pub async fn dashboard(&self, email: &str) -> ReadOutcome<DashboardSummary> {
        let cache = self.users.clone();
        let owner = email.to_string();
        self.read_through(
            "user_dashboard",
            self.users.get_dashboard(email),
            || self.source.fetch_dashboard(email),
            move |dashboard| async move { cache.set_dashboard(&owner, &dashboard).await },
        )
        .await
    }

    pub async fn profile(&self, email: &str) -> ReadOutcome<UserProfile> {
        let cache = self.users.clone();
        let owner = email.to_string();
        self.read_through(
            "user_profile",
            self.users.get_profile(email),
            || self.source.fetch_profile(email),
            move |profile| async move { cache.set_profile(&owner, &profile).await },
        )
        .await
    }

    pub async fn team_members(&self, team_id: &str) -> ReadOutcome<Vec<TeamMember>> {
        let cache = self.users.clone();
        let team = team_id.to_string();
        self.read_through(
            "team_members",
            self.users.get_team_members(team_id),
            || self.source.fetch_team_members(team_id),
            move |members| async move { cache.set_team_members(&team, &members).await },
        )
        .await
    }

    pub async fn team_shifts(&self, team_id: &str) -> ReadOutcome<Vec<TeamShift>> {
        let cache = self.users.clone();
        let team = team_id.to_string();
        self.read_through(
            "team_shifts",
            self.users.get_team_shifts(team_id),
            || self.source.fetch_team_shifts(team_id),
            move |shifts| async move { cache.set_team_shifts(&team, &shifts).await },
        )
        .await
    }
}
