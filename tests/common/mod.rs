//! Common utilities for integration tests
//!
//! This module provides shared test infrastructure including:
//! - In-memory contexts driven by a manual clock
//! - A scriptable data source with call counters
//! - Backends that fail or stall on demand
//! - Recording alert collaborators

#![allow(dead_code)]

use anyhow::{Result, bail};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use workhub_cache::domain::{
    BoardColumn, BoardTicket, CategoryOption, DashboardSummary, ProjectCategory, TeamMember, TeamShift, UserProfile,
    UserProject,
};
use workhub_cache::monitoring::{ActionDispatcher, AlertRecord, AlertStore, EmailMessage, EmailSender, MonitoringRule};
use workhub_cache::{
    Clock, FetchError, KvBackend, ManualClock, MemoryBackend, MonitoringConfig, MonitoringEngine, ProjectDataSource,
    WorkhubContext, async_trait,
};

/// Get Redis URL from environment or use default
pub fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

/// Generate a unique key suffix to avoid conflicts between tests sharing a Redis
pub fn unique(name: &str) -> String {
    format!("{name}-{}", uuid::Uuid::new_v4().simple())
}

pub struct TestContext {
    pub ctx: WorkhubContext,
    pub backend: Arc<MemoryBackend>,
    pub clock: Arc<ManualClock>,
}

/// Context over an in-memory backend whose expiry follows a manual clock
pub fn memory_context() -> TestContext {
    let clock = Arc::new(ManualClock::starting_now());
    let backend = Arc::new(MemoryBackend::with_clock(clock.clone()));
    let monitoring = MonitoringEngine::new(MonitoringConfig::default());
    let ctx = WorkhubContext::with_backend(backend.clone(), monitoring, Duration::from_millis(200));

    TestContext { ctx, backend, clock }
}

/// Context over an arbitrary backend
pub fn context_with_backend(backend: Arc<dyn KvBackend>, lookup_timeout: Duration) -> WorkhubContext {
    WorkhubContext::with_backend(backend, MonitoringEngine::new(MonitoringConfig::default()), lookup_timeout)
}

/// Monitoring engine with explicit rules, clock and dispatcher
pub fn monitoring_engine(
    config: MonitoringConfig,
    rules: Vec<MonitoringRule>,
    dispatcher: ActionDispatcher,
) -> (MonitoringEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_now());
    let engine = MonitoringEngine::with_parts(config, clock.clone() as Arc<dyn Clock>, dispatcher, rules);
    (engine, clock)
}

/// Test data generators
pub mod test_data {
    use super::*;

    pub fn column(id: &str, tickets: usize) -> BoardColumn {
        BoardColumn {
            id: id.to_string(),
            name: id.to_uppercase(),
            position: 1,
            wip_limit: None,
            tickets: (0..tickets).map(|i| ticket(&format!("{id}-{i}"))).collect(),
        }
    }

    pub fn ticket(key: &str) -> BoardTicket {
        BoardTicket {
            key: key.to_string(),
            summary: format!("Ticket {key}"),
            status: "open".to_string(),
            ..BoardTicket::default()
        }
    }

    pub fn category(id: &str, options: usize) -> ProjectCategory {
        ProjectCategory {
            id: id.to_string(),
            name: format!("Category {id}"),
            options: (0..options)
                .map(|i| CategoryOption {
                    id: format!("{id}-opt{i}"),
                    label: format!("Option {i}"),
                    color: None,
                })
                .collect(),
        }
    }

    pub fn project(id: &str) -> UserProject {
        UserProject {
            id: id.to_string(),
            key: id.to_uppercase(),
            name: format!("Project {id}"),
            ..UserProject::default()
        }
    }
}

/// Scriptable [`ProjectDataSource`] counting every call
#[derive(Default)]
pub struct FakeDataSource {
    pub fail: AtomicBool,
    pub board_calls: AtomicUsize,
    pub project_calls: AtomicUsize,
    pub category_calls: AtomicUsize,
    pub dashboard_calls: AtomicUsize,
    pub board: Mutex<Vec<BoardColumn>>,
    pub projects: Mutex<Vec<UserProject>>,
    pub categories: Mutex<Vec<ProjectCategory>>,
    pub dashboard: Mutex<DashboardSummary>,
}

impl FakeDataSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), FetchError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(FetchError::Unsuccessful("source offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ProjectDataSource for FakeDataSource {
    async fn fetch_board(&self, _project_id: &str, _team_id: &str) -> Result<Vec<BoardColumn>, FetchError> {
        self.board_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.board.lock().clone())
    }

    async fn fetch_tickets(&self, _project_id: &str, _team_id: &str) -> Result<Vec<BoardTicket>, FetchError> {
        self.check()?;
        Ok(self.board.lock().iter().flat_map(|c| c.tickets.clone()).collect())
    }

    async fn fetch_columns(&self, _project_id: &str) -> Result<Vec<BoardColumn>, FetchError> {
        self.check()?;
        Ok(self.board.lock().clone())
    }

    async fn fetch_project_categories(&self, _project_id: &str) -> Result<Vec<ProjectCategory>, FetchError> {
        self.category_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.categories.lock().clone())
    }

    async fn fetch_user_projects(&self, _email: &str) -> Result<Vec<UserProject>, FetchError> {
        self.project_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.projects.lock().clone())
    }

    async fn fetch_dashboard(&self, _email: &str) -> Result<DashboardSummary, FetchError> {
        self.dashboard_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.dashboard.lock().clone())
    }

    async fn fetch_profile(&self, email: &str) -> Result<UserProfile, FetchError> {
        self.check()?;
        Ok(UserProfile {
            email: email.to_string(),
            display_name: "Test User".to_string(),
            ..UserProfile::default()
        })
    }

    async fn fetch_team_members(&self, _team_id: &str) -> Result<Vec<TeamMember>, FetchError> {
        self.check()?;
        Ok(Vec::new())
    }

    async fn fetch_team_shifts(&self, _team_id: &str) -> Result<Vec<TeamShift>, FetchError> {
        self.check()?;
        Ok(Vec::new())
    }
}

/// Memory backend whose deletes fail for keys containing `poisoned`
pub struct FlakyBackend {
    pub inner: MemoryBackend,
    pub poisoned: String,
}

impl FlakyBackend {
    pub fn new(poisoned: &str) -> Self {
        Self {
            inner: MemoryBackend::new(),
            poisoned: poisoned.to_string(),
        }
    }
}

#[async_trait]
impl KvBackend for FlakyBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.inner.set_with_ttl(key, value, ttl).await
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        if key.contains(&self.poisoned) {
            bail!("injected delete failure for {key}");
        }
        self.inner.remove(key).await
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.inner.scan_keys(pattern).await
    }

    async fn remove_bulk(&self, keys: &[String]) -> Result<usize> {
        if keys.iter().any(|key| key.contains(&self.poisoned)) {
            bail!("injected bulk delete failure");
        }
        self.inner.remove_bulk(keys).await
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }

    fn name(&self) -> &'static str {
        "Flaky"
    }
}

/// Memory backend whose reads stall for `delay`
pub struct StallingBackend {
    pub inner: MemoryBackend,
    pub delay: Duration,
}

#[async_trait]
impl KvBackend for StallingBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        self.inner.set_with_ttl(key, value, ttl).await
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        self.inner.remove(key).await
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.inner.scan_keys(pattern).await
    }

    async fn remove_bulk(&self, keys: &[String]) -> Result<usize> {
        self.inner.remove_bulk(keys).await
    }

    async fn ping(&self) -> Result<()> {
        self.inner.ping().await
    }
}

/// Alert store keeping every record, or failing every insert
#[derive(Default)]
pub struct RecordingAlertStore {
    pub records: Mutex<Vec<AlertRecord>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl AlertStore for RecordingAlertStore {
    async fn insert_alert(&self, record: &AlertRecord) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("alert table unavailable");
        }
        self.records.lock().push(record.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        self.sent.lock().push(message.clone());
        Ok(())
    }
}

/// Wait until detached cache writes have landed
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
}
