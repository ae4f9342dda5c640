//! Kanban Cache
//!
//! Key naming and routing for board data. Boards, columns and tickets are
//! cached under the `kanban` category; project categories under `project`.

use std::sync::Arc;
use tracing::info;

use super::InvalidationReport;
use super::models::{BoardColumn, BoardTicket, ProjectCategory};
use crate::cache_strategy::{CacheStrategy, categories};

/// Cache key builders
///
/// Each entity type owns a distinct literal prefix, so keys of different
/// entity types never collide.
pub mod keys {
    use crate::kv_store::escape_glob;

    #[must_use]
    pub fn board(project_id: &str, team_id: &str) -> String {
        format!("kanban:board:{project_id}:{team_id}")
    }

    /// Pattern covering the boards of every team in a project
    #[must_use]
    pub fn boards_of_project(project_id: &str) -> String {
        format!("kanban:board:{}:*", escape_glob(project_id))
    }

    #[must_use]
    pub fn columns(project_id: &str) -> String {
        format!("kanban:columns:{project_id}")
    }

    #[must_use]
    pub fn project_categories(project_id: &str) -> String {
        format!("kanban:categories:{project_id}")
    }

    #[must_use]
    pub fn tickets(project_id: &str, team_id: &str) -> String {
        format!("kanban:tickets:{project_id}:{team_id}")
    }

    #[must_use]
    pub fn tickets_of_project(project_id: &str) -> String {
        format!("kanban:tickets:{}:*", escape_glob(project_id))
    }
}

/// Board-level cache over a [`CacheStrategy`]
#[derive(Clone)]
pub struct KanbanCache {
    strategy: Arc<CacheStrategy>,
}

impl KanbanCache {
    pub fn new(strategy: Arc<CacheStrategy>) -> Self {
        Self { strategy }
    }

    pub async fn get_board(&self, project_id: &str, team_id: &str) -> Option<Vec<BoardColumn>> {
        self.strategy.get(&keys::board(project_id, team_id)).await
    }

    pub async fn set_board(&self, project_id: &str, team_id: &str, board: &[BoardColumn]) -> bool {
        self.strategy
            .set(&keys::board(project_id, team_id), board, categories::KANBAN)
            .await
    }

    pub async fn delete_board(&self, project_id: &str, team_id: &str) -> bool {
        self.strategy.delete(&keys::board(project_id, team_id)).await
    }

    pub async fn get_columns(&self, project_id: &str) -> Option<Vec<BoardColumn>> {
        self.strategy.get(&keys::columns(project_id)).await
    }

    pub async fn set_columns(&self, project_id: &str, columns: &[BoardColumn]) -> bool {
        self.strategy
            .set(&keys::columns(project_id), columns, categories::KANBAN)
            .await
    }

    pub async fn delete_columns(&self, project_id: &str) -> bool {
        self.strategy.delete(&keys::columns(project_id)).await
    }

    pub async fn get_project_categories(&self, project_id: &str) -> Option<Vec<ProjectCategory>> {
        self.strategy.get(&keys::project_categories(project_id)).await
    }

    pub async fn set_project_categories(&self, project_id: &str, project_categories: &[ProjectCategory]) -> bool {
        self.strategy
            .set(&keys::project_categories(project_id), project_categories, categories::PROJECT)
            .await
    }

    pub async fn delete_project_categories(&self, project_id: &str) -> bool {
        self.strategy.delete(&keys::project_categories(project_id)).await
    }

    pub async fn get_tickets(&self, project_id: &str, team_id: &str) -> Option<Vec<BoardTicket>> {
        self.strategy.get(&keys::tickets(project_id, team_id)).await
    }

    pub async fn set_tickets(&self, project_id: &str, team_id: &str, tickets: &[BoardTicket]) -> bool {
        self.strategy
            .set(&keys::tickets(project_id, team_id), tickets, categories::KANBAN)
            .await
    }

    /// Drop the board and ticket list of one team
    pub async fn invalidate_board(&self, project_id: &str, team_id: &str) -> InvalidationReport {
        let board_key = keys::board(project_id, team_id);
        let tickets_key = keys::tickets(project_id, team_id);
        let (board, tickets) = tokio::join!(
            self.strategy.delete(&board_key),
            self.strategy.delete(&tickets_key),
        );

        let mut report = InvalidationReport::default();
        report.record(keys::board(project_id, team_id), board);
        report.record(keys::tickets(project_id, team_id), tickets);
        report
    }

    /// Drop every cached entry derived from a project
    ///
    /// Columns and categories are deleted by key; boards and ticket lists of all
    /// teams by pattern. Each delete is attempted even if another fails.
    pub async fn invalidate_project(&self, project_id: &str) -> InvalidationReport {
        let columns_key = keys::columns(project_id);
        let categories_key = keys::project_categories(project_id);
        let boards_pattern = keys::boards_of_project(project_id);
        let tickets_pattern = keys::tickets_of_project(project_id);

        let (columns, project_categories, boards, tickets) = tokio::join!(
            self.strategy.delete(&columns_key),
            self.strategy.delete(&categories_key),
            self.strategy.delete_by_pattern(&boards_pattern),
            self.strategy.delete_by_pattern(&tickets_pattern),
        );

        let mut report = InvalidationReport::default();
        report.record(columns_key, columns);
        report.record(categories_key, project_categories);
        report.record(boards_pattern, boards);
        report.record(tickets_pattern, tickets);

        info!(
            project_id = %project_id,
            attempted = report.attempted,
            failed = report.failed.len(),
            "Invalidated project caches"
        );
        report
    }
}
