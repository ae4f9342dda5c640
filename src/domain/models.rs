//! Cached payload types
//!
//! Every type tolerates missing fields on read (`#[serde(default)]`) because the
//! store's codec drops empty fields on write.

use serde::{Deserialize, Serialize};

/// Ticket as shown on a board
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardTicket {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub assignee: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
}

/// One column of a kanban board, with its tickets when part of a board
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardColumn {
    pub id: String,
    pub name: String,
    pub position: u32,
    pub wip_limit: Option<u32>,
    pub tickets: Vec<BoardTicket>,
}

/// Selectable value of a project category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryOption {
    pub id: String,
    pub label: String,
    pub color: Option<String>,
}

/// Project-level ticket category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectCategory {
    pub id: String,
    pub name: String,
    pub options: Vec<CategoryOption>,
}

/// Project membership of a user, optionally enriched with categories
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProject {
    pub id: String,
    pub key: String,
    pub name: String,
    pub role: Option<String>,
    pub categories: Vec<ProjectCategory>,
}

impl UserProject {
    /// Whether any category of this project carries options
    #[must_use]
    pub fn has_category_options(&self) -> bool {
        self.categories.iter().any(|category| !category.options.is_empty())
    }
}

/// Per-project figures on the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSummary {
    pub project_id: String,
    pub name: String,
    pub open_tickets: u64,
}

/// Dashboard aggregate for one user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSummary {
    pub open_tickets: u64,
    pub in_progress: u64,
    pub completed_this_week: u64,
    pub projects: Vec<ProjectSummary>,
}

/// Member of a team
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamMember {
    pub email: String,
    pub name: String,
    pub role: Option<String>,
}

/// Working shift of a team member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamShift {
    pub member_email: String,
    /// 0 = Monday
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
}

/// Profile of a signed-in user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub email: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub teams: Vec<String>,
}
