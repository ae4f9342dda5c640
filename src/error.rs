//! Error types
//!
//! The cache layers never surface errors for cache reasons, so the typed errors
//! here belong to the collaborators around them: data sources, the monitoring
//! engine's management API, and alert action delivery.

use thiserror::Error;

/// Failure reported by a data-fetch collaborator
#[derive(Debug, Error)]
pub enum FetchError {
    /// The source answered but reported `success = false`
    #[error("data source reported failure: {0}")]
    Unsuccessful(String),

    /// The source could not be reached or errored
    #[error("data source unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}

/// Errors from the monitoring engine's management API
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonitoringError {
    #[error("alert not found: {0}")]
    AlertNotFound(String),

    #[error("monitoring rule already exists: {0}")]
    DuplicateRule(String),

    #[error("monitoring rule not found: {0}")]
    RuleNotFound(String),

    #[error("actor identity is required")]
    MissingActor,
}

/// Failure of a single alert action
#[derive(Debug, Error)]
pub enum ActionError {
    /// The action is configured on the rule but its target is not wired up
    #[error("{action} action has no configured target")]
    NotConfigured { action: &'static str },

    #[error("{action} delivery failed: {source}")]
    Delivery {
        action: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("{action} endpoint returned HTTP {status}")]
    HttpStatus { action: &'static str, status: u16 },
}
