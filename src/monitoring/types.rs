//! Monitoring data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::rules::MonitoringRule;

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Attachment colour used by chat notifications
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            Self::Low => "#36a64f",
            Self::Medium => "#ffcc00",
            Self::High => "#ff9900",
            Self::Critical => "#ff0000",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Security or audit event fed into the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub event_type: String,
    #[serde(default)]
    pub user_identity: Option<String>,
    #[serde(default)]
    pub source_address: Option<String>,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl SecurityEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            user_identity: None,
            source_address: None,
            details: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_user(mut self, user_identity: impl Into<String>) -> Self {
        self.user_identity = Some(user_identity.into());
        self
    }

    #[must_use]
    pub fn with_source_address(mut self, source_address: impl Into<String>) -> Self {
        self.source_address = Some(source_address.into());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

const UNKNOWN: &str = "unknown";

/// Correlation identity: event type, actor and origin
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventKey {
    pub event_type: String,
    pub user_identity: String,
    pub source_address: String,
}

impl EventKey {
    /// Missing actor or origin collapse to `"unknown"`
    #[must_use]
    pub fn from_event(event: &SecurityEvent) -> Self {
        Self {
            event_type: event.event_type.clone(),
            user_identity: event.user_identity.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            source_address: event.source_address.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.event_type, self.user_identity, self.source_address)
    }
}

/// Occurrences of one [`EventKey`] since `first_seen_at`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventCounter {
    pub count: u64,
    pub first_seen_at: DateTime<Utc>,
}

impl EventCounter {
    #[must_use]
    pub fn first(now: DateTime<Utc>) -> Self {
        Self {
            count: 1,
            first_seen_at: now,
        }
    }
}

/// Alert raised by a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub rule_id: String,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub source_event_key: String,
    pub user_identity: Option<String>,
    pub source_address: Option<String>,
    pub event_count: u64,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub resolved: bool,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub(crate) fn raise(rule: &MonitoringRule, key: &EventKey, counter: EventCounter, now: DateTime<Utc>) -> Self {
        let actor = |value: &str| (value != UNKNOWN).then(|| value.to_string());

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            rule_id: rule.id.clone(),
            severity: rule.severity,
            title: format!("{} threshold exceeded", rule.name),
            message: format!(
                "{} {} events from user {} at {} within {} minutes (threshold {})",
                counter.count,
                key.event_type,
                key.user_identity,
                key.source_address,
                rule.time_window_minutes,
                rule.threshold
            ),
            source_event_key: key.to_string(),
            user_identity: actor(&key.user_identity),
            source_address: actor(&key.source_address),
            event_count: counter.count,
            timestamp: now,
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
            resolved: false,
            resolved_by: None,
            resolved_at: None,
        }
    }

    /// Returns `false` if the alert was already acknowledged
    pub(crate) fn acknowledge(&mut self, actor: &str, now: DateTime<Utc>) -> bool {
        if self.acknowledged {
            return false;
        }
        self.acknowledged = true;
        self.acknowledged_by = Some(actor.to_string());
        self.acknowledged_at = Some(now);
        true
    }

    /// Returns `false` if the alert was already resolved
    pub(crate) fn resolve(&mut self, actor: &str, now: DateTime<Utc>) -> bool {
        if self.resolved {
            return false;
        }
        self.resolved = true;
        self.resolved_by = Some(actor.to_string());
        self.resolved_at = Some(now);
        true
    }
}

/// Filter for alert listings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AlertQuery {
    pub severity: Option<Severity>,
    pub acknowledged: Option<bool>,
    pub resolved: Option<bool>,
    pub rule_id: Option<String>,
    pub limit: Option<usize>,
}

impl AlertQuery {
    pub(crate) fn matches(&self, alert: &Alert) -> bool {
        self.severity.is_none_or(|severity| alert.severity == severity)
            && self.acknowledged.is_none_or(|ack| alert.acknowledged == ack)
            && self.resolved.is_none_or(|resolved| alert.resolved == resolved)
            && self.rule_id.as_deref().is_none_or(|rule_id| alert.rule_id == rule_id)
    }
}

/// Engine-wide figures
#[derive(Debug, Clone, Default, Serialize)]
pub struct MonitoringStats {
    pub total_events: u64,
    pub active_counters: usize,
    pub total_alerts: usize,
    pub unacknowledged_alerts: usize,
    pub unresolved_alerts: usize,
    pub suppressed_alerts: u64,
    pub alerts_by_severity: HashMap<Severity, usize>,
}

/// What a cleanup pass removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub alerts_removed: usize,
    pub counters_removed: usize,
}
