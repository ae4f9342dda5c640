//! Monitoring rules

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::types::Severity;

/// Side effect executed when a rule raises an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertAction {
    Log,
    #[serde(alias = "database")]
    Persist,
    Email,
    Webhook,
    Slack,
}

impl AlertAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Persist => "persist",
            Self::Email => "email",
            Self::Webhook => "webhook",
            Self::Slack => "slack",
        }
    }
}

/// Threshold rule over one event type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringRule {
    pub id: String,
    pub name: String,
    pub event_type: String,
    /// Occurrences needed inside the window; zero never fires
    pub threshold: u64,
    pub time_window_minutes: i64,
    pub severity: Severity,
    pub actions: Vec<AlertAction>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Overrides the engine-wide cooldown
    #[serde(default)]
    pub cooldown_minutes: Option<i64>,
}

fn enabled_by_default() -> bool {
    true
}

impl MonitoringRule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        event_type: impl Into<String>,
        threshold: u64,
        time_window_minutes: i64,
        severity: Severity,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            event_type: event_type.into(),
            threshold,
            time_window_minutes,
            severity,
            actions: vec![AlertAction::Log],
            enabled: true,
            cooldown_minutes: None,
        }
    }

    #[must_use]
    pub fn with_actions(mut self, actions: &[AlertAction]) -> Self {
        self.actions = actions.to_vec();
        self
    }

    #[must_use]
    pub fn with_cooldown_minutes(mut self, minutes: i64) -> Self {
        self.cooldown_minutes = Some(minutes);
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether this rule evaluates events of `event_type`
    #[must_use]
    pub fn applies_to(&self, event_type: &str) -> bool {
        self.enabled && self.threshold > 0 && self.event_type == event_type
    }

    /// Counting window, clamped to `0..=MAX_RULE_MINUTES`
    #[must_use]
    pub fn time_window(&self) -> Duration {
        bounded_minutes(self.time_window_minutes)
    }

    /// This rule's cooldown, or `default` when it has no override
    #[must_use]
    pub fn cooldown(&self, default: Duration) -> Duration {
        self.cooldown_minutes.map_or(default, bounded_minutes)
    }
}

/// Upper bound for any rule window or cooldown: one year
pub const MAX_RULE_MINUTES: i64 = 366 * 24 * 60;

/// Minutes as a duration, clamped so out-of-range input cannot overflow
pub(crate) fn bounded_minutes(minutes: i64) -> Duration {
    Duration::minutes(minutes.clamp(0, MAX_RULE_MINUTES))
}

/// Rules installed in a fresh engine
#[must_use]
pub fn default_rules() -> Vec<MonitoringRule> {
    use AlertAction::{Email, Log, Persist, Slack, Webhook};

    vec![
        MonitoringRule::new(
            "failed_login_attempts",
            "Repeated failed logins",
            "failed_login",
            5,
            15,
            Severity::High,
        )
        .with_actions(&[Log, Persist, Email]),
        MonitoringRule::new(
            "rate_limit_abuse",
            "Rate limit exceeded repeatedly",
            "rate_limit_exceeded",
            5,
            15,
            Severity::Medium,
        )
        .with_actions(&[Log, Persist]),
        MonitoringRule::new(
            "csrf_violations",
            "CSRF token violations",
            "csrf_violation",
            3,
            10,
            Severity::High,
        )
        .with_actions(&[Log, Persist, Webhook]),
        MonitoringRule::new(
            "invalid_api_keys",
            "Invalid API key usage",
            "api_key_invalid",
            10,
            5,
            Severity::Medium,
        )
        .with_actions(&[Log, Persist]),
        MonitoringRule::new(
            "permission_denied_burst",
            "Repeated permission denials",
            "permission_denied",
            10,
            30,
            Severity::Low,
        )
        .with_actions(&[Log]),
        MonitoringRule::new(
            "suspicious_activity",
            "Suspicious activity detected",
            "suspicious_activity",
            1,
            5,
            Severity::Critical,
        )
        .with_actions(&[Log, Persist, Email, Webhook, Slack]),
    ]
}
