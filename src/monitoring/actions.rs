//! Alert Actions
//!
//! Executes the side effects a rule lists for an alert, in order. A failing
//! action is reported and logged; it never stops the remaining actions and
//! never rolls back the alert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::rules::AlertAction;
use super::types::{Alert, Severity};
use crate::config::MonitoringConfig;
use crate::error::ActionError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Row written by the persist action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRecord {
    pub id: String,
    pub alert_type: String,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub user_identity: Option<String>,
    pub source_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub acknowledged: bool,
    pub resolved: bool,
    pub metadata: serde_json::Value,
}

impl From<&Alert> for AlertRecord {
    fn from(alert: &Alert) -> Self {
        Self {
            id: alert.id.clone(),
            alert_type: alert.rule_id.clone(),
            severity: alert.severity,
            title: alert.title.clone(),
            message: alert.message.clone(),
            user_identity: alert.user_identity.clone(),
            source_address: alert.source_address.clone(),
            created_at: alert.timestamp,
            acknowledged: alert.acknowledged,
            resolved: alert.resolved,
            metadata: json!({
                "source_event_key": alert.source_event_key,
                "event_count": alert.event_count,
            }),
        }
    }
}

/// Durable alert storage
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn insert_alert(&self, record: &AlertRecord) -> anyhow::Result<()>;
}

/// Outgoing notification mail
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

/// Mail transport
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()>;
}

/// Result of one action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Delivered,
    /// Notification channel switched off in configuration
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub action: AlertAction,
    pub outcome: ActionOutcome,
}

/// Runs alert actions against the configured targets
pub struct ActionDispatcher {
    http: reqwest::Client,
    store: Option<Arc<dyn AlertStore>>,
    mailer: Option<Arc<dyn EmailSender>>,
    email_enabled: bool,
    webhook_enabled: bool,
    slack_enabled: bool,
    webhook_url: Option<String>,
    slack_webhook_url: Option<String>,
    recipients: Vec<String>,
}

impl ActionDispatcher {
    #[must_use]
    pub fn new(config: &MonitoringConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http,
            store: None,
            mailer: None,
            email_enabled: config.email_notifications,
            webhook_enabled: config.webhook_notifications,
            slack_enabled: config.slack_notifications,
            webhook_url: config.webhook_url.clone(),
            slack_webhook_url: config.slack_webhook_url.clone(),
            recipients: config.alert_emails.clone(),
        }
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn AlertStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_mailer(mut self, mailer: Arc<dyn EmailSender>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    /// Execute `actions` for `alert`, sequentially and independently
    pub async fn dispatch(&self, alert: &Alert, actions: &[AlertAction]) -> Vec<ActionReport> {
        let mut reports = Vec::with_capacity(actions.len());

        for &action in actions {
            let outcome = if self.is_enabled(action) {
                match self.execute(alert, action).await {
                    Ok(()) => ActionOutcome::Delivered,
                    Err(e) => {
                        error!(alert_id = %alert.id, action = action.as_str(), error = %e, "Alert action failed");
                        ActionOutcome::Failed(e.to_string())
                    }
                }
            } else {
                debug!(alert_id = %alert.id, action = action.as_str(), "Notification channel disabled");
                ActionOutcome::Skipped
            };
            reports.push(ActionReport { action, outcome });
        }

        reports
    }

    fn is_enabled(&self, action: AlertAction) -> bool {
        match action {
            AlertAction::Log | AlertAction::Persist => true,
            AlertAction::Email => self.email_enabled,
            AlertAction::Webhook => self.webhook_enabled,
            AlertAction::Slack => self.slack_enabled,
        }
    }

    async fn execute(&self, alert: &Alert, action: AlertAction) -> Result<(), ActionError> {
        match action {
            AlertAction::Log => {
                log_alert(alert);
                Ok(())
            }
            AlertAction::Persist => self.persist(alert).await,
            AlertAction::Email => self.email(alert).await,
            AlertAction::Webhook => {
                let url = self
                    .webhook_url
                    .as_deref()
                    .ok_or(ActionError::NotConfigured { action: "webhook" })?;
                let body = serde_json::to_value(alert).map_err(|e| ActionError::Delivery {
                    action: "webhook",
                    source: e.into(),
                })?;
                self.post_json("webhook", url, &body).await
            }
            AlertAction::Slack => {
                let url = self
                    .slack_webhook_url
                    .as_deref()
                    .ok_or(ActionError::NotConfigured { action: "slack" })?;
                self.post_json("slack", url, &slack_payload(alert)).await
            }
        }
    }

    async fn persist(&self, alert: &Alert) -> Result<(), ActionError> {
        let store = self
            .store
            .as_ref()
            .ok_or(ActionError::NotConfigured { action: "persist" })?;

        store
            .insert_alert(&AlertRecord::from(alert))
            .await
            .map_err(|source| ActionError::Delivery {
                action: "persist",
                source,
            })
    }

    async fn email(&self, alert: &Alert) -> Result<(), ActionError> {
        let mailer = self
            .mailer
            .as_ref()
            .ok_or(ActionError::NotConfigured { action: "email" })?;
        if self.recipients.is_empty() {
            return Err(ActionError::NotConfigured { action: "email" });
        }

        let message = EmailMessage {
            to: self.recipients.clone(),
            subject: format!("[{}] {}", alert.severity.as_str().to_uppercase(), alert.title),
            body: format!(
                "{}\n\nRule: {}\nUser: {}\nSource: {}\nTime: {}\nAlert ID: {}",
                alert.message,
                alert.rule_id,
                alert.user_identity.as_deref().unwrap_or("unknown"),
                alert.source_address.as_deref().unwrap_or("unknown"),
                alert.timestamp.to_rfc3339(),
                alert.id
            ),
        };

        mailer
            .send(&message)
            .await
            .map_err(|source| ActionError::Delivery { action: "email", source })
    }

    async fn post_json(&self, action: &'static str, url: &str, body: &serde_json::Value) -> Result<(), ActionError> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ActionError::Delivery {
                action,
                source: e.into(),
            })?;

        let status = response.status();
        if status.is_success() {
            info!(action = action, status = status.as_u16(), "Alert notification delivered");
            Ok(())
        } else {
            Err(ActionError::HttpStatus {
                action,
                status: status.as_u16(),
            })
        }
    }
}

/// Log at a level matching the severity
fn log_alert(alert: &Alert) {
    match alert.severity {
        Severity::Critical | Severity::High => error!(
            alert_id = %alert.id,
            rule_id = %alert.rule_id,
            severity = %alert.severity,
            source = %alert.source_event_key,
            "{}",
            alert.message
        ),
        Severity::Medium => warn!(
            alert_id = %alert.id,
            rule_id = %alert.rule_id,
            severity = %alert.severity,
            source = %alert.source_event_key,
            "{}",
            alert.message
        ),
        Severity::Low => info!(
            alert_id = %alert.id,
            rule_id = %alert.rule_id,
            severity = %alert.severity,
            source = %alert.source_event_key,
            "{}",
            alert.message
        ),
    }
}

/// Chat message with a single attachment coloured by severity
fn slack_payload(alert: &Alert) -> serde_json::Value {
    json!({
        "text": format!("Security alert: {}", alert.title),
        "attachments": [{
            "color": alert.severity.color(),
            "fields": [
                { "title": "Severity", "value": alert.severity.as_str().to_uppercase(), "short": true },
                { "title": "Rule", "value": alert.rule_id, "short": true },
                { "title": "User", "value": alert.user_identity.as_deref().unwrap_or("unknown"), "short": true },
                { "title": "Source", "value": alert.source_address.as_deref().unwrap_or("unknown"), "short": true },
                { "title": "Message", "value": alert.message, "short": false },
            ],
            "ts": alert.timestamp.timestamp(),
        }],
    })
}
