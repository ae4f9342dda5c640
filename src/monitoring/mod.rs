//! Security Monitoring
//!
//! Threshold rules over counted security events, alert lifecycle
//! (acknowledge, resolve), and alert actions (log, persist, email, webhook, chat).

pub mod actions;
pub mod engine;
pub mod rules;
pub mod types;

pub use actions::{ActionDispatcher, ActionOutcome, ActionReport, AlertRecord, AlertStore, EmailMessage, EmailSender};
pub use engine::{MonitoringEngine, RaisedAlert};
pub use rules::{AlertAction, MonitoringRule, default_rules};
pub use types::{Alert, AlertQuery, CleanupReport, EventCounter, EventKey, MonitoringStats, SecurityEvent, Severity};
