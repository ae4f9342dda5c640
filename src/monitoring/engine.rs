//! Monitoring Engine
//!
//! Counts security events per [`EventKey`], evaluates threshold rules on every
//! event and raises alerts subject to a per-(rule, key) cooldown.
//!
//! All mutable state sits behind one mutex, so counting an event and deciding
//! whether it raises an alert is a single atomic step even under concurrent
//! callers. Actions run after the lock is released.

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::actions::{ActionDispatcher, ActionReport};
use super::rules::{AlertAction, MonitoringRule, default_rules};
use super::types::{Alert, AlertQuery, CleanupReport, EventCounter, EventKey, MonitoringStats, SecurityEvent, Severity};
use crate::clock::{Clock, SystemClock};
use crate::config::MonitoringConfig;
use crate::error::MonitoringError;

/// Staleness window for event counters: cleanup drops older ones, and counters
/// with no matching rule restart after it
fn idle_counter_window() -> Duration {
    Duration::hours(1)
}

const SYSTEM_ACTOR: &str = "system";

#[derive(Default)]
struct EngineState {
    counters: HashMap<EventKey, EventCounter>,
    /// Newest first
    alerts: VecDeque<Alert>,
    last_alert_at: HashMap<(String, EventKey), DateTime<Utc>>,
}

/// An alert together with what its actions did
#[derive(Debug, Clone)]
pub struct RaisedAlert {
    pub alert: Alert,
    pub actions: Vec<ActionReport>,
}

/// Threshold-based alerting over security events
pub struct MonitoringEngine {
    config: MonitoringConfig,
    clock: Arc<dyn Clock>,
    rules: RwLock<Vec<MonitoringRule>>,
    state: Mutex<EngineState>,
    dispatcher: ActionDispatcher,
    total_events: AtomicU64,
    suppressed_alerts: AtomicU64,
    shutdown_tx: broadcast::Sender<()>,
}

impl MonitoringEngine {
    /// Engine with the default rule set and the system clock
    #[must_use]
    pub fn new(config: MonitoringConfig) -> Self {
        let dispatcher = ActionDispatcher::new(&config);
        Self::with_parts(config, Arc::new(SystemClock), dispatcher, default_rules())
    }

    #[must_use]
    pub fn with_parts(
        config: MonitoringConfig,
        clock: Arc<dyn Clock>,
        dispatcher: ActionDispatcher,
        rules: Vec<MonitoringRule>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        info!(
            enabled = config.enabled,
            rules = rules.len(),
            cooldown_minutes = config.alert_cooldown_minutes,
            "Monitoring engine initialized"
        );

        Self {
            config,
            clock,
            rules: RwLock::new(rules),
            state: Mutex::new(EngineState::default()),
            dispatcher,
            total_events: AtomicU64::new(0),
            suppressed_alerts: AtomicU64::new(0),
            shutdown_tx,
        }
    }

    #[must_use]
    pub fn config(&self) -> &MonitoringConfig {
        &self.config
    }

    /// Count an event and raise whatever alerts it triggers
    ///
    /// An alert is raised for every enabled rule on this event type whose
    /// threshold is reached inside its window, unless the same rule already
    /// alerted for the same key within the cooldown.
    pub async fn record_event(&self, event: SecurityEvent) -> Vec<RaisedAlert> {
        if !self.config.enabled {
            return Vec::new();
        }

        let now = self.clock.now();
        let key = EventKey::from_event(&event);
        let matching: Vec<MonitoringRule> = self
            .rules
            .read()
            .iter()
            .filter(|rule| rule.applies_to(&key.event_type))
            .cloned()
            .collect();

        self.total_events.fetch_add(1, Ordering::Relaxed);
        let raised = self.evaluate(&key, &matching, now);

        let mut results = Vec::with_capacity(raised.len());
        for (alert, actions) in raised {
            let reports = self.dispatcher.dispatch(&alert, &actions).await;
            results.push(RaisedAlert { alert, actions: reports });
        }
        results
    }

    fn evaluate(
        &self,
        key: &EventKey,
        matching: &[MonitoringRule],
        now: DateTime<Utc>,
    ) -> Vec<(Alert, Vec<AlertAction>)> {
        let horizon = matching
            .iter()
            .map(MonitoringRule::time_window)
            .max()
            .unwrap_or_else(idle_counter_window);

        let mut state = self.state.lock();

        let counter = *state
            .counters
            .entry(key.clone())
            .and_modify(|counter| {
                if now - counter.first_seen_at > horizon {
                    *counter = EventCounter::first(now);
                } else {
                    counter.count += 1;
                }
            })
            .or_insert_with(|| EventCounter::first(now));

        debug!(key = %key, count = counter.count, "Security event recorded");

        let mut raised = Vec::new();
        for rule in matching {
            if now - counter.first_seen_at > rule.time_window() || counter.count < rule.threshold {
                continue;
            }

            let cooldown_key = (rule.id.clone(), key.clone());
            if let Some(last) = state.last_alert_at.get(&cooldown_key) {
                if now - *last < rule.cooldown(self.config.alert_cooldown()) {
                    debug!(rule_id = %rule.id, key = %key, "Alert suppressed by cooldown");
                    continue;
                }
            }

            let last_hour = state
                .alerts
                .iter()
                .take_while(|alert| now - alert.timestamp < Duration::hours(1))
                .count();
            if last_hour >= self.config.max_alerts_per_hour {
                self.suppressed_alerts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    rule_id = %rule.id,
                    limit = self.config.max_alerts_per_hour,
                    "Hourly alert limit reached, alert dropped"
                );
                continue;
            }

            let mut alert = Alert::raise(rule, key, counter, now);
            if self.config.auto_acknowledge_low_severity && alert.severity == Severity::Low {
                alert.acknowledge(SYSTEM_ACTOR, now);
            }

            info!(
                alert_id = %alert.id,
                rule_id = %rule.id,
                severity = %alert.severity,
                count = counter.count,
                "Alert raised"
            );

            state.last_alert_at.insert(cooldown_key, now);
            state.alerts.push_front(alert.clone());
            raised.push((alert, rule.actions.clone()));
        }

        raised
    }

    /// Alerts matching `query`, newest first
    #[must_use]
    pub fn alerts(&self, query: &AlertQuery) -> Vec<Alert> {
        let state = self.state.lock();
        state
            .alerts
            .iter()
            .filter(|alert| query.matches(alert))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn alert(&self, alert_id: &str) -> Option<Alert> {
        self.state.lock().alerts.iter().find(|alert| alert.id == alert_id).cloned()
    }

    /// Mark an alert acknowledged; repeating it leaves the first acknowledgement
    ///
    /// # Errors
    ///
    /// Returns an error if `actor` is blank or no alert has `alert_id`.
    pub fn acknowledge_alert(&self, alert_id: &str, actor: &str) -> Result<Alert, MonitoringError> {
        self.update_alert(alert_id, actor, |alert, actor, now| {
            if alert.acknowledge(actor, now) {
                info!(alert_id = %alert.id, actor = %actor, "Alert acknowledged");
            }
        })
    }

    /// Mark an alert resolved; repeating it leaves the first resolution
    ///
    /// # Errors
    ///
    /// Returns an error if `actor` is blank or no alert has `alert_id`.
    pub fn resolve_alert(&self, alert_id: &str, actor: &str) -> Result<Alert, MonitoringError> {
        self.update_alert(alert_id, actor, |alert, actor, now| {
            if alert.resolve(actor, now) {
                info!(alert_id = %alert.id, actor = %actor, "Alert resolved");
            }
        })
    }

    fn update_alert<F>(&self, alert_id: &str, actor: &str, update: F) -> Result<Alert, MonitoringError>
    where
        F: FnOnce(&mut Alert, &str, DateTime<Utc>),
    {
        let actor = actor.trim();
        if actor.is_empty() {
            return Err(MonitoringError::MissingActor);
        }

        let now = self.clock.now();
        let mut state = self.state.lock();
        let alert = state
            .alerts
            .iter_mut()
            .find(|alert| alert.id == alert_id)
            .ok_or_else(|| MonitoringError::AlertNotFound(alert_id.to_string()))?;

        update(alert, actor, now);
        Ok(alert.clone())
    }

    #[must_use]
    pub fn rules(&self) -> Vec<MonitoringRule> {
        self.rules.read().clone()
    }

    /// # Errors
    ///
    /// Returns [`MonitoringError::DuplicateRule`] if the id is taken.
    pub fn add_rule(&self, rule: MonitoringRule) -> Result<(), MonitoringError> {
        let mut rules = self.rules.write();
        if rules.iter().any(|existing| existing.id == rule.id) {
            return Err(MonitoringError::DuplicateRule(rule.id));
        }
        info!(rule_id = %rule.id, event_type = %rule.event_type, "Monitoring rule added");
        rules.push(rule);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`MonitoringError::RuleNotFound`] for an unknown id.
    pub fn remove_rule(&self, rule_id: &str) -> Result<MonitoringRule, MonitoringError> {
        let mut rules = self.rules.write();
        let index = rules
            .iter()
            .position(|rule| rule.id == rule_id)
            .ok_or_else(|| MonitoringError::RuleNotFound(rule_id.to_string()))?;
        info!(rule_id = %rule_id, "Monitoring rule removed");
        Ok(rules.remove(index))
    }

    /// # Errors
    ///
    /// Returns [`MonitoringError::RuleNotFound`] for an unknown id.
    pub fn set_rule_enabled(&self, rule_id: &str, enabled: bool) -> Result<(), MonitoringError> {
        let mut rules = self.rules.write();
        let rule = rules
            .iter_mut()
            .find(|rule| rule.id == rule_id)
            .ok_or_else(|| MonitoringError::RuleNotFound(rule_id.to_string()))?;
        rule.enabled = enabled;
        info!(rule_id = %rule_id, enabled = enabled, "Monitoring rule toggled");
        Ok(())
    }

    #[must_use]
    pub fn stats(&self) -> MonitoringStats {
        let state = self.state.lock();

        let mut alerts_by_severity = HashMap::new();
        for alert in &state.alerts {
            *alerts_by_severity.entry(alert.severity).or_insert(0) += 1;
        }

        MonitoringStats {
            total_events: self.total_events.load(Ordering::Relaxed),
            active_counters: state.counters.len(),
            total_alerts: state.alerts.len(),
            unacknowledged_alerts: state.alerts.iter().filter(|a| !a.acknowledged).count(),
            unresolved_alerts: state.alerts.iter().filter(|a| !a.resolved).count(),
            suppressed_alerts: self.suppressed_alerts.load(Ordering::Relaxed),
            alerts_by_severity,
        }
    }

    /// Drop alerts past retention, counters older than the staleness window,
    /// and cooldown marks that can no longer suppress anything
    pub fn cleanup(&self) -> CleanupReport {
        let now = self.clock.now();
        let retention = self.config.alert_retention();
        let staleness = idle_counter_window();
        let cooldown_horizon = self
            .rules
            .read()
            .iter()
            .map(|rule| rule.cooldown(self.config.alert_cooldown()))
            .chain(std::iter::once(self.config.alert_cooldown()))
            .max()
            .unwrap_or_else(idle_counter_window);

        let mut state = self.state.lock();

        let alerts_before = state.alerts.len();
        state.alerts.retain(|alert| now - alert.timestamp <= retention);

        let counters_before = state.counters.len();
        state
            .counters
            .retain(|_, counter| now - counter.first_seen_at <= staleness);

        state.last_alert_at.retain(|_, at| now - *at < cooldown_horizon);

        let report = CleanupReport {
            alerts_removed: alerts_before - state.alerts.len(),
            counters_removed: counters_before - state.counters.len(),
        };

        if report.alerts_removed > 0 || report.counters_removed > 0 {
            info!(
                alerts_removed = report.alerts_removed,
                counters_removed = report.counters_removed,
                "Monitoring cleanup completed"
            );
        }
        report
    }

    /// Run [`cleanup`](Self::cleanup) every `cleanup_interval_secs` until
    /// [`shutdown`](Self::shutdown) or until the engine is dropped
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> JoinHandle<()> {
        let engine: Weak<Self> = Arc::downgrade(self);
        let interval = std::time::Duration::from_secs(self.config.cleanup_interval_secs.max(1));
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "Monitoring cleanup task started");

            loop {
                tokio::select! {
                    () = tokio::time::sleep(interval) => {
                        let Some(engine) = engine.upgrade() else {
                            break;
                        };
                        engine.cleanup();
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Monitoring cleanup task shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Signal background tasks to stop
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
