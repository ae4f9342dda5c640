//! Configuration
//!
//! Environment-style configuration with compiled-in defaults. Every struct also
//! derives `Deserialize` so a host application can load it from its own files.
//!
//! The cache category table is not configured here: it is compiled in
//! (see [`CacheStrategy`](crate::cache_strategy::CacheStrategy)) and only changes
//! through `CacheStrategy::update_category`.

use serde::Deserialize;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::monitoring::rules::{MAX_RULE_MINUTES, bounded_minutes};

/// Longest alert retention accepted: ten years
pub const MAX_RETENTION_DAYS: i64 = 3650;

/// Settings for the key-value store adapter
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KvStoreConfig {
    /// Redis connection string; `None` selects the in-memory backend
    pub redis_url: Option<String>,
    /// Timeout for establishing the backing connection
    pub connect_timeout_secs: u64,
    /// Timeout imposed by cache-aside reads on a single cache lookup
    pub lookup_timeout_ms: u64,
}

impl Default for KvStoreConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            connect_timeout_secs: 10,
            lookup_timeout_ms: 2000,
        }
    }
}

impl KvStoreConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

/// Settings for the monitoring / alert engine
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub alert_retention_days: i64,
    pub max_alerts_per_hour: usize,
    pub email_notifications: bool,
    pub webhook_notifications: bool,
    pub slack_notifications: bool,
    pub auto_acknowledge_low_severity: bool,
    pub alert_cooldown_minutes: i64,
    pub webhook_url: Option<String>,
    pub slack_webhook_url: Option<String>,
    pub alert_emails: Vec<String>,
    pub cleanup_interval_secs: u64,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            alert_retention_days: 30,
            max_alerts_per_hour: 100,
            email_notifications: false,
            webhook_notifications: false,
            slack_notifications: false,
            auto_acknowledge_low_severity: false,
            alert_cooldown_minutes: 5,
            webhook_url: None,
            slack_webhook_url: None,
            alert_emails: Vec::new(),
            cleanup_interval_secs: 3600,
        }
    }
}

impl MonitoringConfig {
    /// Engine-wide cooldown, clamped like rule cooldowns
    #[must_use]
    pub fn alert_cooldown(&self) -> chrono::Duration {
        bounded_minutes(self.alert_cooldown_minutes)
    }

    /// Alert retention, clamped to `0..=MAX_RETENTION_DAYS`
    #[must_use]
    pub fn alert_retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.alert_retention_days.clamp(0, MAX_RETENTION_DAYS))
    }
}

/// Top-level configuration for a [`WorkhubContext`](crate::WorkhubContext)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub kv: KvStoreConfig,
    pub monitoring: MonitoringConfig,
}

impl CoreConfig {
    /// Build configuration from environment variables
    ///
    /// Unset variables keep their defaults. Variables that are set but cannot be
    /// parsed are logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key/value lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let kv_defaults = KvStoreConfig::default();
        let mon = MonitoringConfig::default();

        let kv = KvStoreConfig {
            redis_url: lookup("REDIS_URL").filter(|url| !url.trim().is_empty()),
            connect_timeout_secs: parse_or(&lookup, "CACHE_CONNECT_TIMEOUT_SECS", kv_defaults.connect_timeout_secs),
            lookup_timeout_ms: parse_or(&lookup, "CACHE_LOOKUP_TIMEOUT_MS", kv_defaults.lookup_timeout_ms),
        };

        let monitoring = MonitoringConfig {
            enabled: parse_or(&lookup, "MONITORING_ENABLED", mon.enabled),
            alert_retention_days: parse_in_range(
                &lookup,
                "MONITORING_ALERT_RETENTION_DAYS",
                mon.alert_retention_days,
                1..=MAX_RETENTION_DAYS,
            ),
            max_alerts_per_hour: parse_or(&lookup, "MONITORING_MAX_ALERTS_PER_HOUR", mon.max_alerts_per_hour),
            email_notifications: parse_or(&lookup, "MONITORING_EMAIL_NOTIFICATIONS", mon.email_notifications),
            webhook_notifications: parse_or(&lookup, "MONITORING_WEBHOOK_NOTIFICATIONS", mon.webhook_notifications),
            slack_notifications: parse_or(&lookup, "MONITORING_SLACK_NOTIFICATIONS", mon.slack_notifications),
            auto_acknowledge_low_severity: parse_or(
                &lookup,
                "MONITORING_AUTO_ACK_LOW_SEVERITY",
                mon.auto_acknowledge_low_severity,
            ),
            alert_cooldown_minutes: parse_in_range(
                &lookup,
                "MONITORING_ALERT_COOLDOWN_MINUTES",
                mon.alert_cooldown_minutes,
                0..=MAX_RULE_MINUTES,
            ),
            webhook_url: lookup("MONITORING_WEBHOOK_URL").filter(|url| !url.trim().is_empty()),
            slack_webhook_url: lookup("MONITORING_SLACK_WEBHOOK_URL").filter(|url| !url.trim().is_empty()),
            alert_emails: lookup("MONITORING_ALERT_EMAILS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|email| !email.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            cleanup_interval_secs: parse_or(&lookup, "MONITORING_CLEANUP_INTERVAL_SECS", mon.cleanup_interval_secs),
        };

        Self { kv, monitoring }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key = %key, value = %raw, "Ignoring unparseable configuration value");
            default
        }),
        None => default,
    }
}

fn parse_in_range<F>(lookup: &F, key: &str, default: i64, range: RangeInclusive<i64>) -> i64
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default);
    if range.contains(&value) {
        value
    } else {
        warn!(
            key = %key,
            value = value,
            min = *range.start(),
            max = *range.end(),
            "Ignoring out-of-range configuration value"
        );
        default
    }
}
