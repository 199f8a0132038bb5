//! Deduplicated, severity-classified alert registry.
//!
//! Alerts are identified by a stable hash of `{Type, Session, Pane, BeadID}`
//! — the same mechanism the classifier's scheduler uses for pane-content
//! hashing — so repeated raises of the same condition coalesce into one
//! record instead of piling up, and a later `resolve` can find it again
//! without a database.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

/// How long a resolved alert is retained before being pruned.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Identity of an alert condition. Two raises with the same key coalesce
/// into one record; `bead_id`/`pane` are `None` when the condition isn't
/// scoped to one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertKey {
    pub alert_type: String,
    pub session: String,
    pub pane: Option<String>,
    pub bead_id: Option<String>,
}

impl AlertKey {
    pub fn new(alert_type: impl Into<String>, session: impl Into<String>) -> Self {
        Self {
            alert_type: alert_type.into(),
            session: session.into(),
            pane: None,
            bead_id: None,
        }
    }

    pub fn with_pane(mut self, pane: impl Into<String>) -> Self {
        self.pane = Some(pane.into());
        self
    }

    pub fn with_bead_id(mut self, bead_id: impl Into<String>) -> Self {
        self.bead_id = Some(bead_id.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    pub alert_type: String,
    pub session: String,
    pub pane: Option<String>,
    pub bead_id: Option<String>,
    pub severity: Severity,
    pub message: String,
    pub context: HashMap<String, String>,
    pub first_seen: SystemTime,
    pub last_seen: SystemTime,
    pub count: u32,
    pub resolved_at: Option<SystemTime>,
}

impl Alert {
    pub fn is_active(&self) -> bool {
        self.resolved_at.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SeveritySummary {
    pub info: u32,
    pub warning: u32,
    pub critical: u32,
}

/// Spec §4.7 summary: total active count, broken down by severity and by
/// alert type. `TotalActive == Σ BySeverity[v] == Σ ByType[t]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertSummary {
    pub total_active: u32,
    pub by_severity: SeveritySummary,
    pub by_type: HashMap<String, u32>,
}

pub struct AlertTracker {
    alerts: HashMap<u64, Alert>,
    retention: Duration,
}

fn alert_id(key: &AlertKey) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

impl AlertTracker {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    pub fn with_retention(retention: Duration) -> Self {
        Self {
            alerts: HashMap::new(),
            retention,
        }
    }

    /// Raise (or re-raise, or escalate) an alert. Raising an alert that's
    /// currently resolved reopens it. Raising one already active bumps
    /// `last_seen`/`count` and escalates severity if the new raise is more
    /// severe, but never downgrades it — resolve explicitly to clear.
    pub fn raise(&mut self, key: AlertKey, severity: Severity, message: &str, now: SystemTime) -> u64 {
        self.raise_with_context(key, severity, message, HashMap::new(), now)
    }

    pub fn raise_with_context(
        &mut self,
        key: AlertKey,
        severity: Severity,
        message: &str,
        context: HashMap<String, String>,
        now: SystemTime,
    ) -> u64 {
        let id = alert_id(&key);
        self.alerts
            .entry(id)
            .and_modify(|alert| {
                alert.last_seen = now;
                alert.count += 1;
                alert.resolved_at = None;
                alert.message = message.to_string();
                if severity > alert.severity {
                    alert.severity = severity;
                }
            })
            .or_insert_with(|| Alert {
                id,
                alert_type: key.alert_type,
                session: key.session,
                pane: key.pane,
                bead_id: key.bead_id,
                severity,
                message: message.to_string(),
                context,
                first_seen: now,
                last_seen: now,
                count: 1,
                resolved_at: None,
            });
        id
    }

    pub fn resolve(&mut self, key: &AlertKey, now: SystemTime) {
        let id = alert_id(key);
        if let Some(alert) = self.alerts.get_mut(&id) {
            alert.resolved_at = Some(now);
        }
    }

    pub fn active(&self) -> Vec<&Alert> {
        let mut alerts: Vec<&Alert> = self.alerts.values().filter(|a| a.is_active()).collect();
        alerts.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.first_seen.cmp(&b.first_seen)));
        alerts
    }

    pub fn summary(&self) -> AlertSummary {
        let mut summary = AlertSummary::default();
        for alert in self.active() {
            summary.total_active += 1;
            match alert.severity {
                Severity::Info => summary.by_severity.info += 1,
                Severity::Warning => summary.by_severity.warning += 1,
                Severity::Critical => summary.by_severity.critical += 1,
            }
            *summary.by_type.entry(alert.alert_type.clone()).or_insert(0) += 1;
        }
        summary
    }

    /// Drop resolved alerts past the retention window.
    pub fn prune(&mut self, now: SystemTime) {
        self.alerts.retain(|_, alert| match alert.resolved_at {
            None => true,
            Some(resolved_at) => now.duration_since(resolved_at).map(|d| d < self.retention).unwrap_or(true),
        });
    }
}

impl Default for AlertTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(alert_type: &str, pane: &str) -> AlertKey {
        AlertKey::new(alert_type, "demo").with_pane(pane)
    }

    #[test]
    fn duplicate_raises_coalesce_and_count_occurrences() {
        let now = SystemTime::now();
        let mut tracker = AlertTracker::new();
        tracker.raise(key("stalled", "%1"), Severity::Warning, "rate limited", now);
        tracker.raise(key("stalled", "%1"), Severity::Warning, "rate limited", now);
        assert_eq!(tracker.active().len(), 1);
        assert_eq!(tracker.active()[0].count, 2);
    }

    #[test]
    fn raise_escalates_but_never_downgrades() {
        let now = SystemTime::now();
        let mut tracker = AlertTracker::new();
        tracker.raise(key("stalled", "%1"), Severity::Warning, "stalled", now);
        tracker.raise(key("stalled", "%1"), Severity::Critical, "stalled", now);
        assert_eq!(tracker.active()[0].severity, Severity::Critical);
        tracker.raise(key("stalled", "%1"), Severity::Info, "stalled", now);
        assert_eq!(tracker.active()[0].severity, Severity::Critical);
    }

    #[test]
    fn resolve_removes_from_active_and_summary() {
        let now = SystemTime::now();
        let mut tracker = AlertTracker::new();
        tracker.raise(key("error", "%1"), Severity::Critical, "error", now);
        tracker.resolve(&key("error", "%1"), now);
        assert!(tracker.active().is_empty());
        assert_eq!(tracker.summary().total_active, 0);
        assert_eq!(tracker.summary().by_severity.critical, 0);
    }

    #[test]
    fn reraising_resolved_alert_reopens_it() {
        let now = SystemTime::now();
        let mut tracker = AlertTracker::new();
        tracker.raise(key("stalled", "%1"), Severity::Warning, "stalled", now);
        tracker.resolve(&key("stalled", "%1"), now);
        tracker.raise(key("stalled", "%1"), Severity::Warning, "stalled", now);
        assert_eq!(tracker.active().len(), 1);
    }

    #[test]
    fn prune_drops_old_resolved_alerts_but_keeps_recent_ones() {
        let now = SystemTime::now();
        let mut tracker = AlertTracker::with_retention(Duration::from_secs(60));
        tracker.raise(key("old", "%1"), Severity::Info, "old", now);
        tracker.resolve(&key("old", "%1"), now);

        let later = now + Duration::from_secs(120);
        tracker.raise(key("recent", "%2"), Severity::Info, "recent", later);
        tracker.resolve(&key("recent", "%2"), later);

        tracker.prune(later);
        assert_eq!(tracker.alerts.len(), 1);
        assert!(tracker.alerts.contains_key(&alert_id(&key("recent", "%2"))));
    }

    #[test]
    fn summary_totals_match_severity_and_type_breakdowns() {
        let now = SystemTime::now();
        let mut tracker = AlertTracker::new();
        tracker.raise(key("stalled", "%1"), Severity::Warning, "stalled", now);
        tracker.raise(key("error", "%2"), Severity::Critical, "boom", now);
        tracker.raise(key("stalled", "%3"), Severity::Warning, "stalled", now);

        let summary = tracker.summary();
        assert_eq!(summary.total_active, 3);
        let by_severity_sum = summary.by_severity.info + summary.by_severity.warning + summary.by_severity.critical;
        assert_eq!(summary.total_active, by_severity_sum);
        assert_eq!(summary.by_type["stalled"], 2);
        assert_eq!(summary.by_type["error"], 1);
    }
}
