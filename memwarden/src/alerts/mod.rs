//! Notification System
//!
//! Alert creation, deduplication, acknowledgment and auto-resolution. Alerts
//! live in a concurrent keyed map so the GUI can acknowledge them while a
//! monitoring tick is running.

use crate::events::{EventBus, MemoryEvent};
use crate::models::{AlertLevel, MemoryAlert, RemediationAction, ResourceCategory};
use dashmap::DashMap;
use tracing::{debug, warn};

/// Active alert store with (level, category) deduplication.
#[derive(Debug)]
pub struct AlertCenter {
    alerts: DashMap<String, MemoryAlert>,
    events: EventBus,
}

impl AlertCenter {
    /// Create an alert center publishing to the given event bus.
    pub fn new(events: EventBus) -> Self {
        Self {
            alerts: DashMap::new(),
            events,
        }
    }

    /// Create an alert, or refresh the existing one for the same pair.
    ///
    /// At most one *unacknowledged* alert exists per (level, category): a
    /// re-trigger updates that record in place (message, timestamp, actions)
    /// instead of duplicating it, and is not re-announced on the event bus.
    pub fn create_alert(
        &self,
        level: AlertLevel,
        category: ResourceCategory,
        title: impl Into<String>,
        message: impl Into<String>,
        actions: Vec<RemediationAction>,
        auto_resolve: bool,
    ) -> MemoryAlert {
        let title = title.into();
        let message = message.into();

        for mut entry in self.alerts.iter_mut() {
            if entry.level == level && entry.category == category && !entry.acknowledged {
                entry.title = title;
                entry.message = message;
                entry.actions = actions;
                entry.auto_resolve = auto_resolve;
                entry.timestamp = chrono::Utc::now();
                debug!(alert_id = %entry.id, %level, %category, "refreshed existing alert");
                return entry.clone();
            }
        }

        let alert = MemoryAlert::new(level, category, title, message)
            .with_actions(actions)
            .with_auto_resolve(auto_resolve);
        self.alerts.insert(alert.id.clone(), alert.clone());
        debug!(alert_id = %alert.id, %level, %category, "created alert");
        self.events.publish(MemoryEvent::AlertCreated {
            alert: alert.clone(),
        });
        alert
    }

    /// Acknowledge an alert. Unknown ids return `false`, never an error.
    pub fn acknowledge_alert(&self, alert_id: &str) -> bool {
        match self.alerts.get_mut(alert_id) {
            Some(mut alert) => {
                alert.acknowledged = true;
                true
            }
            None => false,
        }
    }

    /// Remove auto-resolving alerts for a cleared (level, category) pair.
    ///
    /// Alerts without `auto_resolve` persist until explicitly dismissed,
    /// acknowledged or not. Returns the number of alerts removed.
    pub fn resolve_cleared(&self, level: AlertLevel, category: ResourceCategory) -> usize {
        let before = self.alerts.len();
        self.alerts
            .retain(|_, alert| !(alert.level == level && alert.category == category && alert.auto_resolve));
        let removed = before - self.alerts.len();
        if removed > 0 {
            debug!(%level, %category, removed, "auto-resolved alerts");
        }
        removed
    }

    /// Remove an alert regardless of its auto-resolve flag.
    pub fn dismiss_alert(&self, alert_id: &str) -> bool {
        self.alerts.remove(alert_id).is_some()
    }

    /// All unresolved alerts, newest first.
    pub fn active_alerts(&self) -> Vec<MemoryAlert> {
        let mut alerts: Vec<MemoryAlert> =
            self.alerts.iter().map(|entry| entry.clone()).collect();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        alerts
    }

    /// Execute a remediation action's callback, best-effort.
    ///
    /// A handler failure is caught and surfaced as a new informational alert
    /// rather than propagated. Returns whether the handler ran successfully.
    pub async fn run_action(&self, alert_id: &str, action_id: &str) -> bool {
        // Clone out of the map before awaiting or creating alerts, so no
        // shard guard is held across either.
        let (handler, category) = {
            let Some(alert) = self.alerts.get(alert_id) else {
                debug!(alert_id, "run_action on unknown alert");
                return false;
            };
            let Some(action) = alert.actions.iter().find(|a| a.id == action_id) else {
                debug!(alert_id, action_id, "run_action on unknown action");
                return false;
            };
            match &action.handler {
                Some(handler) => (handler.clone(), alert.category),
                None => {
                    debug!(alert_id, action_id, "action has no handler");
                    return false;
                }
            }
        };

        match handler.run().await {
            Ok(()) => true,
            Err(reason) => {
                warn!(alert_id, action_id, %reason, "remediation action failed");
                self.create_alert(
                    AlertLevel::Info,
                    category,
                    "Remediation action failed",
                    format!("Action '{}' did not complete: {}", action_id, reason),
                    Vec::new(),
                    true,
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RemediationHandler;
    use async_trait::async_trait;
    use std::sync::Arc;

    fn center() -> AlertCenter {
        AlertCenter::new(EventBus::new(16))
    }

    #[test]
    fn test_dedup_updates_in_place() {
        let center = center();
        let first = center.create_alert(
            AlertLevel::Warning,
            ResourceCategory::System,
            "High memory usage",
            "usage at 76%",
            vec![],
            true,
        );
        let second = center.create_alert(
            AlertLevel::Warning,
            ResourceCategory::System,
            "High memory usage",
            "usage at 79%",
            vec![],
            true,
        );

        assert_eq!(first.id, second.id);
        assert_eq!(center.active_alerts().len(), 1);
        assert_eq!(center.active_alerts()[0].message, "usage at 79%");
    }

    #[test]
    fn test_acknowledged_alert_is_not_dedup_target() {
        let center = center();
        let first = center.create_alert(
            AlertLevel::Warning,
            ResourceCategory::System,
            "High memory usage",
            "usage at 76%",
            vec![],
            true,
        );
        assert!(center.acknowledge_alert(&first.id));

        let second = center.create_alert(
            AlertLevel::Warning,
            ResourceCategory::System,
            "High memory usage",
            "usage at 78%",
            vec![],
            true,
        );

        assert_ne!(first.id, second.id);
        assert_eq!(center.active_alerts().len(), 2);
    }

    #[test]
    fn test_acknowledge_unknown_returns_false() {
        let center = center();
        assert!(!center.acknowledge_alert("unknown"));
    }

    #[test]
    fn test_resolve_cleared_removes_only_auto_resolve() {
        let center = center();
        center.create_alert(
            AlertLevel::Warning,
            ResourceCategory::System,
            "auto",
            "resolves on clear",
            vec![],
            true,
        );
        let manual = center.create_alert(
            AlertLevel::Warning,
            ResourceCategory::Gpu,
            "manual",
            "persists",
            vec![],
            false,
        );

        // Different category: untouched
        assert_eq!(
            center.resolve_cleared(AlertLevel::Warning, ResourceCategory::Gpu),
            0
        );
        assert_eq!(
            center.resolve_cleared(AlertLevel::Warning, ResourceCategory::System),
            1
        );
        let remaining = center.active_alerts();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, manual.id);
    }

    #[derive(Debug)]
    struct FailingHandler;

    #[async_trait]
    impl RemediationHandler for FailingHandler {
        async fn run(&self) -> Result<(), String> {
            Err("backend unavailable".to_string())
        }
    }

    #[tokio::test]
    async fn test_failed_action_creates_info_alert() {
        let center = center();
        let alert = center.create_alert(
            AlertLevel::Critical,
            ResourceCategory::System,
            "Memory critical",
            "usage at 90%",
            vec![RemediationAction::new(
                "unload-idle",
                "Unload idle models",
                Arc::new(FailingHandler),
            )],
            true,
        );

        assert!(!center.run_action(&alert.id, "unload-idle").await);

        let info: Vec<_> = center
            .active_alerts()
            .into_iter()
            .filter(|a| a.level == AlertLevel::Info)
            .collect();
        assert_eq!(info.len(), 1);
        assert!(info[0].message.contains("backend unavailable"));
    }
}
